//! Reconciles a search service against a declarative search configuration.
//!
//! A pass walks the document in order and brings the service in line with it:
//! missing entities are created, removal directives are applied, entities that
//! already exist are left untouched. Running the same document twice makes no
//! further changes.
//!
//! Failures come in two kinds. Recoverable ones (a missing attribute, an
//! unknown category, an unresolvable mapping) are reported through a
//! [`LogSink`] and the entry is skipped. Fatal ones are returned as
//! [`ReconcileError`] and stop the pass; nothing is rolled back.

mod attributes;
mod cache;
mod content_source;
mod error;
mod log;
mod memory;
mod metadata;
mod model;
mod service;
mod summary;

pub use cache::CrawledPropertyCache;
pub use content_source::{
    creatable_kind, reconcile_content_sources, SiteContext, DEFAULT_PROXY_GROUP,
    SITE_COLLECTION_PLACEHOLDER,
};
pub use error::{CreateFailure, ReconcileError, ServiceError};
pub use log::{LogSink, Severity, TracingSink, LOG_CATEGORY};
pub use memory::{InMemorySearchService, ManagedPropertyRecord, ServiceSnapshot, DEFAULT_APPLICATION_NAME};
pub use metadata::reconcile_metadata;
pub use model::{
    ContentSource, ContentSourceKind, CrawlState, CrawledProperty, CrawledPropertyQuery,
    ManagedDataType, ManagedProperty, Mapping, MappingCollection, SearchApplication,
    UnknownDataType,
};
pub use service::SearchService;
pub use summary::ReconcileSummary;

use searchsync_config::SearchConfiguration;

/// Runs the metadata pass and then the content source pass.
///
/// The content source pass is not started if the metadata pass fails.
pub async fn reconcile<S, L>(
    config: &SearchConfiguration,
    service: &S,
    site: Option<&SiteContext>,
    sink: &mut L,
) -> Result<ReconcileSummary, ReconcileError>
where
    S: SearchService + ?Sized,
    L: LogSink + ?Sized,
{
    let mut summary = reconcile_metadata(config, service, sink).await?;
    summary += reconcile_content_sources(config, service, site, sink).await?;
    Ok(summary)
}

// ============================================================================
// Test Utilities - exported for integration tests
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
