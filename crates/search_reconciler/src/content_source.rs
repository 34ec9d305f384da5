//! Content Source Reconciler - removes, recreates and creates crawl definitions

use searchsync_config::{
    ContentSourceDefinition, RemoveEntry, SearchConfiguration, StartAddressDefinition,
};
use tracing::debug;
use url::Url;

use crate::attributes::{self, or_default, present};
use crate::error::ReconcileError;
use crate::log::{messages, LogSink, Severity, LOG_CATEGORY};
use crate::model::ContentSourceKind;
use crate::service::SearchService;
use crate::summary::ReconcileSummary;

/// Placeholder in web start addresses, replaced by the site context URL.
pub const SITE_COLLECTION_PLACEHOLDER: &str = "{sitecollection}";

/// Proxy group used for business data start addresses without `BdcAppProxyGroupName`.
pub const DEFAULT_PROXY_GROUP: &str = "Default";

/// URL of the site collection the configuration is applied for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    url: String,
}

impl SiteContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replaces every placeholder occurrence with the site URL, verbatim.
    pub fn substitute(&self, address: &str) -> String {
        address.replace(SITE_COLLECTION_PLACEHOLDER, &self.url)
    }
}

/// Maps the `Type` attribute of a content source definition to the kind
/// that gets created.
pub fn creatable_kind(type_name: Option<&str>) -> Result<ContentSourceKind, ReconcileError> {
    match type_name {
        Some("Web") => Ok(ContentSourceKind::Web),
        Some("BusinessData") => Ok(ContentSourceKind::Business),
        other => Err(ReconcileError::UnsupportedContentSourceType(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Applies the `ContentSources` section of `config`.
///
/// `site` is only needed when a web start address uses the
/// `{sitecollection}` placeholder.
pub async fn reconcile_content_sources<S, L>(
    config: &SearchConfiguration,
    service: &S,
    site: Option<&SiteContext>,
    sink: &mut L,
) -> Result<ReconcileSummary, ReconcileError>
where
    S: SearchService + ?Sized,
    L: LogSink + ?Sized,
{
    let application = service
        .application()
        .await
        .map_err(ReconcileError::ServiceUnavailable)?;
    debug!(application = %application.name, "reconciling content sources");

    let mut reconciler = ContentSourceReconciler {
        service,
        site,
        sink,
        summary: ReconcileSummary::default(),
    };

    reconciler
        .remove_content_sources(&config.content_sources.removals)
        .await?;

    for definition in &config.content_sources.definitions {
        reconciler.reconcile_content_source(definition).await?;
    }

    Ok(reconciler.summary)
}

struct ContentSourceReconciler<'a, S: ?Sized, L: ?Sized> {
    service: &'a S,
    site: Option<&'a SiteContext>,
    sink: &'a mut L,
    summary: ReconcileSummary,
}

impl<S, L> ContentSourceReconciler<'_, S, L>
where
    S: SearchService + ?Sized,
    L: LogSink + ?Sized,
{
    fn skip(&mut self, severity: Severity, message: &str) {
        self.summary.skipped += 1;
        self.sink.log(severity, LOG_CATEGORY, message);
    }

    async fn remove_content_sources(&mut self, removals: &[RemoveEntry]) -> Result<(), ReconcileError> {
        for entry in removals {
            let Some(name) = present(&entry.name) else {
                self.skip(Severity::Warning, &messages::content_source_remove_name_missing());
                continue;
            };

            if !self.service.content_source_exists(name).await? {
                self.skip(Severity::Warning, &messages::content_source_remove_not_found(name));
                continue;
            }

            let source = self.service.content_source(name).await?;
            self.service.delete_content_source(&source).await?;
            debug!(name, "removed content source");
            self.summary.content_sources_removed += 1;
        }
        Ok(())
    }

    async fn reconcile_content_source(
        &mut self,
        definition: &ContentSourceDefinition,
    ) -> Result<(), ReconcileError> {
        let Some(name) = present(&definition.name) else {
            self.skip(Severity::Critical, &messages::content_source_name_missing());
            return Ok(());
        };

        let exists = self.service.content_source_exists(name).await?;
        if exists {
            self.sink.log(
                Severity::Information,
                LOG_CATEGORY,
                &messages::content_source_exists(name),
            );
            if !attributes::flag("RecreateIfExists", &definition.recreate_if_exists)? {
                return Ok(());
            }
        }

        // Everything that can fail on the document is checked before an
        // existing source is deleted or a new one created.
        let kind = creatable_kind(definition.source_type.as_deref())?;
        let start_full_crawl = attributes::flag("StartFullCrawl", &definition.start_full_crawl)?;
        let start_addresses = self.start_addresses(kind, &definition.start_addresses)?;

        if exists {
            self.delete_existing(name).await?;
        }

        let mut source = self.service.create_content_source(kind, name).await?;
        source.start_addresses.extend(start_addresses);
        self.service.update_content_source(&source).await?;
        debug!(name, %kind, addresses = source.start_addresses.len(), "created content source");
        self.summary.content_sources_created += 1;

        if start_full_crawl {
            self.service.start_full_crawl(&source).await?;
            self.summary.crawls_started += 1;
        }
        Ok(())
    }

    async fn delete_existing(&mut self, name: &str) -> Result<(), ReconcileError> {
        let mut source = self.service.content_source(name).await?;
        if !source.start_addresses.is_empty() {
            source.start_addresses.clear();
            self.service.update_content_source(&source).await?;
        }
        self.service.delete_content_source(&source).await?;
        debug!(name, "deleted content source for recreation");
        self.summary.content_sources_removed += 1;
        Ok(())
    }

    fn start_addresses(
        &self,
        kind: ContentSourceKind,
        definitions: &[StartAddressDefinition],
    ) -> Result<Vec<Url>, ReconcileError> {
        definitions
            .iter()
            .map(|definition| match kind {
                ContentSourceKind::Web => self.web_start_address(definition),
                ContentSourceKind::Business => self.business_data_start_address(definition),
                other => Err(ReconcileError::UnsupportedContentSourceType(other.to_string())),
            })
            .collect()
    }

    fn web_start_address(&self, definition: &StartAddressDefinition) -> Result<Url, ReconcileError> {
        let raw = definition.url.as_deref().unwrap_or_default();
        let address = if raw.contains(SITE_COLLECTION_PLACEHOLDER) {
            let site = self
                .site
                .ok_or_else(|| ReconcileError::MissingSiteContext(raw.to_string()))?;
            site.substitute(raw)
        } else {
            raw.to_string()
        };

        Url::parse(&address).map_err(|err| ReconcileError::InvalidStartAddress {
            address,
            reason: err.to_string(),
        })
    }

    fn business_data_start_address(
        &self,
        definition: &StartAddressDefinition,
    ) -> Result<Url, ReconcileError> {
        let lob_system = or_default(&definition.lob_system_name, "");
        let lob_system_instance = or_default(&definition.lob_system_instance_name, "");
        let proxy_group = or_default(&definition.bdc_app_proxy_group_name, DEFAULT_PROXY_GROUP);
        let partition_id = attributes::guid_or_nil("PartitionId", &definition.partition_id)?;

        self.service
            .business_data_start_address(proxy_group, partition_id, lob_system, lob_system_instance)
            .map_err(|err| ReconcileError::InvalidStartAddress {
                address: format!("bdc3://{proxy_group}/{partition_id}"),
                reason: err.to_string(),
            })
    }
}
