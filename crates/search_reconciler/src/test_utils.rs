//! Mocks and builders shared by unit and integration tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::log::{LogSink, Severity};
use crate::memory::{InMemorySearchService, ServiceSnapshot};
use crate::model::{
    ContentSource, ContentSourceKind, CrawlState, CrawledProperty, CrawledPropertyQuery,
    ManagedDataType, ManagedProperty, MappingCollection, SearchApplication,
};
use crate::service::SearchService;

/// Call prefixes that change service state.
const MUTATING_PREFIXES: &[&str] = &["create_", "update_", "delete_", "set_", "start_"];

/// Builds a crawled property with the zero propset and `VT_LPWSTR`.
pub fn crawled_property(category: &str, name: &str) -> CrawledProperty {
    CrawledProperty {
        category: category.to_string(),
        name: name.to_string(),
        propset: Uuid::nil(),
        variant_type: 31,
        is_mapped_to_contents: false,
    }
}

// ============================================================================
// MockSearchService - in-memory service with a call journal
// ============================================================================

/// Records every call as `method[:argument...]` before delegating to an
/// [`InMemorySearchService`].
#[derive(Default)]
pub struct MockSearchService {
    inner: InMemorySearchService,
    calls: Mutex<Vec<String>>,
    rejected: Mutex<HashSet<String>>,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_unavailable(&self) {
        self.inner.set_available(false);
    }

    /// Every create call for `name` fails with [`ServiceError::Rejected`].
    pub fn reject_create(&self, name: &str) {
        self.rejected.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Calls that change service state, in order.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| MUTATING_PREFIXES.iter().any(|p| c.starts_with(p)))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        self.inner.snapshot()
    }

    // -- seeding --

    pub fn add_category(&self, name: &str) {
        self.inner.add_category(name);
    }

    pub fn add_crawled_property(&self, property: CrawledProperty) {
        self.inner.add_crawled_property(property);
    }

    pub fn add_managed_property(&self, name: &str, data_type: ManagedDataType) -> ManagedProperty {
        self.inner.add_managed_property(name, data_type)
    }

    /// Adds a text managed property mapped to `(category, crawled name)` pairs
    /// built with [`crawled_property`].
    pub fn add_managed_property_mapped_to(&self, name: &str, crawled: &[(&str, &str)]) -> ManagedProperty {
        let property = self.inner.add_managed_property(name, ManagedDataType::Text);
        for (category, crawled_name) in crawled {
            self.inner
                .add_mapping(&property, &crawled_property(category, crawled_name));
        }
        property
    }

    pub fn add_content_source(&self, kind: ContentSourceKind, name: &str, addresses: &[&str]) {
        self.inner.add_content_source(ContentSource {
            id: 0,
            name: name.to_string(),
            kind,
            start_addresses: addresses.iter().map(|a| Url::parse(a).unwrap()).collect(),
            crawl_state: CrawlState::Idle,
        });
    }

    // -- inspection --

    pub fn crawled_property_names(&self, category: &str) -> Vec<String> {
        self.inner
            .snapshot()
            .categories
            .get(category)
            .map(|props| props.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn managed_property_named(&self, name: &str) -> Option<ManagedProperty> {
        self.inner
            .snapshot()
            .managed_properties
            .into_iter()
            .find(|r| r.property.name == name)
            .map(|r| r.property)
    }

    /// Mapping set of the named managed property, empty if it does not exist.
    pub fn mappings_of(&self, name: &str) -> MappingCollection {
        self.inner
            .snapshot()
            .managed_properties
            .into_iter()
            .find(|r| r.property.name == name)
            .map(|r| r.mappings)
            .unwrap_or_default()
    }

    pub fn content_source_named(&self, name: &str) -> Option<ContentSource> {
        self.inner
            .snapshot()
            .content_sources
            .into_iter()
            .find(|s| s.name == name)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_rejected(&self, name: &str) -> Result<(), ServiceError> {
        if self.rejected.lock().unwrap().contains(name) {
            return Err(ServiceError::Rejected(format!("create of \"{name}\" rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn application(&self) -> Result<SearchApplication, ServiceError> {
        self.record("application".to_string());
        self.inner.application().await
    }

    async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        self.record("categories".to_string());
        self.inner.categories().await
    }

    async fn crawled_properties(&self, category: &str) -> Result<Vec<CrawledProperty>, ServiceError> {
        self.record(format!("crawled_properties:{category}"));
        self.inner.crawled_properties(category).await
    }

    async fn create_crawled_property(
        &self,
        category: &str,
        name: &str,
        is_mapped_to_contents: bool,
        propset: Uuid,
        variant_type: i32,
    ) -> Result<CrawledProperty, ServiceError> {
        self.record(format!("create_crawled_property:{category}:{name}"));
        self.check_rejected(name)?;
        self.inner
            .create_crawled_property(category, name, is_mapped_to_contents, propset, variant_type)
            .await
    }

    async fn query_crawled_properties(
        &self,
        category: &str,
        query: &CrawledPropertyQuery,
    ) -> Result<Vec<CrawledProperty>, ServiceError> {
        self.record(format!("query_crawled_properties:{category}:{}", query.name));
        self.inner.query_crawled_properties(category, query).await
    }

    async fn update_crawled_property(&self, property: &CrawledProperty) -> Result<(), ServiceError> {
        self.record(format!(
            "update_crawled_property:{}:{}",
            property.category, property.name
        ));
        self.inner.update_crawled_property(property).await
    }

    async fn delete_unmapped_properties(&self, category: &str) -> Result<(), ServiceError> {
        self.record(format!("delete_unmapped_properties:{category}"));
        self.inner.delete_unmapped_properties(category).await
    }

    async fn managed_property_exists(&self, name: &str) -> Result<bool, ServiceError> {
        self.record(format!("managed_property_exists:{name}"));
        self.inner.managed_property_exists(name).await
    }

    async fn create_managed_property(
        &self,
        name: &str,
        data_type: ManagedDataType,
    ) -> Result<ManagedProperty, ServiceError> {
        self.record(format!("create_managed_property:{name}"));
        self.check_rejected(name)?;
        self.inner.create_managed_property(name, data_type).await
    }

    async fn managed_property(&self, name: &str) -> Result<ManagedProperty, ServiceError> {
        self.record(format!("managed_property:{name}"));
        self.inner.managed_property(name).await
    }

    async fn mappings(&self, property: &ManagedProperty) -> Result<MappingCollection, ServiceError> {
        self.record(format!("mappings:{}", property.name));
        self.inner.mappings(property).await
    }

    async fn set_mappings(
        &self,
        property: &ManagedProperty,
        mappings: &MappingCollection,
    ) -> Result<(), ServiceError> {
        self.record(format!("set_mappings:{}", property.name));
        self.inner.set_mappings(property, mappings).await
    }

    async fn delete_all_mappings(&self, property: &ManagedProperty) -> Result<(), ServiceError> {
        self.record(format!("delete_all_mappings:{}", property.name));
        self.inner.delete_all_mappings(property).await
    }

    async fn delete_managed_property(&self, property: &ManagedProperty) -> Result<(), ServiceError> {
        self.record(format!("delete_managed_property:{}", property.name));
        self.inner.delete_managed_property(property).await
    }

    async fn content_source_exists(&self, name: &str) -> Result<bool, ServiceError> {
        self.record(format!("content_source_exists:{name}"));
        self.inner.content_source_exists(name).await
    }

    async fn create_content_source(
        &self,
        kind: ContentSourceKind,
        name: &str,
    ) -> Result<ContentSource, ServiceError> {
        self.record(format!("create_content_source:{name}"));
        self.check_rejected(name)?;
        self.inner.create_content_source(kind, name).await
    }

    async fn content_source(&self, name: &str) -> Result<ContentSource, ServiceError> {
        self.record(format!("content_source:{name}"));
        self.inner.content_source(name).await
    }

    async fn update_content_source(&self, source: &ContentSource) -> Result<(), ServiceError> {
        self.record(format!("update_content_source:{}", source.name));
        self.inner.update_content_source(source).await
    }

    async fn delete_content_source(&self, source: &ContentSource) -> Result<(), ServiceError> {
        self.record(format!("delete_content_source:{}", source.name));
        self.inner.delete_content_source(source).await
    }

    async fn start_full_crawl(&self, source: &ContentSource) -> Result<(), ServiceError> {
        self.record(format!("start_full_crawl:{}", source.name));
        self.inner.start_full_crawl(source).await
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub category: String,
    pub message: String,
}

/// Log sink that keeps every entry.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub entries: Vec<LogEntry>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if an entry of `severity` contains `fragment`.
    pub fn contains(&self, severity: Severity, fragment: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.severity == severity && e.message.contains(fragment))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }
}

impl LogSink for RecordingSink {
    fn log(&mut self, severity: Severity, category: &str, message: &str) {
        self.entries.push(LogEntry {
            severity,
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}
