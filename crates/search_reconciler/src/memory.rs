//! In-memory search service, persisted as a JSON snapshot.
//!
//! Used as the local backend of the CLI and as the base of the test mock.
//! `delete_unmapped_properties` removes crawled properties that are neither
//! mapped to contents nor referenced by any managed property mapping.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::model::{
    ContentSource, ContentSourceKind, CrawlState, CrawledProperty, CrawledPropertyQuery,
    ManagedDataType, ManagedProperty, Mapping, MappingCollection, SearchApplication,
};
use crate::service::SearchService;

pub const DEFAULT_APPLICATION_NAME: &str = "Search Service Application";

/// Managed property together with its mapping set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPropertyRecord {
    #[serde(flatten)]
    pub property: ManagedProperty,
    #[serde(default)]
    pub mappings: MappingCollection,
}

/// Complete service state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    /// `None` makes every pass fail with "service unavailable".
    #[serde(default = "default_application")]
    pub application: Option<SearchApplication>,
    /// Crawled properties by category name
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<CrawledProperty>>,
    #[serde(default)]
    pub managed_properties: Vec<ManagedPropertyRecord>,
    #[serde(default)]
    pub content_sources: Vec<ContentSource>,
    /// Highest managed property pid handed out so far. Pids are never reused.
    #[serde(default)]
    pub last_pid: i32,
    #[serde(default)]
    pub last_content_source_id: i32,
}

fn default_application() -> Option<SearchApplication> {
    Some(SearchApplication {
        id: Uuid::nil(),
        name: DEFAULT_APPLICATION_NAME.to_string(),
    })
}

impl Default for ServiceSnapshot {
    fn default() -> Self {
        Self {
            application: default_application(),
            categories: BTreeMap::new(),
            managed_properties: Vec::new(),
            content_sources: Vec::new(),
            last_pid: 0,
            last_content_source_id: 0,
        }
    }
}

impl ServiceSnapshot {
    fn category(&self, name: &str) -> Result<&Vec<CrawledProperty>, ServiceError> {
        self.categories
            .get(name)
            .ok_or_else(|| ServiceError::NotFound(format!("category \"{name}\"")))
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut Vec<CrawledProperty>, ServiceError> {
        self.categories
            .get_mut(name)
            .ok_or_else(|| ServiceError::NotFound(format!("category \"{name}\"")))
    }

    fn managed_mut(&mut self, property: &ManagedProperty) -> Result<&mut ManagedPropertyRecord, ServiceError> {
        self.managed_properties
            .iter_mut()
            .find(|r| r.property.pid == property.pid)
            .ok_or_else(|| ServiceError::NotFound(format!("managed property \"{}\"", property.name)))
    }

    fn crawled_exists(&self, propset: Uuid, name: &str) -> bool {
        self.categories
            .values()
            .flatten()
            .any(|p| p.propset == propset && p.name == name)
    }

    fn is_referenced(&self, property: &CrawledProperty) -> bool {
        self.managed_properties
            .iter()
            .flat_map(|r| r.mappings.iter())
            .any(|m| m.crawled_propset == property.propset && m.crawled_property_name == property.name)
    }

    // Snapshots written without the counters still never hand out an id in use.
    fn allocate_pid(&mut self) -> i32 {
        let in_use = self.managed_properties.iter().map(|r| r.property.pid).max();
        self.last_pid = self.last_pid.max(in_use.unwrap_or(0)) + 1;
        self.last_pid
    }

    fn allocate_content_source_id(&mut self) -> i32 {
        let in_use = self.content_sources.iter().map(|s| s.id).max();
        self.last_content_source_id = self.last_content_source_id.max(in_use.unwrap_or(0)) + 1;
        self.last_content_source_id
    }
}

// ============================================================================
// InMemorySearchService
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemorySearchService {
    state: Mutex<ServiceSnapshot>,
}

impl InMemorySearchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ServiceSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Reads a snapshot file. A missing file yields an empty service.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let snapshot: ServiceSnapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), ServiceError> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        self.state().clone()
    }

    fn state(&self) -> MutexGuard<'_, ServiceSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- seeding --

    pub fn add_category(&self, name: &str) {
        self.state().categories.entry(name.to_string()).or_default();
    }

    /// Adds a crawled property, creating its category if needed.
    pub fn add_crawled_property(&self, property: CrawledProperty) {
        self.state()
            .categories
            .entry(property.category.clone())
            .or_default()
            .push(property);
    }

    pub fn add_managed_property(&self, name: &str, data_type: ManagedDataType) -> ManagedProperty {
        let mut state = self.state();
        let property = ManagedProperty {
            pid: state.allocate_pid(),
            name: name.to_string(),
            data_type,
        };
        state.managed_properties.push(ManagedPropertyRecord {
            property: property.clone(),
            mappings: MappingCollection::new(),
        });
        property
    }

    /// Adds a mapping without validating the crawled side.
    pub fn add_mapping(&self, property: &ManagedProperty, crawled: &CrawledProperty) {
        if let Ok(record) = self.state().managed_mut(property) {
            record.mappings.add(Mapping::new(crawled, property));
        }
    }

    /// Adds a content source under a freshly allocated id.
    pub fn add_content_source(&self, mut source: ContentSource) -> ContentSource {
        let mut state = self.state();
        source.id = state.allocate_content_source_id();
        state.content_sources.push(source.clone());
        source
    }

    pub fn set_available(&self, available: bool) {
        self.state().application = if available { default_application() } else { None };
    }
}

#[async_trait]
impl SearchService for InMemorySearchService {
    async fn application(&self) -> Result<SearchApplication, ServiceError> {
        self.state()
            .application
            .clone()
            .ok_or_else(|| ServiceError::Unavailable("no search service application".to_string()))
    }

    async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.state().categories.keys().cloned().collect())
    }

    async fn crawled_properties(&self, category: &str) -> Result<Vec<CrawledProperty>, ServiceError> {
        Ok(self.state().category(category)?.clone())
    }

    async fn create_crawled_property(
        &self,
        category: &str,
        name: &str,
        is_mapped_to_contents: bool,
        propset: Uuid,
        variant_type: i32,
    ) -> Result<CrawledProperty, ServiceError> {
        let mut state = self.state();
        let properties = state.category_mut(category)?;
        // Creating a property that already exists returns the stored one.
        if let Some(existing) = properties.iter().find(|p| p.name == name && p.propset == propset) {
            return Ok(existing.clone());
        }
        let property = CrawledProperty {
            category: category.to_string(),
            name: name.to_string(),
            propset,
            variant_type,
            is_mapped_to_contents,
        };
        properties.push(property.clone());
        Ok(property)
    }

    async fn query_crawled_properties(
        &self,
        category: &str,
        query: &CrawledPropertyQuery,
    ) -> Result<Vec<CrawledProperty>, ServiceError> {
        let state = self.state();
        let matches = state
            .category(category)?
            .iter()
            .filter(|p| query.matches(p))
            .take(query.max_results.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn update_crawled_property(&self, property: &CrawledProperty) -> Result<(), ServiceError> {
        let mut state = self.state();
        let stored = state
            .category_mut(&property.category)?
            .iter_mut()
            .find(|p| p.name == property.name && p.propset == property.propset)
            .ok_or_else(|| ServiceError::NotFound(format!("crawled property \"{}\"", property.name)))?;
        stored.is_mapped_to_contents = property.is_mapped_to_contents;
        stored.variant_type = property.variant_type;
        Ok(())
    }

    async fn delete_unmapped_properties(&self, category: &str) -> Result<(), ServiceError> {
        let mut state = self.state();
        let properties = state.category(category)?.clone();
        let kept: Vec<CrawledProperty> = properties
            .into_iter()
            .filter(|p| p.is_mapped_to_contents || state.is_referenced(p))
            .collect();
        *state.category_mut(category)? = kept;
        Ok(())
    }

    async fn managed_property_exists(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self
            .state()
            .managed_properties
            .iter()
            .any(|r| r.property.name == name))
    }

    async fn create_managed_property(
        &self,
        name: &str,
        data_type: ManagedDataType,
    ) -> Result<ManagedProperty, ServiceError> {
        if self.managed_property_exists(name).await? {
            return Err(ServiceError::Conflict(format!("managed property \"{name}\"")));
        }
        Ok(self.add_managed_property(name, data_type))
    }

    async fn managed_property(&self, name: &str) -> Result<ManagedProperty, ServiceError> {
        self.state()
            .managed_properties
            .iter()
            .find(|r| r.property.name == name)
            .map(|r| r.property.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("managed property \"{name}\"")))
    }

    async fn mappings(&self, property: &ManagedProperty) -> Result<MappingCollection, ServiceError> {
        Ok(self.state().managed_mut(property)?.mappings.clone())
    }

    async fn set_mappings(
        &self,
        property: &ManagedProperty,
        mappings: &MappingCollection,
    ) -> Result<(), ServiceError> {
        let mut state = self.state();
        for mapping in mappings {
            if mapping.managed_pid != property.pid {
                return Err(ServiceError::Rejected(format!(
                    "mapping of \"{}\" targets pid {} instead of {}",
                    mapping.crawled_property_name, mapping.managed_pid, property.pid
                )));
            }
            if !state.crawled_exists(mapping.crawled_propset, &mapping.crawled_property_name) {
                return Err(ServiceError::Rejected(format!(
                    "crawled property \"{}\" does not exist",
                    mapping.crawled_property_name
                )));
            }
        }
        state.managed_mut(property)?.mappings = mappings.clone();
        Ok(())
    }

    async fn delete_all_mappings(&self, property: &ManagedProperty) -> Result<(), ServiceError> {
        self.state().managed_mut(property)?.mappings = MappingCollection::new();
        Ok(())
    }

    async fn delete_managed_property(&self, property: &ManagedProperty) -> Result<(), ServiceError> {
        let mut state = self.state();
        let before = state.managed_properties.len();
        state.managed_properties.retain(|r| r.property.pid != property.pid);
        if state.managed_properties.len() == before {
            return Err(ServiceError::NotFound(format!("managed property \"{}\"", property.name)));
        }
        Ok(())
    }

    async fn content_source_exists(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.state().content_sources.iter().any(|s| s.name == name))
    }

    async fn create_content_source(
        &self,
        kind: ContentSourceKind,
        name: &str,
    ) -> Result<ContentSource, ServiceError> {
        let mut state = self.state();
        if state.content_sources.iter().any(|s| s.name == name) {
            return Err(ServiceError::Conflict(format!("content source \"{name}\"")));
        }
        let source = ContentSource {
            id: state.allocate_content_source_id(),
            name: name.to_string(),
            kind,
            start_addresses: Vec::new(),
            crawl_state: CrawlState::Idle,
        };
        state.content_sources.push(source.clone());
        Ok(source)
    }

    async fn content_source(&self, name: &str) -> Result<ContentSource, ServiceError> {
        self.state()
            .content_sources
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("content source \"{name}\"")))
    }

    async fn update_content_source(&self, source: &ContentSource) -> Result<(), ServiceError> {
        let mut state = self.state();
        let stored = state
            .content_sources
            .iter_mut()
            .find(|s| s.id == source.id)
            .ok_or_else(|| ServiceError::NotFound(format!("content source \"{}\"", source.name)))?;
        stored.start_addresses = source.start_addresses.clone();
        Ok(())
    }

    async fn delete_content_source(&self, source: &ContentSource) -> Result<(), ServiceError> {
        let mut state = self.state();
        let before = state.content_sources.len();
        state.content_sources.retain(|s| s.id != source.id);
        if state.content_sources.len() == before {
            return Err(ServiceError::NotFound(format!("content source \"{}\"", source.name)));
        }
        Ok(())
    }

    async fn start_full_crawl(&self, source: &ContentSource) -> Result<(), ServiceError> {
        let mut state = self.state();
        let stored = state
            .content_sources
            .iter_mut()
            .find(|s| s.id == source.id)
            .ok_or_else(|| ServiceError::NotFound(format!("content source \"{}\"", source.name)))?;
        stored.crawl_state = CrawlState::CrawlingFull;
        Ok(())
    }
}
