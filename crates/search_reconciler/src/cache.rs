//! Crawled property cache - one remote fetch per category per pass.

use std::collections::HashMap;

use crate::error::ServiceError;
use crate::model::CrawledProperty;
use crate::service::SearchService;

/// Materialized view of the crawled properties of every category loaded
/// during one pass.
///
/// `add` and `remove` only touch the in-memory copy; callers persist remote
/// changes themselves.
#[derive(Debug, Default)]
pub struct CrawledPropertyCache {
    categories: HashMap<String, Vec<CrawledProperty>>,
}

impl CrawledPropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches all crawled properties of the category, unless it was
    /// already loaded.
    pub async fn load<S: SearchService + ?Sized>(
        &mut self,
        service: &S,
        category: &str,
    ) -> Result<(), ServiceError> {
        if self.contains(category) {
            return Ok(());
        }
        let properties = service.crawled_properties(category).await?;
        tracing::debug!(category, count = properties.len(), "loaded crawled properties");
        self.categories.insert(category.to_string(), properties);
        Ok(())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn find(&self, category: &str, name: &str) -> Option<&CrawledProperty> {
        self.categories
            .get(category)?
            .iter()
            .find(|p| p.category == category && p.name == name)
    }

    /// Adds a property to its category. The category counts as loaded
    /// afterwards.
    pub fn add(&mut self, property: CrawledProperty) {
        self.categories
            .entry(property.category.clone())
            .or_default()
            .push(property);
    }

    pub fn remove(&mut self, category: &str, name: &str) -> Option<CrawledProperty> {
        let properties = self.categories.get_mut(category)?;
        let index = properties.iter().position(|p| p.name == name)?;
        Some(properties.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{crawled_property, MockSearchService};

    #[tokio::test]
    async fn test_load_fetches_category_once() {
        let service = MockSearchService::new();
        service.add_crawled_property(crawled_property("SharePoint", "ows_Author"));
        let mut cache = CrawledPropertyCache::new();

        cache.load(&service, "SharePoint").await.unwrap();
        cache.load(&service, "SharePoint").await.unwrap();

        assert!(cache.contains("SharePoint"));
        assert_eq!(service.call_count("crawled_properties:SharePoint"), 1);
        assert!(cache.find("SharePoint", "ows_Author").is_some());
    }

    #[tokio::test]
    async fn test_find_is_scoped_to_category() {
        let service = MockSearchService::new();
        service.add_crawled_property(crawled_property("SharePoint", "ows_Author"));
        service.add_crawled_property(crawled_property("Basic", "Title"));
        let mut cache = CrawledPropertyCache::new();

        cache.load(&service, "SharePoint").await.unwrap();

        assert!(cache.find("SharePoint", "Title").is_none());
        assert!(cache.find("Basic", "Title").is_none());
        assert!(!cache.contains("Basic"));
    }

    #[test]
    fn test_add_and_remove_are_local() {
        let mut cache = CrawledPropertyCache::new();
        cache.add(crawled_property("SharePoint", "ows_Author"));
        cache.add(crawled_property("SharePoint", "ows_Editor"));
        assert!(cache.contains("SharePoint"));

        let removed = cache.remove("SharePoint", "ows_Author").unwrap();
        assert_eq!(removed.name, "ows_Author");
        assert!(cache.find("SharePoint", "ows_Author").is_none());
        assert!(cache.remove("SharePoint", "ows_Author").is_none());
        assert!(cache.find("SharePoint", "ows_Editor").is_some());
    }
}
