use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::model::{
    ContentSource, ContentSourceKind, CrawledProperty, CrawledPropertyQuery, ManagedDataType,
    ManagedProperty, MappingCollection, SearchApplication,
};

// ============================================================================
// SearchService Trait - abstracts the search administration service
// ============================================================================

/// Operations of the remote search administration service.
///
/// The reconcilers await each call before issuing the next one; an
/// implementation never sees overlapping calls from a single pass.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Resolves the search application. Fails with
    /// [`ServiceError::Unavailable`] when there is none.
    async fn application(&self) -> Result<SearchApplication, ServiceError>;

    // -- categories & crawled properties --

    /// Names of all crawled property categories.
    async fn categories(&self) -> Result<Vec<String>, ServiceError>;

    async fn crawled_properties(&self, category: &str)
        -> Result<Vec<CrawledProperty>, ServiceError>;

    /// Creating a property that already exists in the category (same name and
    /// propset) returns the stored property.
    async fn create_crawled_property(
        &self,
        category: &str,
        name: &str,
        is_mapped_to_contents: bool,
        propset: Uuid,
        variant_type: i32,
    ) -> Result<CrawledProperty, ServiceError>;

    async fn query_crawled_properties(
        &self,
        category: &str,
        query: &CrawledPropertyQuery,
    ) -> Result<Vec<CrawledProperty>, ServiceError>;

    /// Persists the mutable attributes of a crawled property.
    async fn update_crawled_property(&self, property: &CrawledProperty)
        -> Result<(), ServiceError>;

    /// Deletes every crawled property of the category that is not mapped to
    /// contents.
    async fn delete_unmapped_properties(&self, category: &str) -> Result<(), ServiceError>;

    // -- managed properties & mappings --

    async fn managed_property_exists(&self, name: &str) -> Result<bool, ServiceError>;

    async fn create_managed_property(
        &self,
        name: &str,
        data_type: ManagedDataType,
    ) -> Result<ManagedProperty, ServiceError>;

    async fn managed_property(&self, name: &str) -> Result<ManagedProperty, ServiceError>;

    async fn mappings(&self, property: &ManagedProperty)
        -> Result<MappingCollection, ServiceError>;

    /// Replaces the mapping set of the property.
    async fn set_mappings(
        &self,
        property: &ManagedProperty,
        mappings: &MappingCollection,
    ) -> Result<(), ServiceError>;

    async fn delete_all_mappings(&self, property: &ManagedProperty) -> Result<(), ServiceError>;

    async fn delete_managed_property(&self, property: &ManagedProperty)
        -> Result<(), ServiceError>;

    // -- content sources --

    async fn content_source_exists(&self, name: &str) -> Result<bool, ServiceError>;

    async fn create_content_source(
        &self,
        kind: ContentSourceKind,
        name: &str,
    ) -> Result<ContentSource, ServiceError>;

    async fn content_source(&self, name: &str) -> Result<ContentSource, ServiceError>;

    /// Persists the start addresses of the content source.
    async fn update_content_source(&self, source: &ContentSource) -> Result<(), ServiceError>;

    async fn delete_content_source(&self, source: &ContentSource) -> Result<(), ServiceError>;

    async fn start_full_crawl(&self, source: &ContentSource) -> Result<(), ServiceError>;

    /// Builds the start address of a business data content source.
    ///
    /// Default: `bdc3://<proxy group>/<partition>[/<lob system>[/<instance>]]`.
    /// An empty LOB system crawls every application of the partition. The proxy
    /// group is percent-encoded, so names with spaces are valid hosts.
    fn business_data_start_address(
        &self,
        proxy_group: &str,
        partition_id: Uuid,
        lob_system: &str,
        lob_system_instance: &str,
    ) -> Result<Url, url::ParseError> {
        let host: String = url::form_urlencoded::byte_serialize(proxy_group.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        let mut url = Url::parse(&format!("bdc3://{host}/{partition_id}"))?;
        if !lob_system.is_empty() {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.push(lob_system);
                if !lob_system_instance.is_empty() {
                    segments.push(lob_system_instance);
                }
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySearchService;

    #[test]
    fn test_business_data_start_address() {
        let service = InMemorySearchService::new();
        let partition = Uuid::parse_str("0c37852b-34d0-418e-91c6-2ac25af4be5b").unwrap();

        let url = service
            .business_data_start_address("Default", partition, "Crm", "CrmInstance")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "bdc3://Default/0c37852b-34d0-418e-91c6-2ac25af4be5b/Crm/CrmInstance"
        );
    }

    #[test]
    fn test_business_data_start_address_for_all_applications() {
        let service = InMemorySearchService::new();

        let url = service
            .business_data_start_address("Default", Uuid::nil(), "", "ignored")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "bdc3://Default/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_business_data_start_address_escapes_segments() {
        let service = InMemorySearchService::new();

        let url = service
            .business_data_start_address("Default", Uuid::nil(), "Sales Data", "")
            .unwrap();
        assert!(url.as_str().ends_with("/Sales%20Data"));
    }

    #[test]
    fn test_business_data_start_address_escapes_proxy_group() {
        let service = InMemorySearchService::new();

        let url = service
            .business_data_start_address("My Group", Uuid::nil(), "Crm", "")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "bdc3://My%20Group/00000000-0000-0000-0000-000000000000/Crm"
        );
    }
}
