//! Search configuration document and CLI settings.
//!
//! The XML document is converted into closed directive variants
//! ([`CrawledPropertyDirective`], [`MappingDirective`], removal and definition
//! lists) before any reconciliation logic sees it.

use std::path::Path;
use thiserror::Error;

mod document;
mod settings;
mod xml;

pub use document::{
    CategoryEntry, ContentSourceDefinition, ContentSourcesSection, CrawledPropertyDefinition,
    CrawledPropertyDirective, CrawledPropertyRef, ManagedPropertiesSection,
    ManagedPropertyDefinition, MappingDirective, RemoveEntry, SearchConfiguration,
    StartAddressDefinition,
};
pub use settings::{Settings, SETTINGS_FILE_NAME};

pub const ROOT_ELEMENT: &str = "SearchConfiguration";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse search configuration: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid attribute in search configuration: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Malformed search configuration: {0}")]
    Malformed(String),

    #[error("Expected <SearchConfiguration> as root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Parses a search configuration document.
pub fn parse_document(xml: &str) -> Result<SearchConfiguration, ConfigError> {
    let root = xml::parse_tree(xml)?;
    if root.name != ROOT_ELEMENT {
        return Err(ConfigError::UnexpectedRoot(root.name));
    }
    Ok(SearchConfiguration::from_root(&root))
}

/// Reads and parses a search configuration document from disk.
pub fn load_document(path: &Path) -> Result<SearchConfiguration, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SearchConfiguration>
  <CrawledProperties>
    <Category Name="SharePoint">
      <clear>
        <CrawledProperty Name="ows_Old" />
      </clear>
      <CrawledProperty Name="ows_Author" PropSetId="00130329-0000-0130-c000-000000131346" VariantType="31" />
    </Category>
    <Category>
      <CrawledProperty Name="orphan" />
    </Category>
  </CrawledProperties>
  <ManagedProperties>
    <remove Name="Obsolete" />
    <ManagedProperty Name="Author" Type="Text">
      <clear />
      <Map Category="SharePoint">
        ows_Author
      </Map>
    </ManagedProperty>
    <remove />
  </ManagedProperties>
  <ContentSources>
    <remove Name="Legacy" />
    <ContentSource Name="Intranet" Type="Web" RecreateIfExists="true" StartFullCrawl="false">
      <StartAddress Url="{sitecollection}/" />
    </ContentSource>
    <ContentSource Name="Crm" Type="BusinessData">
      <StartAddress LobSystemName="Crm" LobSystemInstanceName="CrmInstance" PartitionId="0c37852b-34d0-418e-91c6-2ac25af4be5b" />
    </ContentSource>
  </ContentSources>
</SearchConfiguration>"#;

    #[test]
    fn test_parse_crawled_property_directives_in_document_order() {
        let config = parse_document(FULL_DOCUMENT).unwrap();

        assert_eq!(config.categories.len(), 2);
        let sharepoint = &config.categories[0];
        assert_eq!(sharepoint.name.as_deref(), Some("SharePoint"));
        assert_eq!(
            sharepoint.directives,
            vec![
                CrawledPropertyDirective::Clear {
                    properties: vec![CrawledPropertyRef {
                        name: Some("ows_Old".to_string())
                    }],
                },
                CrawledPropertyDirective::Ensure(CrawledPropertyDefinition {
                    name: Some("ows_Author".to_string()),
                    prop_set_id: Some("00130329-0000-0130-c000-000000131346".to_string()),
                    variant_type: Some("31".to_string()),
                }),
            ]
        );
        assert!(config.categories[1].name.is_none());
    }

    #[test]
    fn test_parse_managed_properties() {
        let config = parse_document(FULL_DOCUMENT).unwrap();
        let managed = &config.managed_properties;

        assert_eq!(managed.removals.len(), 2);
        assert_eq!(managed.removals[0].name.as_deref(), Some("Obsolete"));
        assert!(managed.removals[1].name.is_none());

        assert_eq!(managed.definitions.len(), 1);
        let author = &managed.definitions[0];
        assert_eq!(author.name.as_deref(), Some("Author"));
        assert_eq!(author.data_type.as_deref(), Some("Text"));
        assert_eq!(
            author.mappings,
            vec![
                MappingDirective::Clear,
                MappingDirective::Map {
                    category: Some("SharePoint".to_string()),
                    crawled_property: "ows_Author".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_content_sources() {
        let config = parse_document(FULL_DOCUMENT).unwrap();
        let sources = &config.content_sources;

        assert_eq!(sources.removals[0].name.as_deref(), Some("Legacy"));
        assert_eq!(sources.definitions.len(), 2);

        let intranet = &sources.definitions[0];
        assert_eq!(intranet.source_type.as_deref(), Some("Web"));
        assert_eq!(intranet.recreate_if_exists.as_deref(), Some("true"));
        assert_eq!(intranet.start_full_crawl.as_deref(), Some("false"));
        assert_eq!(intranet.start_addresses[0].url.as_deref(), Some("{sitecollection}/"));

        let crm = &sources.definitions[1];
        assert!(crm.recreate_if_exists.is_none());
        let address = &crm.start_addresses[0];
        assert_eq!(address.lob_system_name.as_deref(), Some("Crm"));
        assert_eq!(address.lob_system_instance_name.as_deref(), Some("CrmInstance"));
        assert!(address.bdc_app_proxy_group_name.is_none());
        assert!(address.url.is_none());
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let config = parse_document("<SearchConfiguration />").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_unknown_elements_are_ignored() {
        let config = parse_document(
            r#"<SearchConfiguration>
  <Scopes><Scope Name="x"/></Scopes>
  <ManagedProperties>
    <ManagedProperty Name="Title" Type="Text"><Alias>t</Alias></ManagedProperty>
  </ManagedProperties>
</SearchConfiguration>"#,
        )
        .unwrap();

        assert_eq!(config.managed_properties.definitions.len(), 1);
        assert!(config.managed_properties.definitions[0].mappings.is_empty());
    }

    #[test]
    fn test_wrong_root_element() {
        let err = parse_document("<Configuration />").unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedRoot(ref name) if name == "Configuration"));
    }

    #[test]
    fn test_load_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.xml");
        std::fs::write(&path, FULL_DOCUMENT).unwrap();

        let config = load_document(&path).unwrap();
        assert_eq!(config.content_sources.definitions.len(), 2);
    }
}
