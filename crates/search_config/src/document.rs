//! Directive model of a search configuration document.
//!
//! Every attribute is kept as `Option<String>`: the parser never decides
//! whether a missing attribute is fatal, the reconciler does.

use serde::Serialize;
use tracing::debug;

use crate::xml::Element;

/// A parsed `<SearchConfiguration>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchConfiguration {
    /// `CrawledProperties/Category` entries in document order
    pub categories: Vec<CategoryEntry>,
    pub managed_properties: ManagedPropertiesSection,
    pub content_sources: ContentSourcesSection,
}

// ============================================================================
// Crawled properties
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub name: Option<String>,
    pub directives: Vec<CrawledPropertyDirective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrawledPropertyDirective {
    /// `<clear>`: unmap the listed properties, then delete unmapped ones
    Clear { properties: Vec<CrawledPropertyRef> },
    /// `<CrawledProperty>`: make sure the property exists
    Ensure(CrawledPropertyDefinition),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawledPropertyRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawledPropertyDefinition {
    pub name: Option<String>,
    pub prop_set_id: Option<String>,
    pub variant_type: Option<String>,
}

// ============================================================================
// Managed properties
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagedPropertiesSection {
    pub removals: Vec<RemoveEntry>,
    pub definitions: Vec<ManagedPropertyDefinition>,
}

/// `<remove Name="..."/>`, shared by managed properties and content sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveEntry {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagedPropertyDefinition {
    pub name: Option<String>,
    /// Raw `Type` attribute; resolved to a data type only when the property
    /// has to be created.
    pub data_type: Option<String>,
    pub mappings: Vec<MappingDirective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingDirective {
    Clear,
    Map {
        category: Option<String>,
        crawled_property: String,
    },
}

// ============================================================================
// Content sources
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentSourcesSection {
    pub removals: Vec<RemoveEntry>,
    pub definitions: Vec<ContentSourceDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentSourceDefinition {
    pub name: Option<String>,
    pub source_type: Option<String>,
    pub recreate_if_exists: Option<String>,
    pub start_full_crawl: Option<String>,
    pub start_addresses: Vec<StartAddressDefinition>,
}

/// Union of the attributes of both start address flavours. Which ones are
/// read depends on the content source type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartAddressDefinition {
    pub url: Option<String>,
    pub lob_system_name: Option<String>,
    pub lob_system_instance_name: Option<String>,
    pub bdc_app_proxy_group_name: Option<String>,
    pub partition_id: Option<String>,
}

// ============================================================================
// Element tree -> directives
// ============================================================================

impl SearchConfiguration {
    pub(crate) fn from_root(root: &Element) -> Self {
        let mut config = Self::default();

        for section in &root.children {
            match section.name.as_str() {
                "CrawledProperties" => {
                    for child in &section.children {
                        if child.name == "Category" {
                            config.categories.push(CategoryEntry::from_element(child));
                        } else {
                            skip(&section.name, &child.name);
                        }
                    }
                }
                "ManagedProperties" => {
                    for child in &section.children {
                        match child.name.as_str() {
                            "remove" => config
                                .managed_properties
                                .removals
                                .push(RemoveEntry::from_element(child)),
                            "ManagedProperty" => config
                                .managed_properties
                                .definitions
                                .push(ManagedPropertyDefinition::from_element(child)),
                            other => skip(&section.name, other),
                        }
                    }
                }
                "ContentSources" => {
                    for child in &section.children {
                        match child.name.as_str() {
                            "remove" => config
                                .content_sources
                                .removals
                                .push(RemoveEntry::from_element(child)),
                            "ContentSource" => config
                                .content_sources
                                .definitions
                                .push(ContentSourceDefinition::from_element(child)),
                            other => skip(&section.name, other),
                        }
                    }
                }
                other => skip(&root.name, other),
            }
        }

        config
    }

    /// True if the document contains no directive at all.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.managed_properties.removals.is_empty()
            && self.managed_properties.definitions.is_empty()
            && self.content_sources.removals.is_empty()
            && self.content_sources.definitions.is_empty()
    }
}

impl CategoryEntry {
    fn from_element(element: &Element) -> Self {
        let mut directives = Vec::new();
        for child in &element.children {
            match child.name.as_str() {
                "clear" => directives.push(CrawledPropertyDirective::Clear {
                    properties: child
                        .children_named("CrawledProperty")
                        .map(|p| CrawledPropertyRef {
                            name: p.attribute("Name"),
                        })
                        .collect(),
                }),
                "CrawledProperty" => {
                    directives.push(CrawledPropertyDirective::Ensure(CrawledPropertyDefinition {
                        name: child.attribute("Name"),
                        prop_set_id: child.attribute("PropSetId"),
                        variant_type: child.attribute("VariantType"),
                    }))
                }
                other => skip(&element.name, other),
            }
        }

        Self {
            name: element.attribute("Name"),
            directives,
        }
    }
}

impl RemoveEntry {
    fn from_element(element: &Element) -> Self {
        Self {
            name: element.attribute("Name"),
        }
    }
}

impl ManagedPropertyDefinition {
    fn from_element(element: &Element) -> Self {
        let mut mappings = Vec::new();
        for child in &element.children {
            match child.name.as_str() {
                "clear" => mappings.push(MappingDirective::Clear),
                "Map" => mappings.push(MappingDirective::Map {
                    category: child.attribute("Category"),
                    crawled_property: child.text.trim().to_string(),
                }),
                other => skip(&element.name, other),
            }
        }

        Self {
            name: element.attribute("Name"),
            data_type: element.attribute("Type"),
            mappings,
        }
    }
}

impl ContentSourceDefinition {
    fn from_element(element: &Element) -> Self {
        Self {
            name: element.attribute("Name"),
            source_type: element.attribute("Type"),
            recreate_if_exists: element.attribute("RecreateIfExists"),
            start_full_crawl: element.attribute("StartFullCrawl"),
            start_addresses: element
                .children_named("StartAddress")
                .map(|a| StartAddressDefinition {
                    url: a.attribute("Url"),
                    lob_system_name: a.attribute("LobSystemName"),
                    lob_system_instance_name: a.attribute("LobSystemInstanceName"),
                    bdc_app_proxy_group_name: a.attribute("BdcAppProxyGroupName"),
                    partition_id: a.attribute("PartitionId"),
                })
                .collect(),
        }
    }
}

fn skip(parent: &str, child: &str) {
    debug!(parent, element = child, "ignoring unknown element");
}
