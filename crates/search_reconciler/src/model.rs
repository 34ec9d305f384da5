//! Remote entity types as seen through the [`SearchService`](crate::SearchService).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// The search application a pass runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchApplication {
    pub id: Uuid,
    pub name: String,
}

// ============================================================================
// Crawled properties
// ============================================================================

/// A raw property discovered by the crawler, scoped to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawledProperty {
    pub category: String,
    pub name: String,
    pub propset: Uuid,
    pub variant_type: i32,
    #[serde(default)]
    pub is_mapped_to_contents: bool,
}

/// Filter for [`SearchService::query_crawled_properties`](crate::SearchService::query_crawled_properties).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawledPropertyQuery {
    pub name: String,
    /// `None` returns every match.
    pub max_results: Option<usize>,
    pub propset: Option<Uuid>,
    pub variant_type: Option<i32>,
}

impl CrawledPropertyQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, property: &CrawledProperty) -> bool {
        property.name == self.name
            && self.propset.map_or(true, |p| p == property.propset)
            && self.variant_type.map_or(true, |v| v == property.variant_type)
    }
}

// ============================================================================
// Managed properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagedDataType {
    Text,
    Integer,
    Decimal,
    DateTime,
    YesNo,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown managed data type \"{0}\"")]
pub struct UnknownDataType(pub String);

impl FromStr for ManagedDataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Text" => Ok(Self::Text),
            "Integer" => Ok(Self::Integer),
            "Decimal" => Ok(Self::Decimal),
            "DateTime" => Ok(Self::DateTime),
            "YesNo" => Ok(Self::YesNo),
            "Binary" => Ok(Self::Binary),
            other => Err(UnknownDataType(other.to_string())),
        }
    }
}

impl fmt::Display for ManagedDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::Integer => "Integer",
            Self::Decimal => "Decimal",
            Self::DateTime => "DateTime",
            Self::YesNo => "YesNo",
            Self::Binary => "Binary",
        };
        f.write_str(name)
    }
}

/// A typed, queryable schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedProperty {
    /// Property id assigned by the service
    pub pid: i32,
    pub name: String,
    pub data_type: ManagedDataType,
}

/// Binding of one crawled property to one managed property.
///
/// Identity is the full tuple, so the derived equality is the mapping
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub crawled_propset: Uuid,
    pub crawled_property_name: String,
    pub crawled_variant_type: i32,
    pub managed_pid: i32,
}

impl Mapping {
    pub fn new(crawled: &CrawledProperty, managed: &ManagedProperty) -> Self {
        Self {
            crawled_propset: crawled.propset,
            crawled_property_name: crawled.name.clone(),
            crawled_variant_type: crawled.variant_type,
            managed_pid: managed.pid,
        }
    }
}

/// Mapping set of a managed property. Keeps insertion order, refuses
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingCollection(Vec<Mapping>);

impl MappingCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, mapping: &Mapping) -> bool {
        self.0.contains(mapping)
    }

    /// Adds the mapping unless an equal one is present. Returns whether it
    /// was added.
    pub fn add(&mut self, mapping: Mapping) -> bool {
        if self.contains(&mapping) {
            return false;
        }
        self.0.push(mapping);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.0.iter()
    }
}

impl FromIterator<Mapping> for MappingCollection {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        let mut collection = Self::new();
        for mapping in iter {
            collection.add(mapping);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a MappingCollection {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Content sources
// ============================================================================

/// Kind of a content source. Only `Web` and `Business` can be created from a
/// configuration document; the others may exist on the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentSourceKind {
    Web,
    Business,
    SharePoint,
    File,
    Exchange,
    LotusNotes,
    Custom,
}

impl fmt::Display for ContentSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Web => "Web",
            Self::Business => "Business",
            Self::SharePoint => "SharePoint",
            Self::File => "File",
            Self::Exchange => "Exchange",
            Self::LotusNotes => "LotusNotes",
            Self::Custom => "Custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlState {
    #[default]
    Idle,
    CrawlingFull,
}

/// A named crawl definition. Changes to `start_addresses` are local until
/// [`SearchService::update_content_source`](crate::SearchService::update_content_source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSource {
    pub id: i32,
    pub name: String,
    pub kind: ContentSourceKind,
    #[serde(default)]
    pub start_addresses: Vec<Url>,
    #[serde(default)]
    pub crawl_state: CrawlState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawled(name: &str, variant_type: i32) -> CrawledProperty {
        CrawledProperty {
            category: "SharePoint".to_string(),
            name: name.to_string(),
            propset: Uuid::nil(),
            variant_type,
            is_mapped_to_contents: false,
        }
    }

    fn managed(pid: i32) -> ManagedProperty {
        ManagedProperty {
            pid,
            name: "Author".to_string(),
            data_type: ManagedDataType::Text,
        }
    }

    #[test]
    fn test_mapping_equality_requires_all_fields() {
        let base = Mapping::new(&crawled("ows_Author", 31), &managed(1));

        assert_eq!(base, Mapping::new(&crawled("ows_Author", 31), &managed(1)));
        assert_ne!(base, Mapping::new(&crawled("ows_Editor", 31), &managed(1)));
        assert_ne!(base, Mapping::new(&crawled("ows_Author", 64), &managed(1)));
        assert_ne!(base, Mapping::new(&crawled("ows_Author", 31), &managed(2)));

        let mut other_propset = crawled("ows_Author", 31);
        other_propset.propset = Uuid::from_u128(1);
        assert_ne!(base, Mapping::new(&other_propset, &managed(1)));
    }

    #[test]
    fn test_mapping_collection_ignores_duplicates() {
        let mut mappings = MappingCollection::new();
        let mapping = Mapping::new(&crawled("ows_Author", 31), &managed(1));

        assert!(mappings.add(mapping.clone()));
        assert!(!mappings.add(mapping));
        assert_eq!(mappings.len(), 1);
    }

    #[test]
    fn test_mapping_collection_keeps_insertion_order() {
        let mappings: MappingCollection = ["b", "a", "c"]
            .iter()
            .map(|n| Mapping::new(&crawled(n, 31), &managed(1)))
            .collect();

        let names: Vec<&str> = mappings
            .iter()
            .map(|m| m.crawled_property_name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_managed_data_type_parse() {
        assert_eq!("Text".parse::<ManagedDataType>(), Ok(ManagedDataType::Text));
        assert_eq!("YesNo".parse::<ManagedDataType>(), Ok(ManagedDataType::YesNo));
        assert_eq!(
            "FooBar".parse::<ManagedDataType>(),
            Err(UnknownDataType("FooBar".to_string()))
        );
        // Case-sensitive
        assert!("text".parse::<ManagedDataType>().is_err());
    }

    #[test]
    fn test_query_filters() {
        let property = crawled("ows_Author", 31);

        assert!(CrawledPropertyQuery::by_name("ows_Author").matches(&property));
        assert!(!CrawledPropertyQuery::by_name("ows_Editor").matches(&property));

        let query = CrawledPropertyQuery {
            variant_type: Some(64),
            ..CrawledPropertyQuery::by_name("ows_Author")
        };
        assert!(!query.matches(&property));
    }
}
