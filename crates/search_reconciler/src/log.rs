//! Logger sink for recoverable failures.
//!
//! Skipped entries are reported through a [`LogSink`] instead of errors so
//! the pass can continue with the next sibling directive.

use std::fmt;

/// Category attached to every message emitted by the reconcilers.
pub const LOG_CATEGORY: &str = "Search Configuration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Information,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        };
        f.write_str(name)
    }
}

pub trait LogSink {
    fn log(&mut self, severity: Severity, category: &str, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for &mut T {
    fn log(&mut self, severity: Severity, category: &str, message: &str) {
        (**self).log(severity, category, message);
    }
}

/// Forwards messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, severity: Severity, category: &str, message: &str) {
        match severity {
            Severity::Information => tracing::info!(category, "{message}"),
            Severity::Warning => tracing::warn!(category, "{message}"),
            Severity::Critical => tracing::error!(category, "{message}"),
        }
    }
}

// Message texts. Kept in one place so tests and operators see the same wording.
pub(crate) mod messages {
    pub fn managed_remove_name_missing() -> String {
        "Removing managed property failed. \"Name\" attribute is empty or does not exist in <remove /> element.".to_string()
    }

    pub fn managed_remove_not_found(name: &str) -> String {
        format!("Removing managed property failed. Managed property \"{name}\" was not found.")
    }

    pub fn category_attribute_missing(attribute: &str) -> String {
        format!("Category (under crawled properties) is missing \"{attribute}\" attribute.")
    }

    pub fn category_not_found(name: &str) -> String {
        format!("Category \"{name}\" was not found in the search schema.")
    }

    pub fn crawled_remove_name_missing(category: &str) -> String {
        format!(
            "Removing crawled property failed. \"Name\" attribute missing from <CrawledProperty /> under <clear /> in category \"{category}\"."
        )
    }

    pub fn crawled_remove_not_found(name: &str, category: &str) -> String {
        format!(
            "Removing crawled property failed. Crawled property \"{name}\" was not found in category \"{category}\"."
        )
    }

    pub fn crawled_attribute_missing(category: &str, attribute: &str) -> String {
        format!(
            "Crawled property in category \"{category}\" defined in search configuration XML, is missing \"{attribute}\" attribute."
        )
    }

    pub fn managed_attribute_missing(attribute: &str) -> String {
        format!(
            "Managed property defined in search configuration XML, is missing \"{attribute}\" attribute."
        )
    }

    pub fn known_managed_attribute_missing(name: &str, attribute: &str) -> String {
        format!(
            "Managed property [Name={name}] defined in search configuration XML, is missing \"{attribute}\" attribute."
        )
    }

    pub fn map_attribute_missing(managed: &str) -> String {
        format!(
            "Mapping of managed property \"{managed}\" is missing the \"Category\" attribute or the crawled property name."
        )
    }

    pub fn mapping_not_found(crawled: &str, category: &str) -> String {
        format!(
            "Crawled property was not found. There is no crawled property \"{crawled}\" in category \"{category}\"."
        )
    }

    pub fn mapping_ambiguous(crawled: &str, category: &str, matches: usize) -> String {
        format!(
            "Multiple match found for crawled property \"{crawled}\" in category \"{category}\". There are {matches} property matching this name in the category."
        )
    }

    pub fn mapping_failed(managed: &str) -> String {
        format!(
            "Could not map managed property {managed}. It can be due to invalid mapping in search configuration XML. Please read the previous critical message in the application logs for more information."
        )
    }

    pub fn create_failed(kind: &str, name: &str, cause: &dyn std::fmt::Display) -> String {
        format!("Exception has been thrown while creating {kind} {name}. {cause}")
    }

    pub fn content_source_name_missing() -> String {
        "Content source defined in search configuration XML, is missing \"Name\" attribute."
            .to_string()
    }

    pub fn content_source_remove_name_missing() -> String {
        "Removing content source failed. \"Name\" attribute is empty or does not exist in <remove /> element.".to_string()
    }

    pub fn content_source_remove_not_found(name: &str) -> String {
        format!("Removing content source failed. No content source found with the name \"{name}\".")
    }

    pub fn content_source_exists(name: &str) -> String {
        format!("Content source \"{name}\" will not be created as it already exists")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<String>);

    impl LogSink for Collect {
        fn log(&mut self, severity: Severity, category: &str, message: &str) {
            self.0.push(format!("{severity}:{category}:{message}"));
        }
    }

    #[test]
    fn test_mut_ref_forwards_to_sink() {
        let mut sink = Collect(Vec::new());
        {
            let mut by_ref = &mut sink;
            by_ref.log(Severity::Warning, LOG_CATEGORY, "hello");
        }
        assert_eq!(sink.0, vec!["Warning:Search Configuration:hello"]);
    }

    #[test]
    fn test_tracing_sink_accepts_all_severities() {
        let mut sink = TracingSink;
        sink.log(Severity::Information, LOG_CATEGORY, "info");
        sink.log(Severity::Warning, LOG_CATEGORY, "warn");
        sink.log(Severity::Critical, LOG_CATEGORY, "critical");
    }
}
