use std::fmt;
use std::ops::AddAssign;

/// What a pass changed on the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub crawled_properties_created: usize,
    pub crawled_properties_cleared: usize,
    pub managed_properties_created: usize,
    pub managed_properties_removed: usize,
    /// Managed properties whose mapping set was written back
    pub mapping_sets_written: usize,
    pub content_sources_created: usize,
    pub content_sources_removed: usize,
    pub crawls_started: usize,
    /// Entries skipped because of a recoverable failure
    pub skipped: usize,
}

impl ReconcileSummary {
    /// True if the pass changed anything on the service.
    pub fn has_changes(&self) -> bool {
        self.crawled_properties_created > 0
            || self.crawled_properties_cleared > 0
            || self.managed_properties_created > 0
            || self.managed_properties_removed > 0
            || self.mapping_sets_written > 0
            || self.content_sources_created > 0
            || self.content_sources_removed > 0
            || self.crawls_started > 0
    }
}

impl AddAssign for ReconcileSummary {
    fn add_assign(&mut self, other: Self) {
        self.crawled_properties_created += other.crawled_properties_created;
        self.crawled_properties_cleared += other.crawled_properties_cleared;
        self.managed_properties_created += other.managed_properties_created;
        self.managed_properties_removed += other.managed_properties_removed;
        self.mapping_sets_written += other.mapping_sets_written;
        self.content_sources_created += other.content_sources_created;
        self.content_sources_removed += other.content_sources_removed;
        self.crawls_started += other.crawls_started;
        self.skipped += other.skipped;
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "crawled +{} -{}, managed +{} -{}, mappings ~{}, content sources +{} -{}, crawls {}, skipped {}",
            self.crawled_properties_created,
            self.crawled_properties_cleared,
            self.managed_properties_created,
            self.managed_properties_removed,
            self.mapping_sets_written,
            self.content_sources_created,
            self.content_sources_removed,
            self.crawls_started,
            self.skipped,
        )
    }
}
