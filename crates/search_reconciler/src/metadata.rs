//! Metadata Reconciler - crawled properties, managed properties, mappings
//!
//! Order of one pass:
//! 1. `ManagedProperties/remove` entries
//! 2. `CrawledProperties/Category` entries (clear / ensure, document order)
//! 3. `ManagedProperties/ManagedProperty` entries (create, then mappings)

use std::collections::HashSet;

use searchsync_config::{
    CategoryEntry, CrawledPropertyDefinition, CrawledPropertyDirective, CrawledPropertyRef,
    ManagedPropertyDefinition, MappingDirective, RemoveEntry, SearchConfiguration,
};
use tracing::debug;

use crate::attributes::{self, present};
use crate::cache::CrawledPropertyCache;
use crate::error::{CreateFailure, ReconcileError};
use crate::log::{messages, LogSink, Severity, LOG_CATEGORY};
use crate::model::{
    CrawledProperty, CrawledPropertyQuery, ManagedDataType, ManagedProperty, Mapping,
    MappingCollection,
};
use crate::service::SearchService;
use crate::summary::ReconcileSummary;

/// Applies the crawled and managed property sections of `config`.
///
/// Recoverable failures are logged to `sink` and the entry is skipped. A
/// failed create aborts the pass with the changes made so far left in place.
pub async fn reconcile_metadata<S, L>(
    config: &SearchConfiguration,
    service: &S,
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
    debug!(application = %application.name, "reconciling metadata properties");

    let categories = service.categories().await?.into_iter().collect();
    let mut reconciler = MetadataReconciler {
        service,
        sink,
        cache: CrawledPropertyCache::new(),
        categories,
        summary: ReconcileSummary::default(),
    };

    reconciler
        .remove_managed_properties(&config.managed_properties.removals)
        .await?;

    for entry in &config.categories {
        reconciler.reconcile_category(entry).await?;
    }

    for definition in &config.managed_properties.definitions {
        reconciler.reconcile_managed_property(definition).await?;
    }

    Ok(reconciler.summary)
}

struct MetadataReconciler<'a, S: ?Sized, L: ?Sized> {
    service: &'a S,
    sink: &'a mut L,
    cache: CrawledPropertyCache,
    /// Category names known to the service, fetched once per pass
    categories: HashSet<String>,
    summary: ReconcileSummary,
}

impl<S, L> MetadataReconciler<'_, S, L>
where
    S: SearchService + ?Sized,
    L: LogSink + ?Sized,
{
    fn log(&mut self, severity: Severity, message: &str) {
        self.sink.log(severity, LOG_CATEGORY, message);
    }

    fn skip(&mut self, severity: Severity, message: &str) {
        self.summary.skipped += 1;
        self.log(severity, message);
    }

    // ------------------------------------------------------------------------
    // 1. Managed property removal
    // ------------------------------------------------------------------------

    async fn remove_managed_properties(
        &mut self,
        removals: &[RemoveEntry],
    ) -> Result<(), ReconcileError> {
        for entry in removals {
            let Some(name) = present(&entry.name) else {
                self.skip(Severity::Warning, &messages::managed_remove_name_missing());
                continue;
            };

            if !self.service.managed_property_exists(name).await? {
                self.skip(Severity::Warning, &messages::managed_remove_not_found(name));
                continue;
            }

            let property = self.service.managed_property(name).await?;
            self.service.delete_all_mappings(&property).await?;
            self.service.delete_managed_property(&property).await?;
            debug!(name, "removed managed property");
            self.summary.managed_properties_removed += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 2. Crawled properties
    // ------------------------------------------------------------------------

    async fn reconcile_category(&mut self, entry: &CategoryEntry) -> Result<(), ReconcileError> {
        let Some(category) = present(&entry.name) else {
            self.skip(Severity::Critical, &messages::category_attribute_missing("Name"));
            return Ok(());
        };

        if !self.categories.contains(category) {
            self.skip(Severity::Critical, &messages::category_not_found(category));
            return Ok(());
        }

        self.cache.load(self.service, category).await?;

        for directive in &entry.directives {
            match directive {
                CrawledPropertyDirective::Clear { properties } => {
                    self.clear_crawled_properties(category, properties).await?;
                }
                CrawledPropertyDirective::Ensure(definition) => {
                    self.ensure_crawled_property(category, definition).await?;
                }
            }
        }
        Ok(())
    }

    async fn clear_crawled_properties(
        &mut self,
        category: &str,
        properties: &[CrawledPropertyRef],
    ) -> Result<(), ReconcileError> {
        for entry in properties {
            let Some(name) = present(&entry.name) else {
                self.skip(Severity::Warning, &messages::crawled_remove_name_missing(category));
                continue;
            };

            let Some(mut property) = self.cache.remove(category, name) else {
                self.skip(Severity::Warning, &messages::crawled_remove_not_found(name, category));
                continue;
            };

            property.is_mapped_to_contents = false;
            self.service.update_crawled_property(&property).await?;
            self.summary.crawled_properties_cleared += 1;
        }

        self.service.delete_unmapped_properties(category).await?;
        debug!(category, "deleted unmapped crawled properties");
        Ok(())
    }

    async fn ensure_crawled_property(
        &mut self,
        category: &str,
        definition: &CrawledPropertyDefinition,
    ) -> Result<(), ReconcileError> {
        let Some(name) = present(&definition.name) else {
            self.skip(
                Severity::Critical,
                &messages::crawled_attribute_missing(category, "Name"),
            );
            return Ok(());
        };

        if self.cache.find(category, name).is_some() {
            return Ok(());
        }

        match self.create_crawled_property(category, name, definition).await {
            Ok(property) => {
                debug!(category, name, "created crawled property");
                self.cache.add(property);
                self.summary.crawled_properties_created += 1;
                Ok(())
            }
            Err(source) => {
                self.log(
                    Severity::Critical,
                    &messages::create_failed("crawled property", name, &source),
                );
                Err(ReconcileError::CreateCrawledProperty {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    async fn create_crawled_property(
        &self,
        category: &str,
        name: &str,
        definition: &CrawledPropertyDefinition,
    ) -> Result<CrawledProperty, CreateFailure> {
        let propset = attributes::prop_set_id(&definition.prop_set_id)?;
        let variant_type = attributes::variant_type(&definition.variant_type)?;
        let property = self
            .service
            .create_crawled_property(category, name, false, propset, variant_type)
            .await?;
        Ok(property)
    }

    // ------------------------------------------------------------------------
    // 3. Managed properties and mappings
    // ------------------------------------------------------------------------

    async fn reconcile_managed_property(
        &mut self,
        definition: &ManagedPropertyDefinition,
    ) -> Result<(), ReconcileError> {
        let Some(name) = present(&definition.name) else {
            self.skip(Severity::Critical, &messages::managed_attribute_missing("Name"));
            return Ok(());
        };
        let Some(data_type) = present(&definition.data_type) else {
            self.skip(
                Severity::Critical,
                &messages::known_managed_attribute_missing(name, "Type"),
            );
            return Ok(());
        };

        let property = self.create_or_get_managed_property(name, data_type).await?;

        // Loaded on the first Map directive; a clear resets it to empty.
        let mut mappings: Option<MappingCollection> = None;
        let mut changed = false;

        for directive in &definition.mappings {
            match directive {
                MappingDirective::Clear => {
                    self.service.delete_all_mappings(&property).await?;
                    mappings = Some(MappingCollection::new());
                    changed = true;
                }
                MappingDirective::Map {
                    category,
                    crawled_property,
                } => {
                    let (Some(category), false) = (present(category), crawled_property.is_empty())
                    else {
                        self.skip(Severity::Critical, &messages::map_attribute_missing(name));
                        continue;
                    };

                    let Some(crawled) = self.find_crawled_property(crawled_property, category).await?
                    else {
                        self.skip(Severity::Critical, &messages::mapping_failed(name));
                        continue;
                    };

                    if mappings.is_none() {
                        mappings = Some(self.service.mappings(&property).await?);
                    }
                    if let Some(current) = mappings.as_mut() {
                        if current.add(Mapping::new(&crawled, &property)) {
                            changed = true;
                        }
                    }
                }
            }
        }

        if changed {
            let mappings = mappings.unwrap_or_default();
            self.service.set_mappings(&property, &mappings).await?;
            debug!(name, count = mappings.len(), "wrote mappings");
            self.summary.mapping_sets_written += 1;
        }
        Ok(())
    }

    async fn create_or_get_managed_property(
        &mut self,
        name: &str,
        data_type: &str,
    ) -> Result<ManagedProperty, ReconcileError> {
        if self.service.managed_property_exists(name).await? {
            return Ok(self.service.managed_property(name).await?);
        }

        match self.create_managed_property(name, data_type).await {
            Ok(property) => {
                debug!(name, data_type = %property.data_type, "created managed property");
                self.summary.managed_properties_created += 1;
                Ok(property)
            }
            Err(source) => {
                self.log(
                    Severity::Critical,
                    &messages::create_failed("managed property", name, &source),
                );
                Err(ReconcileError::CreateManagedProperty {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    async fn create_managed_property(
        &self,
        name: &str,
        data_type: &str,
    ) -> Result<ManagedProperty, CreateFailure> {
        let data_type: ManagedDataType = data_type.parse()?;
        let property = self.service.create_managed_property(name, data_type).await?;
        Ok(property)
    }

    /// Resolves a crawled property for a `Map` directive.
    ///
    /// Categories loaded during this pass are answered from the cache only.
    /// Otherwise the service is queried and anything but exactly one match
    /// yields `None`.
    async fn find_crawled_property(
        &mut self,
        name: &str,
        category: &str,
    ) -> Result<Option<CrawledProperty>, ReconcileError> {
        if self.cache.contains(category) {
            return Ok(self.cache.find(category, name).cloned());
        }

        if !self.categories.contains(category) {
            self.log(Severity::Critical, &messages::mapping_not_found(name, category));
            return Ok(None);
        }

        let query = CrawledPropertyQuery::by_name(name);
        let mut matches = self.service.query_crawled_properties(category, &query).await?;

        match matches.len() {
            0 => {
                self.log(Severity::Critical, &messages::mapping_not_found(name, category));
                Ok(None)
            }
            1 => Ok(matches.pop()),
            count => {
                self.log(
                    Severity::Critical,
                    &messages::mapping_ambiguous(name, category, count),
                );
                Ok(None)
            }
        }
    }
}
