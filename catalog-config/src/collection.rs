//! The merged, definitions-resolved view of a collection's configuration.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::collection_data::CollectionConfigurationData;
use crate::definitions::{Definitions, FieldDefinition, SourceDefinition};
use crate::error::{CatalogError, Result};
use crate::field_config::FieldConfiguration;
use crate::item::ItemMetadata;
use crate::metadata::CollectionMetadata;
use crate::registry::{BoundField, FieldRegistry};

const PART_SEPARATOR: &str = " -- ";

/// A merged configuration paired with the definitions set that resolves it.
#[derive(Debug, Clone)]
struct ResolvedField {
    configuration: FieldConfiguration,
    definitions: Arc<Definitions>,
}

impl ResolvedField {
    fn definition(&self) -> Option<&FieldDefinition> {
        self.definitions
            .field_definition(&self.configuration.field_type)
    }
}

/// A collection configuration with every field merged onto its definition's defaults.
///
/// Built once from a [`CollectionConfigurationData`] and the definitions it refers to;
/// rebuild it whenever either input changes.
#[derive(Debug, Clone)]
pub struct CollectionConfiguration {
    data: CollectionConfigurationData,
    definitions: IndexMap<String, Arc<Definitions>>,
    /// Stable-sorted by cataloging sort index.
    fields: Vec<ResolvedField>,
}

impl CollectionConfiguration {
    /// Resolve and merge every configured field.
    ///
    /// Fails if two definitions sets share an id, or if any field configuration names a
    /// definitions set or field type that is not available.
    pub fn new(
        data: CollectionConfigurationData,
        definitions: impl IntoIterator<Item = Arc<Definitions>>,
    ) -> Result<Self> {
        let mut by_id: IndexMap<String, Arc<Definitions>> = IndexMap::new();
        for defs in definitions {
            let id = defs.id().to_string();
            if by_id.contains_key(&id) {
                return Err(CatalogError::DuplicateDefinitions { id });
            }
            by_id.insert(id, defs);
        }

        let mut fields = Vec::with_capacity(data.field_configurations().len());
        for conf in data.field_configurations() {
            let defs = by_id
                .get(&conf.definition_id)
                .ok_or_else(|| CatalogError::UnknownDefinitions {
                    id: conf.definition_id.clone(),
                })?;
            let definition = defs.field_definition(&conf.field_type).ok_or_else(|| {
                CatalogError::UndefinedField {
                    field_type: conf.field_type.clone(),
                    definition_id: conf.definition_id.clone(),
                }
            })?;
            fields.push(ResolvedField {
                configuration: FieldConfiguration::merged(conf, definition.default_configuration()),
                definitions: Arc::clone(defs),
            });
        }
        fields.sort_by_key(|f| f.configuration.effective_cataloging_sort_index());

        debug!(
            collection = %data.metadata().id,
            fields = fields.len(),
            definitions = by_id.len(),
            "collection configuration merged"
        );

        Ok(Self {
            data,
            definitions: by_id,
            fields,
        })
    }

    /// The unmerged configuration this view was built from.
    pub fn data(&self) -> &CollectionConfigurationData {
        &self.data
    }

    pub fn metadata(&self) -> &CollectionMetadata {
        self.data.metadata()
    }

    pub fn id(&self) -> &str {
        &self.data.metadata().id
    }

    pub fn is_public(&self) -> bool {
        self.data.is_public()
    }

    /// Merged configurations.
    ///
    /// With `include_private`, every field in cataloging order. Otherwise only fields
    /// shown in the public full view, in public order.
    pub fn list_field_configurations(&self, include_private: bool) -> Vec<&FieldConfiguration> {
        let all = self.fields.iter().map(|f| &f.configuration);
        if include_private {
            return all.collect();
        }
        let mut public: Vec<&FieldConfiguration> = all
            .filter(|c| c.is_displayed_in_discovery_full_view())
            .collect();
        public.sort_by_key(|c| c.effective_public_sort_index());
        public
    }

    /// Merged configuration of the first field of this type.
    pub fn field_configuration(&self, field_type: &str) -> Option<&FieldConfiguration> {
        self.resolved(field_type).map(|f| &f.configuration)
    }

    fn resolved(&self, field_type: &str) -> Option<&ResolvedField> {
        self.fields
            .iter()
            .find(|f| f.configuration.field_type == field_type)
    }

    fn resolved_for(&self, conf: &FieldConfiguration) -> Option<&ResolvedField> {
        // equality is by (definition id, field type)
        self.fields.iter().find(|f| f.configuration == *conf)
    }

    pub fn field_definition(&self, conf: &FieldConfiguration) -> Option<&FieldDefinition> {
        self.resolved_for(conf).and_then(ResolvedField::definition)
    }

    pub fn definitions(&self, conf: &FieldConfiguration) -> Option<&Definitions> {
        self.definitions
            .get(&conf.definition_id)
            .map(|d| d.as_ref())
    }

    pub fn source_definition(&self, conf: &FieldConfiguration, source_type: &str) -> Option<&SourceDefinition> {
        self.definitions(conf)
            .and_then(|d| d.source_definition(source_type))
    }

    /// Attribute names the definition allows, minus those the configuration disables.
    pub fn enabled_attribute_names(&self, conf: &FieldConfiguration) -> Vec<&str> {
        match self.field_definition(conf) {
            Some(def) => def
                .data_specification()
                .valid_attribute_names()
                .filter(|name| !conf.is_attribute_disabled(name))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Part names the definition allows, minus those the configuration disables.
    pub fn enabled_part_names(&self, conf: &FieldConfiguration) -> Vec<&str> {
        match self.field_definition(conf) {
            Some(def) => def
                .data_specification()
                .valid_part_names()
                .filter(|name| !conf.is_part_disabled(name))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Enabled parts that are not bound to hold an authority identifier.
    pub fn browsable_part_names(&self, conf: &FieldConfiguration) -> Vec<&str> {
        let mut names = self.enabled_part_names(conf);
        for source in &conf.vocabulary_sources {
            if let Some(binding) = &source.authority_binding {
                names.retain(|name| name != binding);
            }
        }
        names
    }

    /// Human readable name for one part of a field, as used when browsing.
    ///
    /// When the part is the only browsable part of its field this is the field's display
    /// label, otherwise `"label -- part label"`. Unknown fields and parts fall back to
    /// their raw names rather than failing.
    pub fn field_part_name(&self, field_type: &str, part_name: &str) -> String {
        let Some(resolved) = self.resolved(field_type) else {
            return format!("{field_type}{PART_SEPARATOR}{part_name}");
        };
        let conf = &resolved.configuration;
        let label = conf.display_label.as_deref().unwrap_or(field_type);
        let Some(definition) = resolved.definition() else {
            return format!("{field_type}{PART_SEPARATOR}{part_name}");
        };
        if !definition.data_specification().is_valid_part(part_name) {
            return format!("{label}{PART_SEPARATOR}{part_name}");
        }
        let browsable = self.browsable_part_names(conf);
        if browsable.len() == 1 && browsable[0] == part_name {
            label.to_string()
        } else {
            format!("{label}{PART_SEPARATOR}{}", conf.part_display_label(part_name))
        }
    }

    /// The item with every private field removed. Unconfigured fields count as public.
    pub fn public_item_metadata(&self, item: &ItemMetadata) -> ItemMetadata {
        item.filtered(|field_type| !self.is_private_field(field_type))
    }

    /// The item's identity and private fields only.
    pub fn private_item_metadata(&self, item: &ItemMetadata) -> ItemMetadata {
        item.filtered(|field_type| self.is_private_field(field_type))
    }

    fn is_private_field(&self, field_type: &str) -> bool {
        self.field_configuration(field_type)
            .is_some_and(FieldConfiguration::is_private)
    }

    /// Bind the behavior of a configured field.
    pub fn bind<'a>(&'a self, field_type: &str, registry: &FieldRegistry) -> Result<BoundField<'a>> {
        let resolved = self
            .resolved(field_type)
            .ok_or_else(|| self.not_configured(field_type))?;
        let definition = resolved.definition().ok_or_else(|| CatalogError::UndefinedField {
            field_type: field_type.to_string(),
            definition_id: resolved.configuration.definition_id.clone(),
        })?;
        registry.bind(definition, &resolved.configuration)
    }

    /// One-line summary of an item's value for a field.
    ///
    /// The item must belong to this collection and the field must be configured.
    /// Returns `Ok(None)` when the item has no data for the field.
    pub fn value_summary(
        &self,
        item: &ItemMetadata,
        field_type: &str,
        registry: &FieldRegistry,
    ) -> Result<Option<String>> {
        if item.collection_id() != self.id() {
            return Err(CatalogError::CollectionMismatch {
                item_id: item.id().to_string(),
                collection_id: self.id().to_string(),
            });
        }
        let mut field = self.bind(field_type, registry)?;
        let Some(data) = item.field_data(field_type) else {
            return Ok(None);
        };
        field.set_value(Some(data.clone()))?;
        Ok(field.summary())
    }

    fn not_configured(&self, field_type: &str) -> CatalogError {
        CatalogError::FieldNotConfigured {
            field_type: field_type.to_string(),
            collection_id: self.id().to_string(),
        }
    }
}
