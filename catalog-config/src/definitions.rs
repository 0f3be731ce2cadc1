//! Institution-wide field and vocabulary-source definitions.
//!
//! A definitions document declares, once per institution, every field type a
//! collection may use: what parts and attributes it holds, which behavior implements
//! it, and how it is configured when a collection says nothing more specific.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use roxmltree::Node;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::field_config::FieldConfiguration;
use crate::schema;
use crate::xml::{self, DEFINITION_NS};

/// A name with a human-readable meaning: a part, an attribute or a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMeaning {
    pub name: String,
    pub meaning: String,
}

impl NameMeaning {
    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        Ok(Self {
            name: xml::required_child_text(node, DEFINITION_NS, "name")?,
            meaning: xml::required_child_text(node, DEFINITION_NS, "meaning")?,
        })
    }
}

/// The part and attribute names a field type may hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSpecification {
    attributes: Vec<NameMeaning>,
    parts: Vec<NameMeaning>,
}

impl DataSpecification {
    pub fn new(attributes: Vec<NameMeaning>, parts: Vec<NameMeaning>) -> Self {
        Self { attributes, parts }
    }

    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let attributes = xml::children(node, DEFINITION_NS, "attribute")
            .map(NameMeaning::from_element)
            .collect::<Result<Vec<_>>>()?;
        let parts = xml::children(node, DEFINITION_NS, "value")
            .flat_map(|value| xml::children(value, DEFINITION_NS, "part"))
            .map(NameMeaning::from_element)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { attributes, parts })
    }

    pub fn valid_attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn attribute_meaning(&self, attribute_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == attribute_name)
            .map(|a| a.meaning.as_str())
    }

    pub fn valid_part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn part_meaning(&self, part_name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|p| p.name == part_name)
            .map(|p| p.meaning.as_str())
    }

    pub fn is_valid_part(&self, part_name: &str) -> bool {
        self.parts.iter().any(|p| p.name == part_name)
    }
}

/// Names the behavior that implements a field or source type.
///
/// The binding is looked up in a [`crate::FieldRegistry`]; properties are handed to
/// the behavior unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Implementation {
    pub binding: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
}

impl Implementation {
    pub fn new(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let binding = xml::required_child_text(node, DEFINITION_NS, "binding")?;
        let properties = xml::children(node, DEFINITION_NS, "property")
            .map(|p| Ok((xml::required_attribute(p, "name")?, xml::text_of(p))))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            binding: binding.trim().to_string(),
            properties,
        })
    }
}

/// Descriptor of a vocabulary source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDefinition {
    #[serde(rename = "type")]
    pub source_type: String,
    pub implementation: Implementation,
    pub configuration_parameters: Vec<NameMeaning>,
}

impl SourceDefinition {
    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let source_type = xml::required_attribute(node, "type")?;
        let implementation = Implementation::from_element(xml::required_child(
            node,
            DEFINITION_NS,
            "implementation",
        )?)?;
        let configuration_parameters = xml::children(node, DEFINITION_NS, "configurationParameters")
            .flat_map(|params| xml::children(params, DEFINITION_NS, "param"))
            .map(NameMeaning::from_element)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source_type,
            implementation,
            configuration_parameters,
        })
    }
}

/// The institution-wide definition of a single field type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    definitions_id: String,
    #[serde(rename = "type")]
    field_type: String,
    meaning_and_usage: String,
    implementation: Implementation,
    data_specification: DataSpecification,
    default_configuration: FieldConfiguration,
}

impl FieldDefinition {
    pub fn new(
        definitions_id: impl Into<String>,
        field_type: impl Into<String>,
        meaning_and_usage: impl Into<String>,
        implementation: Implementation,
        data_specification: DataSpecification,
        default_configuration: FieldConfiguration,
    ) -> Self {
        Self {
            definitions_id: definitions_id.into(),
            field_type: field_type.into(),
            meaning_and_usage: meaning_and_usage.into(),
            implementation,
            data_specification,
            default_configuration,
        }
    }

    fn from_element(node: Node<'_, '_>, definitions_id: &str) -> Result<Self> {
        let field_type = xml::required_attribute(node, "type")?;
        let meaning_and_usage = xml::child_text(node, DEFINITION_NS, "meaningAndUsage")
            .ok_or_else(|| CatalogError::missing_element("meaningAndUsage", &field_type))?;
        let implementation = Implementation::from_element(xml::required_child(
            node,
            DEFINITION_NS,
            "implementation",
        )?)?;
        let data_specification = DataSpecification::from_element(xml::required_child(
            node,
            DEFINITION_NS,
            "dataSpecification",
        )?)?;
        // defaults carry no collection ordering
        let default_configuration = FieldConfiguration::from_element(
            xml::required_child(node, DEFINITION_NS, "defaultConfiguration")?,
            &field_type,
            definitions_id,
            None,
            None,
        )?;
        Ok(Self {
            definitions_id: definitions_id.to_string(),
            field_type,
            meaning_and_usage,
            implementation,
            data_specification,
            default_configuration,
        })
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    /// Id of the [`Definitions`] this field belongs to.
    pub fn definitions_id(&self) -> &str {
        &self.definitions_id
    }

    pub fn meaning_and_usage(&self) -> &str {
        &self.meaning_and_usage
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn data_specification(&self) -> &DataSpecification {
        &self.data_specification
    }

    pub fn default_configuration(&self) -> &FieldConfiguration {
        &self.default_configuration
    }
}

/// An identified, immutable set of field and source definitions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Definitions {
    id: String,
    field_definitions: IndexMap<String, FieldDefinition>,
    source_definitions: IndexMap<String, SourceDefinition>,
}

impl Definitions {
    /// Assemble a definitions set in code.
    pub fn new(
        id: impl Into<String>,
        fields: impl IntoIterator<Item = FieldDefinition>,
        sources: impl IntoIterator<Item = SourceDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            field_definitions: fields
                .into_iter()
                .map(|f| (f.field_type.clone(), f))
                .collect(),
            source_definitions: sources
                .into_iter()
                .map(|s| (s.source_type.clone(), s))
                .collect(),
        }
    }

    /// Parse and validate a definitions document.
    pub fn from_xml(text: &str) -> Result<Self> {
        let doc = schema::parse_validated(text, &schema::DEFINITIONS)?;
        let root = doc.root_element();
        let id = xml::attribute(root, "id")
            .ok_or_else(|| CatalogError::missing_attribute("id", "definitions"))?;

        let mut field_definitions = IndexMap::new();
        for node in xml::children(root, DEFINITION_NS, "fieldDefinition") {
            let def = FieldDefinition::from_element(node, &id)?;
            if field_definitions.contains_key(&def.field_type) {
                warn!(definitions = %id, field_type = %def.field_type, "field type defined twice, keeping the last");
            }
            field_definitions.insert(def.field_type.clone(), def);
        }

        let mut source_definitions = IndexMap::new();
        for node in xml::children(root, DEFINITION_NS, "sourceDefinition") {
            let def = SourceDefinition::from_element(node)?;
            source_definitions.insert(def.source_type.clone(), def);
        }

        debug!(
            id = %id,
            fields = field_definitions.len(),
            sources = source_definitions.len(),
            "definitions loaded"
        );

        Ok(Self {
            id,
            field_definitions,
            source_definitions,
        })
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_xml(&text)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_xml(&std::fs::read_to_string(path)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Field types in document order.
    pub fn field_types(&self) -> impl Iterator<Item = &str> {
        self.field_definitions.keys().map(String::as_str)
    }

    pub fn field_definition(&self, field_type: &str) -> Option<&FieldDefinition> {
        self.field_definitions.get(field_type)
    }

    pub fn field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.field_definitions.values()
    }

    pub fn source_types(&self) -> impl Iterator<Item = &str> {
        self.source_definitions.keys().map(String::as_str)
    }

    pub fn source_definition(&self, source_type: &str) -> Option<&SourceDefinition> {
        self.source_definitions.get(source_type)
    }
}

impl FromStr for Definitions {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_xml(s)
    }
}
