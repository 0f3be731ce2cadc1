//! The configuration document of one collection or unit, as written.
//!
//! [`CollectionConfigurationData`] holds exactly what the document says, without any
//! definition defaults applied. It is the form that gets edited and written back;
//! [`crate::CollectionConfiguration`] builds the merged, query-ready view from it.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::field_config::{FieldConfiguration, FieldKey};
use crate::item::FieldData;
use crate::metadata::{CollectionKind, CollectionMetadata};
use crate::schema;
use crate::xml::{self, XmlWriter, COLLECTION_NS, METADATA_NS, XSI_NS};

const SCHEMA_LOCATION: &str =
    "info:ico/collection http://purl.dlib.indiana.edu/iudl/xml/schema/photocat/collection.xsd";

/// An XSLT that converts item records into another metadata format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationConfiguration {
    pub id: String,
    pub format_name: String,
    pub xslt_url: String,
    /// Whether the conversion drops information.
    pub lossy: bool,
}

impl TransformationConfiguration {
    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        Ok(Self {
            id: xml::required_attribute(node, "id")?,
            format_name: xml::required_child_text(node, COLLECTION_NS, "formatName")?,
            xslt_url: xml::required_child_text(node, COLLECTION_NS, "xsltUrl")?,
            lossy: xml::required_attribute(node, "fidelity")? == "lossy",
        })
    }

    fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        let fidelity = if self.lossy { "lossy" } else { "lossless" };
        w.start(
            "u:transformation",
            &[("id", self.id.as_str()), ("fidelity", fidelity)],
        )?;
        w.text_element("u:formatName", &[], &self.format_name)?;
        w.text_element("u:xsltUrl", &[], &self.xslt_url)?;
        w.end("u:transformation")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfigurationData {
    is_public: bool,
    metadata: CollectionMetadata,
    field_configurations: Vec<FieldConfiguration>,
    #[serde(serialize_with = "serialize_default_values")]
    default_values: IndexMap<FieldKey, FieldData>,
    transformations: Vec<TransformationConfiguration>,
}

fn serialize_default_values<S: serde::Serializer>(
    values: &IndexMap<FieldKey, FieldData>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (key, data) in values {
        map.serialize_entry(&key.to_string(), data)?;
    }
    map.end()
}

impl CollectionConfigurationData {
    /// A configuration with no fields and no defaults.
    pub fn new(metadata: CollectionMetadata, is_public: bool) -> Self {
        Self {
            is_public,
            metadata,
            field_configurations: Vec::new(),
            default_values: IndexMap::new(),
            transformations: Vec::new(),
        }
    }

    /// Parse and validate a configuration document.
    pub fn from_xml(text: &str) -> Result<Self> {
        let doc = schema::parse_validated(text, &schema::CONFIGURATION)?;
        let root = doc.root_element();

        let collection = xml::required_child(root, COLLECTION_NS, "collection")?;
        let is_public = xml::attribute(collection, "isPublic")
            .map(|v| xml::parse_bool("isPublic", &v))
            .transpose()?
            .unwrap_or(false);
        let metadata = CollectionMetadata::from_element(collection)?;

        let item = xml::required_child(root, COLLECTION_NS, "item")?;
        let mut field_configurations = Vec::new();
        let mut seen = HashSet::new();
        // defaults are checked once every group has been read
        let mut pending_defaults = Vec::new();
        for group in xml::children(item, COLLECTION_NS, "fields") {
            let definition_id = xml::required_attribute(group, "definitionId")?;
            for node in xml::children(group, COLLECTION_NS, "field") {
                let conf = parse_field(node, &definition_id)?;
                if !seen.insert(conf.key()) {
                    return Err(CatalogError::DuplicateFieldConfiguration {
                        field_type: conf.field_type,
                        definition_id: conf.definition_id,
                    });
                }
                field_configurations.push(conf);
            }
            for defaults in xml::children(group, COLLECTION_NS, "defaultValues") {
                for node in xml::children(defaults, METADATA_NS, "field") {
                    let data = FieldData::from_element(node)?;
                    pending_defaults.push((FieldKey::new(&definition_id, data.field_type()), data));
                }
            }
        }

        let mut default_values = IndexMap::new();
        for (key, data) in pending_defaults {
            if !seen.contains(&key) {
                return Err(CatalogError::UndefinedDefaultValue {
                    field_type: key.field_type,
                    definition_id: key.definition_id,
                });
            }
            if let Some(previous) = default_values.insert(key, data) {
                warn!(
                    collection = %metadata.id,
                    field_type = %previous.field_type(),
                    "default value repeated, keeping the last"
                );
            }
        }

        let transformations = xml::children(item, COLLECTION_NS, "transformation")
            .map(TransformationConfiguration::from_element)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            collection = %metadata.id,
            fields = field_configurations.len(),
            defaults = default_values.len(),
            transformations = transformations.len(),
            "configuration parsed"
        );

        Ok(Self {
            is_public,
            metadata,
            field_configurations,
            default_values,
            transformations,
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

    /// A copy of this configuration describing a different collection or unit.
    pub fn with_identity(&self, id: impl Into<String>, kind: CollectionKind) -> Self {
        let mut copy = self.clone();
        copy.metadata.id = id.into();
        copy.metadata.kind = kind;
        copy
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn set_public(&mut self, is_public: bool) {
        self.is_public = is_public;
    }

    pub fn metadata(&self) -> &CollectionMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: CollectionMetadata) {
        self.metadata = metadata;
    }

    /// Field configurations in document order.
    pub fn field_configurations(&self) -> &[FieldConfiguration] {
        &self.field_configurations
    }

    /// Replace the field configurations.
    ///
    /// Default values whose field is no longer configured are dropped.
    pub fn set_field_configurations(&mut self, configurations: Vec<FieldConfiguration>) -> Result<()> {
        let mut seen = HashSet::new();
        for conf in &configurations {
            conf.check_writable()?;
            if !seen.insert(conf.key()) {
                return Err(CatalogError::DuplicateFieldConfiguration {
                    field_type: conf.field_type.clone(),
                    definition_id: conf.definition_id.clone(),
                });
            }
        }
        let before = self.default_values.len();
        self.default_values.retain(|key, _| seen.contains(key));
        if self.default_values.len() != before {
            debug!(
                dropped = before - self.default_values.len(),
                "default values removed with their field configurations"
            );
        }
        self.field_configurations = configurations;
        Ok(())
    }

    pub fn field_configuration(&self, key: &FieldKey) -> Option<&FieldConfiguration> {
        self.field_configurations
            .iter()
            .find(|c| c.definition_id == key.definition_id && c.field_type == key.field_type)
    }

    /// Distinct definitions ids, in order of first use.
    pub fn represented_definition_ids(&self) -> Vec<&str> {
        self.field_configurations
            .iter()
            .map(|c| c.definition_id.as_str())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn default_values(&self) -> &IndexMap<FieldKey, FieldData> {
        &self.default_values
    }

    /// Default value for the first configured field of this type.
    pub fn default_value(&self, field_type: &str) -> Option<&FieldData> {
        self.default_values
            .iter()
            .find(|(key, _)| key.field_type == field_type)
            .map(|(_, data)| data)
    }

    /// Set the default value of a configured field.
    pub fn set_default_value(&mut self, key: FieldKey, data: FieldData) -> Result<()> {
        if data.field_type() != key.field_type {
            return Err(CatalogError::FieldTypeMismatch {
                expected: key.field_type,
                actual: data.field_type().to_string(),
            });
        }
        if self.field_configuration(&key).is_none() {
            return Err(CatalogError::UndefinedDefaultValue {
                field_type: key.field_type,
                definition_id: key.definition_id,
            });
        }
        self.default_values.insert(key, data);
        Ok(())
    }

    pub fn remove_default_value(&mut self, key: &FieldKey) -> Option<FieldData> {
        self.default_values.shift_remove(key)
    }

    pub fn transformations(&self) -> &[TransformationConfiguration] {
        &self.transformations
    }

    pub fn set_transformations(&mut self, transformations: Vec<TransformationConfiguration>) {
        self.transformations = transformations;
    }

    /// Compare every value, including the full content of each field configuration.
    pub fn content_eq(&self, other: &CollectionConfigurationData) -> bool {
        self.is_public == other.is_public
            && self.metadata == other.metadata
            && self.field_configurations.len() == other.field_configurations.len()
            && self
                .field_configurations
                .iter()
                .zip(&other.field_configurations)
                .all(|(a, b)| a.content_eq(b))
            && self.default_values == other.default_values
            && self.transformations == other.transformations
    }

    pub fn to_xml_string(&self) -> Result<String> {
        xml::write_to_string(|w| self.write_document(w))
    }

    pub fn write_to(&self, out: impl Write) -> Result<()> {
        let mut w = XmlWriter::new(out);
        w.declaration()?;
        self.write_document(&mut w)
    }

    fn write_document<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        if self.field_configurations.is_empty() {
            // the document grammar requires at least one fields group
            return Err(CatalogError::missing_element("fields", "item"));
        }
        w.start(
            "u:configuration",
            &[
                ("xmlns:u", COLLECTION_NS),
                ("xmlns:m", METADATA_NS),
                ("xmlns:xsi", XSI_NS),
                ("xsi:schemaLocation", SCHEMA_LOCATION),
            ],
        )?;
        self.metadata.write_to(w, self.is_public)?;

        w.start("u:item", &[])?;
        for group in self
            .field_configurations
            .chunk_by(|a, b| a.definition_id == b.definition_id)
        {
            self.write_group(w, group)?;
        }
        for transformation in &self.transformations {
            transformation.write_to(w)?;
        }
        w.end("u:item")?;
        w.end("u:configuration")
    }

    /// One `u:fields` element: a run of configurations sharing a definitions id, then
    /// the default values of exactly those fields.
    fn write_group<W: Write>(&self, w: &mut XmlWriter<W>, group: &[FieldConfiguration]) -> Result<()> {
        let definition_id = group[0].definition_id.as_str();
        w.start("u:fields", &[("definitionId", definition_id)])?;
        for conf in group {
            conf.write_to(w)?;
        }
        let defaults: Vec<&FieldData> = group
            .iter()
            .filter_map(|conf| self.default_values.get(&conf.key()))
            .collect();
        if !defaults.is_empty() {
            w.start("u:defaultValues", &[])?;
            for data in defaults {
                data.write_to(w)?;
            }
            w.end("u:defaultValues")?;
        }
        w.end("u:fields")
    }
}

fn parse_field(node: Node<'_, '_>, definition_id: &str) -> Result<FieldConfiguration> {
    let field_type = xml::required_attribute(node, "type")?;
    let sort_index = |name: &str| {
        xml::attribute(node, name)
            .map(|v| xml::parse_int(name, &v))
            .transpose()
    };
    FieldConfiguration::from_element(
        node,
        &field_type,
        definition_id,
        sort_index("catalogingSortIndex")?,
        sort_index("publicationSortIndex")?,
    )
}

impl FromStr for CollectionConfigurationData {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_xml(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::item::NameValuePair;

    const CONFIGURATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<u:configuration xmlns:u="info:ico/collection" xmlns:m="info:photocat/metadata">
    <u:collection isPublic="true">
        <u:id>postcards</u:id>
        <u:type>collection</u:type>
        <u:fullName>Indiana Postcards</u:fullName>
        <u:shortName>Postcards</u:shortName>
        <u:description>Picture postcards.</u:description>
        <u:iconUrl>http://example.org/icon.png</u:iconUrl>
        <u:publish/>
    </u:collection>
    <u:item>
        <u:fields definitionId="core">
            <u:field type="TITLE" catalogingSortIndex="2">
                <u:displayLabel>Title</u:displayLabel>
            </u:field>
            <u:field type="STATUS" catalogingSortIndex="0">
                <u:private>true</u:private>
            </u:field>
            <u:defaultValues>
                <m:field fieldType="STATUS">
                    <m:values><m:value><m:part property="text">draft</m:part></m:value></m:values>
                </m:field>
            </u:defaultValues>
        </u:fields>
        <u:fields definitionId="local">
            <u:field type="NOTE"/>
        </u:fields>
        <u:transformation id="dc" fidelity="lossy">
            <u:formatName>Dublin Core</u:formatName>
            <u:xsltUrl>http://example.org/dc.xsl</u:xsltUrl>
        </u:transformation>
    </u:item>
</u:configuration>"#;

    #[test]
    fn parses_groups_and_defaults() {
        let data: CollectionConfigurationData = CONFIGURATION.parse().unwrap();
        assert!(data.is_public());
        assert_eq!(data.metadata().id, "postcards");
        assert_eq!(data.field_configurations().len(), 3);
        assert_eq!(data.represented_definition_ids(), vec!["core", "local"]);

        let title = data.field_configuration(&FieldKey::new("core", "TITLE")).unwrap();
        assert_eq!(title.cataloging_sort_index, Some(2));
        assert_eq!(title.public_sort_index, None);

        let status = data.default_value("STATUS").unwrap();
        assert_eq!(status.part_values("text"), vec!["draft"]);
        assert!(data.default_value("TITLE").is_none());

        let transformation = &data.transformations()[0];
        assert!(transformation.lossy);
        assert_eq!(transformation.format_name, "Dublin Core");
    }

    #[test]
    fn written_document_parses_to_equal_content() {
        let data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let xml = data.to_xml_string().unwrap();
        let reparsed = CollectionConfigurationData::from_xml(&xml).unwrap();
        assert!(reparsed.content_eq(&data));
        // an explicit zero survives
        assert!(xml.contains("catalogingSortIndex=\"0\""));
    }

    #[test]
    fn groups_are_positional() {
        let mut data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let mut confs = data.field_configurations().to_vec();
        confs.push(FieldConfiguration::new("core", "DATE"));
        data.set_field_configurations(confs).unwrap();
        let xml = data.to_xml_string().unwrap();
        assert_eq!(xml.matches("<u:fields ").count(), 3);
        let reparsed = CollectionConfigurationData::from_xml(&xml).unwrap();
        assert!(reparsed.content_eq(&data));
    }

    #[test]
    fn default_for_unconfigured_field_is_rejected() {
        let xml = CONFIGURATION.replace(
            r#"<m:field fieldType="STATUS">"#,
            r#"<m:field fieldType="NOTE">"#,
        );
        // NOTE is configured, but under "local" rather than "core"
        let err = CollectionConfigurationData::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::UndefinedDefaultValue { .. }));
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    #[tracing_test::traced_test]
    fn repeated_default_keeps_the_last() {
        let xml = CONFIGURATION.replace(
            "</m:field>\n            </u:defaultValues>",
            "</m:field>\n                <m:field fieldType=\"STATUS\"><m:values><m:value><m:part property=\"text\">final</m:part></m:value></m:values></m:field>\n            </u:defaultValues>",
        );
        assert!(xml.contains("final"));
        let data = CollectionConfigurationData::from_xml(&xml).unwrap();
        assert_eq!(data.default_value("STATUS").unwrap().part_values("text"), vec!["final"]);
        assert!(logs_contain("default value repeated"));
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let xml = CONFIGURATION.replace(
            r#"<u:field type="NOTE"/>"#,
            r#"<u:field type="NOTE"/><u:field type="NOTE"/>"#,
        );
        let err = CollectionConfigurationData::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateFieldConfiguration { .. }));
    }

    #[test]
    fn schema_violation_is_format_error() {
        let xml = CONFIGURATION.replace("<u:type>collection</u:type>", "<u:type>box</u:type>");
        let err = CollectionConfigurationData::from_xml(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn with_identity_keeps_everything_else() {
        let data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let unit = data.with_identity("postcards-unit", CollectionKind::Unit);
        assert_eq!(unit.metadata().id, "postcards-unit");
        assert!(unit.metadata().is_unit());
        assert_eq!(unit.field_configurations().len(), 3);
        assert_eq!(data.metadata().id, "postcards");
    }

    #[test]
    fn default_value_edits_are_checked() {
        let mut data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let mut note = FieldData::new("NOTE");
        note.add_value([NameValuePair::new("text", "none")]);

        let err = data
            .set_default_value(FieldKey::new("core", "NOTE"), note.clone())
            .unwrap_err();
        assert!(matches!(err, CatalogError::UndefinedDefaultValue { .. }));
        let err = data
            .set_default_value(FieldKey::new("local", "TITLE"), note.clone())
            .unwrap_err();
        assert!(matches!(err, CatalogError::FieldTypeMismatch { .. }));

        data.set_default_value(FieldKey::new("local", "NOTE"), note).unwrap();
        assert!(data.default_value("NOTE").is_some());
        assert!(data.remove_default_value(&FieldKey::new("local", "NOTE")).is_some());
        assert!(data.default_value("NOTE").is_none());
    }

    #[test]
    fn dropping_a_field_drops_its_default() {
        let mut data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let confs = data
            .field_configurations()
            .iter()
            .filter(|c| c.field_type != "STATUS")
            .cloned()
            .collect();
        data.set_field_configurations(confs).unwrap();
        assert!(data.default_values().is_empty());
    }

    #[test]
    fn starting_boxes_need_repeatable() {
        let mut data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let mut fields = data.field_configurations().to_vec();
        fields[0].starting_boxes = Some(3);
        let err = data.set_field_configurations(fields.clone()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidValue { ref value, .. } if value == "3"));

        fields[0].repeatable = Some(true);
        data.set_field_configurations(fields).unwrap();
        let reread = CollectionConfigurationData::from_xml(&data.to_xml_string().unwrap()).unwrap();
        assert_eq!(reread.field_configurations()[0].starting_boxes, Some(3));
        assert!(data.content_eq(&reread));
    }

    #[test]
    fn empty_configuration_cannot_be_written() {
        let data = CollectionConfigurationData::from_xml(CONFIGURATION).unwrap();
        let empty = CollectionConfigurationData::new(data.metadata().clone(), false);
        assert!(empty.to_xml_string().is_err());
    }
}
