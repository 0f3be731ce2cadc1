//! Per-item field values and the item metadata document.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use roxmltree::Node;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::schema;
use crate::xml::{self, XmlWriter, METADATA_NS, XSI_NS};

const SCHEMA_LOCATION: &str =
    "info:photocat/metadata http://purl.dlib.indiana.edu/iudl/xml/schema/photocat/field-metadata.xsd";

/// A named value: an attribute of a field, or one part of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn is(&self, name: &str, value: &str) -> bool {
        self.name == name && self.value == value
    }
}

/// All values recorded for one field of one item.
///
/// Attributes apply to the field as a whole. Each entry is one repetition of the field
/// and holds its parts in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    field_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<NameValuePair>,
    #[serde(default)]
    pub entries: Vec<Vec<NameValuePair>>,
}

impl FieldData {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    pub fn with_values(
        field_type: impl Into<String>,
        attributes: Vec<NameValuePair>,
        entries: Vec<Vec<NameValuePair>>,
    ) -> Self {
        Self {
            field_type: field_type.into(),
            attributes,
            entries,
        }
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Every value of the named part, across all entries, in order.
    pub fn part_values(&self, part_name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .flatten()
            .filter(|p| p.name == part_name)
            .map(|p| p.value.as_str())
            .collect()
    }

    /// Replace the value of every part equal to `(part_name, part_value)`.
    ///
    /// A blank replacement removes each entry holding a match instead.
    pub fn replace_values_with_part(&mut self, part_name: &str, part_value: &str, replacement: &str) {
        if replacement.trim().is_empty() {
            self.remove_values_with_part(part_name, part_value);
            return;
        }
        for part in self.entries.iter_mut().flatten() {
            if part.is(part_name, part_value) {
                part.value = replacement.to_string();
            }
        }
    }

    /// Remove every entry holding a part equal to `(part_name, part_value)`.
    pub fn remove_values_with_part(&mut self, part_name: &str, part_value: &str) {
        self.entries
            .retain(|entry| !entry.iter().any(|p| p.is(part_name, part_value)));
    }

    /// Insert an entry ahead of all existing ones.
    pub fn add_value(&mut self, parts: impl IntoIterator<Item = NameValuePair>) {
        self.entries.insert(0, parts.into_iter().collect());
    }

    /// Append entries after the existing ones.
    pub fn add_values(&mut self, entries: impl IntoIterator<Item = Vec<NameValuePair>>) {
        self.entries.extend(entries);
    }

    pub fn remove_value(&mut self, index: usize) -> Option<Vec<NameValuePair>> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Whether writing this field would produce any child element.
    pub fn has_content(&self) -> bool {
        !self.attributes.is_empty() || self.entries.iter().any(|e| !e.is_empty())
    }

    pub(crate) fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let field_type = xml::required_attribute(node, "fieldType")?;
        let attributes = xml::children(node, METADATA_NS, "attribute")
            .map(|a| Ok(NameValuePair::new(xml::required_attribute(a, "name")?, xml::text_of(a))))
            .collect::<Result<Vec<_>>>()?;
        let entries = xml::children(node, METADATA_NS, "values")
            .flat_map(|values| xml::children(values, METADATA_NS, "value"))
            .map(|value| {
                xml::children(value, METADATA_NS, "part")
                    .map(|p| {
                        Ok(NameValuePair::new(
                            xml::required_attribute(p, "property")?,
                            xml::text_of(p),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            field_type,
            attributes,
            entries,
        })
    }

    /// Write an `m:field` element. Empty entries and an empty values container are left out.
    pub(crate) fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        w.start("m:field", &[("fieldType", self.field_type.as_str())])?;
        for attribute in &self.attributes {
            w.text_element("m:attribute", &[("name", attribute.name.as_str())], &attribute.value)?;
        }
        let mut entries = self.entries.iter().filter(|e| !e.is_empty()).peekable();
        if entries.peek().is_some() {
            w.start("m:values", &[])?;
            for entry in entries {
                w.start("m:value", &[])?;
                for part in entry {
                    w.text_element("m:part", &[("property", part.name.as_str())], &part.value)?;
                }
                w.end("m:value")?;
            }
            w.end("m:values")?;
        }
        w.end("m:field")
    }
}

/// The descriptive record of a single catalog item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    id: String,
    collection_id: String,
    fields: BTreeMap<String, FieldData>,
}

impl ItemMetadata {
    pub fn new(id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn from_xml(text: &str) -> Result<Self> {
        let doc = schema::parse_validated(text, &schema::ITEM_METADATA)?;
        let root = doc.root_element();
        let id = xml::required_child_text(root, METADATA_NS, "id")?;
        let collection_id = xml::required_child_text(root, METADATA_NS, "collectionId")?;
        let mut fields = BTreeMap::new();
        for node in xml::children(root, METADATA_NS, "field") {
            let data = FieldData::from_element(node)?;
            if let Some(previous) = fields.insert(data.field_type.clone(), data) {
                warn!(item = %id, field_type = %previous.field_type, "field repeated in item record, keeping the last");
            }
        }
        debug!(item = %id, fields = fields.len(), "item metadata parsed");
        Ok(Self {
            id,
            collection_id,
            fields,
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

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn field_data(&self, field_type: &str) -> Option<&FieldData> {
        self.fields.get(field_type)
    }

    pub fn field_data_mut(&mut self, field_type: &str) -> Option<&mut FieldData> {
        self.fields.get_mut(field_type)
    }

    /// Field data in field-type order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldData> {
        self.fields.values()
    }

    pub fn represented_field_types(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Store `data` for `field_type`, or delete the field when `data` is `None`.
    pub fn set_field_value(&mut self, field_type: &str, data: Option<FieldData>) -> Result<()> {
        match data {
            None => {
                self.fields.remove(field_type);
            }
            Some(data) if data.field_type != field_type => {
                return Err(CatalogError::FieldTypeMismatch {
                    expected: field_type.to_string(),
                    actual: data.field_type,
                });
            }
            Some(data) => {
                self.fields.insert(field_type.to_string(), data);
            }
        }
        Ok(())
    }

    pub fn delete_field_value(&mut self, field_type: &str) -> Option<FieldData> {
        self.fields.remove(field_type)
    }

    /// A copy of this record holding only the fields for which `keep` is true.
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            id: self.id.clone(),
            collection_id: self.collection_id.clone(),
            fields: self
                .fields
                .iter()
                .filter(|(field_type, _)| keep(field_type))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
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
        w.start(
            "m:itemMetadata",
            &[
                ("xmlns:m", METADATA_NS),
                ("xmlns:xsi", XSI_NS),
                ("xsi:schemaLocation", SCHEMA_LOCATION),
            ],
        )?;
        w.text_element("m:id", &[], &self.id)?;
        w.text_element("m:collectionId", &[], &self.collection_id)?;
        for data in self.fields.values().filter(|d| d.has_content()) {
            data.write_to(w)?;
        }
        w.end("m:itemMetadata")
    }
}

impl FromStr for ItemMetadata {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_xml(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn name_data() -> FieldData {
        FieldData::with_values(
            "NAME",
            vec![NameValuePair::new("role", "creator")],
            vec![
                vec![
                    NameValuePair::new("family", "Doe"),
                    NameValuePair::new("given", "Jane"),
                ],
                vec![NameValuePair::new("family", "Roe")],
            ],
        )
    }

    #[test]
    fn part_values_flattens_entries() {
        assert_eq!(name_data().part_values("given"), vec!["Jane"]);
        assert_eq!(name_data().part_values("family"), vec!["Doe", "Roe"]);
        assert!(name_data().part_values("suffix").is_empty());
    }

    #[test]
    fn add_value_prepends() {
        let mut data = name_data();
        data.add_value([NameValuePair::new("family", "Poe")]);
        assert_eq!(data.part_values("family"), vec!["Poe", "Doe", "Roe"]);
        data.add_values([vec![NameValuePair::new("family", "Zoe")]]);
        assert_eq!(data.part_values("family").last(), Some(&"Zoe"));
    }

    #[test]
    fn remove_does_not_skip_adjacent_matches() {
        let mut data = FieldData::new("SUBJECT");
        for term in ["a", "a", "b", "a"] {
            data.add_values([vec![NameValuePair::new("term", term)]]);
        }
        data.remove_values_with_part("term", "a");
        assert_eq!(data.part_values("term"), vec!["b"]);
    }

    #[test]
    fn replace_changes_only_matching_parts() {
        let mut data = name_data();
        data.replace_values_with_part("family", "Doe", "Smith");
        assert_eq!(data.part_values("family"), vec!["Smith", "Roe"]);
        assert_eq!(data.part_values("given"), vec!["Jane"]);
    }

    #[test]
    fn blank_replacement_removes_entries() {
        let mut data = name_data();
        data.replace_values_with_part("family", "Doe", "  ");
        assert_eq!(data.entry_count(), 1);
        assert_eq!(data.part_values("family"), vec!["Roe"]);
    }

    #[test]
    fn remove_value_by_index() {
        let mut data = name_data();
        let removed = data.remove_value(1).unwrap();
        assert_eq!(removed, vec![NameValuePair::new("family", "Roe")]);
        assert!(data.remove_value(5).is_none());
    }

    #[test]
    fn empty_entries_are_not_written() {
        let mut item = ItemMetadata::new("item-1", "c1");
        let mut data = name_data();
        data.add_value([]);
        assert_eq!(data.entry_count(), 3);
        item.set_field_value("NAME", Some(data)).unwrap();

        let reparsed = ItemMetadata::from_xml(&item.to_xml_string().unwrap()).unwrap();
        assert_eq!(reparsed.field_data("NAME").unwrap().entry_count(), 2);
        assert_eq!(reparsed.field_data("NAME").unwrap().attribute("role"), Some("creator"));
    }

    #[test]
    fn fields_without_content_are_skipped() {
        let mut item = ItemMetadata::new("item-1", "c1");
        item.set_field_value("TITLE", Some(FieldData::new("TITLE"))).unwrap();
        item.set_field_value("NAME", Some(name_data())).unwrap();
        let xml = item.to_xml_string().unwrap();
        assert!(!xml.contains("TITLE"));
        assert!(xml.contains("xsi:schemaLocation"));

        let reparsed: ItemMetadata = xml.parse().unwrap();
        assert_eq!(reparsed.represented_field_types().collect::<Vec<_>>(), vec!["NAME"]);
        assert_eq!(reparsed.field_data("NAME"), Some(&name_data()));
    }

    #[test]
    fn set_none_deletes() {
        let mut item = ItemMetadata::new("item-1", "c1");
        item.set_field_value("NAME", Some(name_data())).unwrap();
        item.set_field_value("NAME", None).unwrap();
        assert!(item.field_data("NAME").is_none());
    }

    #[test]
    fn set_with_wrong_type_fails() {
        let mut item = ItemMetadata::new("item-1", "c1");
        let err = item.set_field_value("TITLE", Some(name_data())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn parses_document() {
        let xml = r#"<?xml version="1.0"?>
<m:itemMetadata xmlns:m="info:photocat/metadata">
    <m:id>item-7</m:id>
    <m:collectionId>postcards</m:collectionId>
    <m:field fieldType="TITLE">
        <m:values>
            <m:value><m:part property="text">Main Street</m:part></m:value>
            <m:value/>
        </m:values>
    </m:field>
</m:itemMetadata>"#;
        let item = ItemMetadata::from_xml(xml).unwrap();
        assert_eq!(item.id(), "item-7");
        assert_eq!(item.collection_id(), "postcards");
        let title = item.field_data("TITLE").unwrap();
        // empty entries survive parsing, only writing drops them
        assert_eq!(title.entry_count(), 2);
        assert_eq!(title.part_values("text"), vec!["Main Street"]);
    }

    #[test]
    fn missing_collection_id_is_format_error() {
        let xml = r#"<m:itemMetadata xmlns:m="info:photocat/metadata"><m:id>x</m:id></m:itemMetadata>"#;
        assert_eq!(ItemMetadata::from_xml(xml).unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn filtered_keeps_identity() {
        let mut item = ItemMetadata::new("item-1", "c1");
        item.set_field_value("NAME", Some(name_data())).unwrap();
        let filtered = item.filtered(|t| t != "NAME");
        assert_eq!(filtered.id(), "item-1");
        assert_eq!(filtered.fields().count(), 0);
    }
}
