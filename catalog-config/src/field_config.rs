//! Per-collection field configuration and its defaulting merge.
//!
//! A [`FieldConfiguration`] is an override record: every optional value left as `None`
//! means "use whatever the field definition's default configuration says". The same
//! grammar is used for the defaults inside a definitions document and for the
//! per-collection `u:field` elements, so parsing lives here and is shared.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::io::Write;

use indexmap::IndexMap;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::xml::{self, XmlWriter, COLLECTION_NS};

/// Identity of a configured field: the definitions set it comes from and its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldKey {
    pub definition_id: String,
    pub field_type: String,
}

impl FieldKey {
    pub fn new(definition_id: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            field_type: field_type.into(),
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.definition_id, self.field_type)
    }
}

/// Binding between a field and a vocabulary source that supplies its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularySourceConfiguration {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
    /// Part holding the authority identifier, if the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_binding: Option<String>,
    /// Part the source's value is written into.
    pub value_binding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_config: Option<IndexMap<String, String>>,
}

impl VocabularySourceConfiguration {
    pub(crate) fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let source_type = xml::required_attribute(node, "type")?;
        let id = xml::required_attribute(node, "id")?;
        let authority_binding = xml::child_text(node, COLLECTION_NS, "authorityBinding");
        let value_binding = xml::required_child_text(node, COLLECTION_NS, "valueBinding")?;
        let source_config = xml::child(node, COLLECTION_NS, "sourceConfig").map(parse_properties);
        Ok(Self {
            id,
            source_type,
            authority_binding,
            value_binding,
            source_config,
        })
    }

    fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        w.start(
            "u:vocabularySource",
            &[("id", self.id.as_str()), ("type", self.source_type.as_str())],
        )?;
        w.optional_text_element("u:authorityBinding", self.authority_binding.as_deref())?;
        w.text_element("u:valueBinding", &[], &self.value_binding)?;
        if let Some(config) = &self.source_config {
            write_properties(w, "u:sourceConfig", config)?;
        }
        w.end("u:vocabularySource")
    }
}

/// Read `u:property name="..."` children into an ordered bag.
pub(crate) fn parse_properties(node: Node<'_, '_>) -> IndexMap<String, String> {
    xml::children(node, COLLECTION_NS, "property")
        .map(|p| (xml::attribute(p, "name").unwrap_or_default(), xml::text_of(p)))
        .collect()
}

pub(crate) fn write_properties<W: Write>(
    w: &mut XmlWriter<W>,
    element: &str,
    properties: &IndexMap<String, String>,
) -> Result<()> {
    w.start(element, &[])?;
    for (name, value) in properties {
        w.text_element("u:property", &[("name", name.as_str())], value)?;
    }
    w.end(element)
}

/// Presentation and editing overrides for one field within one collection.
///
/// Equality and hashing consider only `(field_type, definition_id)`; two configurations
/// for the same field compare equal even if their overrides differ. Use
/// [`FieldConfiguration::content_eq`] to compare every value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfiguration {
    pub definition_id: String,
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub part_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeatable: Option<bool>,
    /// Written as an attribute of `u:repeatable`, so it needs `repeatable` set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_boxes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_in_cataloging_brief_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_in_cataloging_full_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_in_discovery_brief_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_in_discovery_full_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vocabulary_sources: Vec<VocabularySourceConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cataloging_sort_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_sort_index: Option<i32>,
}

impl FieldConfiguration {
    /// A configuration with every override unset.
    pub fn new(definition_id: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    /// Parse the field-configuration grammar found under `node`.
    ///
    /// Used for both `u:field` and `d:defaultConfiguration`; the caller supplies the
    /// identity and sort indices because they live on different elements in each case.
    pub(crate) fn from_element(
        node: Node<'_, '_>,
        field_type: &str,
        definition_id: &str,
        cataloging_sort_index: Option<i32>,
        public_sort_index: Option<i32>,
    ) -> Result<Self> {
        let attribute_labels = xml::children(node, COLLECTION_NS, "attributeDisplayLabel")
            .map(|el| {
                Ok((
                    xml::required_attribute(el, "attributeName")?,
                    xml::text_of(el),
                ))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        let part_labels = xml::children(node, COLLECTION_NS, "partDisplayLabel")
            .map(|el| Ok((xml::required_attribute(el, "partName")?, xml::text_of(el))))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let repeatable_el = xml::child(node, COLLECTION_NS, "repeatable");
        let repeatable = repeatable_el
            .map(|el| xml::parse_bool("repeatable", &xml::text_of(el)))
            .transpose()?;
        let starting_boxes = repeatable_el
            .and_then(|el| xml::attribute(el, "startingBoxes"))
            .map(|v| xml::parse_int("startingBoxes", &v))
            .transpose()?;

        let mut disabled_parts = Vec::new();
        let mut disabled_attributes = Vec::new();
        for el in xml::children(node, COLLECTION_NS, "disable") {
            let name = xml::required_attribute(el, "name")?;
            match xml::required_attribute(el, "type")?.as_str() {
                "part" => disabled_parts.push(name),
                "attribute" => disabled_attributes.push(name),
                other => {
                    return Err(CatalogError::InvalidValue {
                        name: "disable/@type".to_string(),
                        value: other.to_string(),
                    })
                }
            }
        }

        let vocabulary_sources = xml::children(node, COLLECTION_NS, "vocabularySource")
            .map(VocabularySourceConfiguration::from_element)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            definition_id: definition_id.to_string(),
            field_type: field_type.to_string(),
            display_label: xml::child_text(node, COLLECTION_NS, "displayLabel"),
            part_labels,
            attribute_labels,
            usage_notes: xml::child_text(node, COLLECTION_NS, "usageNotes"),
            read_only: xml::optional_bool_child(node, COLLECTION_NS, "readOnly")?,
            repeatable,
            starting_boxes,
            displayed_in_cataloging_brief_view: xml::optional_bool_child(
                node,
                COLLECTION_NS,
                "displayedInCatalogingBriefView",
            )?,
            exposed_in_cataloging_full_view: xml::optional_bool_child(
                node,
                COLLECTION_NS,
                "exposedInCatalogingFullView",
            )?,
            displayed_in_discovery_brief_view: xml::optional_bool_child(
                node,
                COLLECTION_NS,
                "displayedInDiscoveryBriefView",
            )?,
            displayed_in_discovery_full_view: xml::optional_bool_child(
                node,
                COLLECTION_NS,
                "displayedInDiscoveryFullView",
            )?,
            private: xml::optional_bool_child(node, COLLECTION_NS, "private")?,
            vocabulary_sources,
            disabled_parts,
            disabled_attributes,
            cataloging_sort_index,
            public_sort_index,
        })
    }

    /// Overlay `values` onto `defaults`.
    ///
    /// Optional scalars take the specified value when set and fall back to the
    /// default otherwise. Label maps are the union of both with `values` winning on
    /// conflicting keys. Lists are taken from `values` as a whole and never merged.
    pub fn merged(values: &FieldConfiguration, defaults: &FieldConfiguration) -> Self {
        fn pick<T: Clone>(value: &Option<T>, default: &Option<T>) -> Option<T> {
            value.as_ref().or(default.as_ref()).cloned()
        }
        fn pick_id(value: &str, default: &str) -> String {
            if value.is_empty() { default } else { value }.to_string()
        }

        let mut part_labels = defaults.part_labels.clone();
        part_labels.extend(values.part_labels.clone());
        let mut attribute_labels = defaults.attribute_labels.clone();
        attribute_labels.extend(values.attribute_labels.clone());

        Self {
            definition_id: pick_id(&values.definition_id, &defaults.definition_id),
            field_type: pick_id(&values.field_type, &defaults.field_type),
            display_label: pick(&values.display_label, &defaults.display_label),
            part_labels,
            attribute_labels,
            usage_notes: pick(&values.usage_notes, &defaults.usage_notes),
            read_only: pick(&values.read_only, &defaults.read_only),
            repeatable: pick(&values.repeatable, &defaults.repeatable),
            starting_boxes: pick(&values.starting_boxes, &defaults.starting_boxes),
            displayed_in_cataloging_brief_view: pick(
                &values.displayed_in_cataloging_brief_view,
                &defaults.displayed_in_cataloging_brief_view,
            ),
            exposed_in_cataloging_full_view: pick(
                &values.exposed_in_cataloging_full_view,
                &defaults.exposed_in_cataloging_full_view,
            ),
            displayed_in_discovery_brief_view: pick(
                &values.displayed_in_discovery_brief_view,
                &defaults.displayed_in_discovery_brief_view,
            ),
            displayed_in_discovery_full_view: pick(
                &values.displayed_in_discovery_full_view,
                &defaults.displayed_in_discovery_full_view,
            ),
            private: pick(&values.private, &defaults.private),
            vocabulary_sources: values.vocabulary_sources.clone(),
            disabled_parts: values.disabled_parts.clone(),
            disabled_attributes: values.disabled_attributes.clone(),
            cataloging_sort_index: pick(
                &values.cataloging_sort_index,
                &defaults.cataloging_sort_index,
            ),
            public_sort_index: pick(&values.public_sort_index, &defaults.public_sort_index),
        }
    }

    pub fn key(&self) -> FieldKey {
        FieldKey::new(&self.definition_id, &self.field_type)
    }

    /// Label for a part, falling back to the part name itself.
    pub fn part_display_label<'a>(&'a self, part_name: &'a str) -> &'a str {
        self.part_labels
            .get(part_name)
            .map(String::as_str)
            .unwrap_or(part_name)
    }

    /// Label for an attribute, falling back to the attribute name itself.
    pub fn attribute_display_label<'a>(&'a self, attribute_name: &'a str) -> &'a str {
        self.attribute_labels
            .get(attribute_name)
            .map(String::as_str)
            .unwrap_or(attribute_name)
    }

    /// Parts with a configured label, sorted by name.
    pub fn relabeled_parts(&self) -> Vec<&str> {
        self.part_labels.keys().map(String::as_str).collect()
    }

    /// Attributes with a configured label, sorted by name.
    pub fn relabeled_attributes(&self) -> Vec<&str> {
        self.attribute_labels.keys().map(String::as_str).collect()
    }

    pub fn is_private(&self) -> bool {
        self.private.unwrap_or(false)
    }

    /// Shown in the public full record. Always false for private fields.
    pub fn is_displayed_in_discovery_full_view(&self) -> bool {
        self.displayed_in_discovery_full_view.unwrap_or(false) && !self.is_private()
    }

    /// Shown in public result lists. Always false for private fields.
    pub fn is_displayed_in_discovery_brief_view(&self) -> bool {
        self.displayed_in_discovery_brief_view.unwrap_or(false) && !self.is_private()
    }

    pub fn is_part_disabled(&self, part_name: &str) -> bool {
        self.disabled_parts.iter().any(|p| p == part_name)
    }

    pub fn is_attribute_disabled(&self, attribute_name: &str) -> bool {
        self.disabled_attributes.iter().any(|a| a == attribute_name)
    }

    pub fn effective_cataloging_sort_index(&self) -> i32 {
        self.cataloging_sort_index.unwrap_or(0)
    }

    pub fn effective_public_sort_index(&self) -> i32 {
        self.public_sort_index.unwrap_or(0)
    }

    /// Compare every value, not just the identity.
    pub fn content_eq(&self, other: &FieldConfiguration) -> bool {
        self.definition_id == other.definition_id
            && self.field_type == other.field_type
            && self.display_label == other.display_label
            && self.part_labels == other.part_labels
            && self.attribute_labels == other.attribute_labels
            && self.usage_notes == other.usage_notes
            && self.read_only == other.read_only
            && self.repeatable == other.repeatable
            && self.starting_boxes == other.starting_boxes
            && self.displayed_in_cataloging_brief_view == other.displayed_in_cataloging_brief_view
            && self.exposed_in_cataloging_full_view == other.exposed_in_cataloging_full_view
            && self.displayed_in_discovery_brief_view == other.displayed_in_discovery_brief_view
            && self.displayed_in_discovery_full_view == other.displayed_in_discovery_full_view
            && self.private == other.private
            && self.vocabulary_sources == other.vocabulary_sources
            && self.disabled_parts == other.disabled_parts
            && self.disabled_attributes == other.disabled_attributes
            && self.cataloging_sort_index == other.cataloging_sort_index
            && self.public_sort_index == other.public_sort_index
    }

    /// Write this configuration as a `u:field` element.
    /// Reject values the document layout has no place for.
    pub(crate) fn check_writable(&self) -> Result<()> {
        match (self.starting_boxes, self.repeatable) {
            (Some(boxes), None) => Err(CatalogError::InvalidValue {
                name: format!("startingBoxes of {} (needs repeatable)", self.key()),
                value: boxes.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        self.check_writable()?;
        let cataloging = self.cataloging_sort_index.map(|i| i.to_string());
        let public = self.public_sort_index.map(|i| i.to_string());
        let mut attrs: Vec<(&str, &str)> = vec![("type", self.field_type.as_str())];
        if let Some(index) = &cataloging {
            attrs.push(("catalogingSortIndex", index.as_str()));
        }
        if let Some(index) = &public {
            attrs.push(("publicationSortIndex", index.as_str()));
        }
        w.start("u:field", &attrs)?;

        w.optional_text_element("u:displayLabel", self.display_label.as_deref())?;
        for (attribute, label) in &self.attribute_labels {
            w.text_element("u:attributeDisplayLabel", &[("attributeName", attribute.as_str())], label)?;
        }
        for (part, label) in &self.part_labels {
            w.text_element("u:partDisplayLabel", &[("partName", part.as_str())], label)?;
        }
        w.optional_text_element("u:usageNotes", self.usage_notes.as_deref())?;
        w.optional_bool_element("u:readOnly", self.read_only)?;
        if let Some(repeatable) = self.repeatable {
            let boxes = self.starting_boxes.map(|b| b.to_string());
            let attrs: Vec<(&str, &str)> = boxes
                .as_deref()
                .map(|b| vec![("startingBoxes", b)])
                .unwrap_or_default();
            w.text_element("u:repeatable", &attrs, xml::bool_str(repeatable))?;
        }
        w.optional_bool_element(
            "u:displayedInCatalogingBriefView",
            self.displayed_in_cataloging_brief_view,
        )?;
        w.optional_bool_element(
            "u:exposedInCatalogingFullView",
            self.exposed_in_cataloging_full_view,
        )?;
        w.optional_bool_element(
            "u:displayedInDiscoveryBriefView",
            self.displayed_in_discovery_brief_view,
        )?;
        w.optional_bool_element(
            "u:displayedInDiscoveryFullView",
            self.displayed_in_discovery_full_view,
        )?;
        w.optional_bool_element("u:private", self.private)?;
        for part in &self.disabled_parts {
            w.empty("u:disable", &[("name", part.as_str()), ("type", "part")])?;
        }
        for attribute in &self.disabled_attributes {
            w.empty("u:disable", &[("name", attribute.as_str()), ("type", "attribute")])?;
        }
        for source in &self.vocabulary_sources {
            source.write_to(w)?;
        }
        w.end("u:field")
    }
}

impl PartialEq for FieldConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.field_type == other.field_type && self.definition_id == other.definition_id
    }
}

impl Eq for FieldConfiguration {}

impl Hash for FieldConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field_type.hash(state);
        self.definition_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn populated() -> FieldConfiguration {
        FieldConfiguration {
            definition_id: "core".into(),
            field_type: "NAME".into(),
            display_label: Some("Creator".into()),
            part_labels: BTreeMap::from([("family".to_string(), "Surname".to_string())]),
            attribute_labels: BTreeMap::from([("role".to_string(), "Role".to_string())]),
            usage_notes: Some("Person responsible".into()),
            read_only: Some(false),
            repeatable: Some(true),
            starting_boxes: Some(2),
            displayed_in_cataloging_brief_view: Some(true),
            exposed_in_cataloging_full_view: Some(true),
            displayed_in_discovery_brief_view: Some(false),
            displayed_in_discovery_full_view: Some(true),
            private: Some(false),
            vocabulary_sources: vec![VocabularySourceConfiguration {
                id: "lcnaf".into(),
                source_type: "authority".into(),
                authority_binding: Some("uri".into()),
                value_binding: "family".into(),
                source_config: None,
            }],
            disabled_parts: vec!["dates".into()],
            disabled_attributes: vec!["lang".into()],
            cataloging_sort_index: Some(4),
            public_sort_index: Some(9),
        }
    }

    fn defaults() -> FieldConfiguration {
        FieldConfiguration {
            display_label: Some("Name".into()),
            part_labels: BTreeMap::from([
                ("family".to_string(), "Family name".to_string()),
                ("given".to_string(), "Given name".to_string()),
            ]),
            usage_notes: Some("A personal name".into()),
            displayed_in_discovery_full_view: Some(false),
            disabled_parts: vec!["suffix".into()],
            ..FieldConfiguration::new("core", "NAME")
        }
    }

    #[test]
    fn merging_unset_values_yields_defaults() {
        let merged = FieldConfiguration::merged(&FieldConfiguration::new("core", "NAME"), &defaults());
        let mut expected = defaults();
        // lists always come from the specific configuration
        expected.disabled_parts.clear();
        assert!(merged.content_eq(&expected));
    }

    #[test]
    fn merging_against_itself_is_identity() {
        let d = defaults();
        assert!(FieldConfiguration::merged(&d, &d).content_eq(&d));
    }

    #[test]
    fn populated_values_win_and_labels_union() {
        let merged = FieldConfiguration::merged(&populated(), &defaults());
        assert_eq!(merged.display_label.as_deref(), Some("Creator"));
        assert_eq!(merged.usage_notes.as_deref(), Some("Person responsible"));
        assert_eq!(merged.part_display_label("family"), "Surname");
        assert_eq!(merged.part_display_label("given"), "Given name");
        assert_eq!(merged.disabled_parts, vec!["dates".to_string()]);
        assert_eq!(merged.cataloging_sort_index, Some(4));
        assert_eq!(merged.relabeled_parts(), vec!["family", "given"]);
    }

    #[test]
    fn private_overrides_display_flags() {
        let mut conf = populated();
        conf.private = Some(true);
        conf.displayed_in_discovery_brief_view = Some(true);
        assert!(!conf.is_displayed_in_discovery_full_view());
        assert!(!conf.is_displayed_in_discovery_brief_view());
        conf.private = None;
        assert!(conf.is_displayed_in_discovery_full_view());
        assert!(!conf.is_private());
    }

    #[test]
    fn equality_is_by_identity() {
        let mut other = populated();
        other.display_label = Some("Something else".into());
        assert_eq!(populated(), other);
        assert!(!populated().content_eq(&other));
        assert_ne!(populated(), FieldConfiguration::new("other", "NAME"));
    }

    #[test]
    fn label_fallbacks_use_names() {
        let conf = FieldConfiguration::new("core", "NAME");
        assert_eq!(conf.part_display_label("given"), "given");
        assert_eq!(conf.attribute_display_label("lang"), "lang");
        assert_eq!(conf.effective_cataloging_sort_index(), 0);
    }

    #[test]
    fn parses_field_grammar() {
        let xml = r#"<u:field xmlns:u="info:ico/collection" type="NAME">
            <u:displayLabel>Creator</u:displayLabel>
            <u:partDisplayLabel partName="family">Surname</u:partDisplayLabel>
            <u:repeatable startingBoxes="3">true</u:repeatable>
            <u:private>1</u:private>
            <u:disable name="dates" type="part"/>
            <u:disable name="lang" type="attribute"/>
            <u:vocabularySource id="lcnaf" type="authority">
                <u:valueBinding>family</u:valueBinding>
                <u:sourceConfig><u:property name="url">http://x</u:property></u:sourceConfig>
            </u:vocabularySource>
        </u:field>"#;
        let doc = Document::parse(xml).unwrap();
        let conf =
            FieldConfiguration::from_element(doc.root_element(), "NAME", "core", Some(2), None)
                .unwrap();
        assert_eq!(conf.display_label.as_deref(), Some("Creator"));
        assert_eq!(conf.repeatable, Some(true));
        assert_eq!(conf.starting_boxes, Some(3));
        assert!(conf.is_private());
        assert_eq!(conf.disabled_parts, vec!["dates".to_string()]);
        assert_eq!(conf.disabled_attributes, vec!["lang".to_string()]);
        assert_eq!(conf.read_only, None);
        let source = &conf.vocabulary_sources[0];
        assert_eq!(source.authority_binding, None);
        assert_eq!(
            source.source_config.as_ref().and_then(|c| c.get("url")).map(String::as_str),
            Some("http://x")
        );
        assert_eq!(conf.cataloging_sort_index, Some(2));
        assert_eq!(conf.public_sort_index, None);
    }

    #[test]
    fn vocabulary_source_requires_value_binding() {
        let xml = r#"<u:vocabularySource xmlns:u="info:ico/collection" id="a" type="b"/>"#;
        let doc = Document::parse(xml).unwrap();
        let err = VocabularySourceConfiguration::from_element(doc.root_element()).unwrap_err();
        assert!(err.to_string().contains("valueBinding"));
    }
}
