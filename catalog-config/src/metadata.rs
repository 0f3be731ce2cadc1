//! Collection-level descriptive metadata, browse facets and item conditions.

use std::io::Write;

use indexmap::IndexMap;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::constraint::SearchConstraint;
use crate::error::{CatalogError, Result};
use crate::field_config::{parse_properties, write_properties};
use crate::item::ItemMetadata;
use crate::xml::{self, XmlWriter, COLLECTION_NS};

/// Whether a configuration document describes a collection or a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Collection,
    Unit,
}

impl CollectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Collection => "collection",
            CollectionKind::Unit => "unit",
        }
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "collection" => Ok(CollectionKind::Collection),
            "unit" => Ok(CollectionKind::Unit),
            other => Err(CatalogError::InvalidValue {
                name: "type".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homepage {
    pub title: String,
    pub url: String,
}

/// One browse facet offered for the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Facet {
    /// Browse by member collection.
    Collection { name: String },
    /// Browse the distinct values of one field part.
    #[serde(rename_all = "camelCase")]
    FieldPart {
        name: String,
        field_type: String,
        part: String,
    },
    /// Browse a field part holding dates in `date_format`.
    #[serde(rename_all = "camelCase")]
    Date {
        name: String,
        field_type: String,
        part: String,
        date_format: String,
    },
    /// Browse a fixed tree of values.
    Enumerated { name: String, entries: Vec<FacetValue> },
}

impl Facet {
    pub fn name(&self) -> &str {
        match self {
            Facet::Collection { name }
            | Facet::FieldPart { name, .. }
            | Facet::Date { name, .. }
            | Facet::Enumerated { name, .. } => name,
        }
    }

    fn from_element(node: Node<'_, '_>) -> Result<Option<Self>> {
        let text = |local: &str| xml::required_child_text(node, COLLECTION_NS, local);
        let facet = match node.tag_name().name() {
            "collectionFacet" => Facet::Collection { name: text("name")? },
            "facet" => Facet::FieldPart {
                name: text("name")?,
                field_type: text("fieldType")?,
                part: text("fieldPart")?,
            },
            "dateFacet" => Facet::Date {
                name: text("name")?,
                field_type: text("fieldType")?,
                part: text("fieldPart")?,
                date_format: text("dateFormat")?,
            },
            "enumeratedFacet" => Facet::Enumerated {
                name: text("name")?,
                entries: xml::children(node, COLLECTION_NS, "facetValue")
                    .map(FacetValue::from_element)
                    .collect::<Result<Vec<_>>>()?,
            },
            _ => return Ok(None),
        };
        Ok(Some(facet))
    }

    fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            Facet::Collection { name } => {
                w.start("u:collectionFacet", &[])?;
                w.text_element("u:name", &[], name)?;
                w.end("u:collectionFacet")
            }
            Facet::FieldPart {
                name,
                field_type,
                part,
            } => {
                w.start("u:facet", &[])?;
                write_field_part(w, name, field_type, part)?;
                w.end("u:facet")
            }
            Facet::Date {
                name,
                field_type,
                part,
                date_format,
            } => {
                w.start("u:dateFacet", &[])?;
                write_field_part(w, name, field_type, part)?;
                w.text_element("u:dateFormat", &[], date_format)?;
                w.end("u:dateFacet")
            }
            Facet::Enumerated { name, entries } => {
                w.start("u:enumeratedFacet", &[])?;
                w.text_element("u:name", &[], name)?;
                for entry in entries {
                    entry.write_to(w)?;
                }
                w.end("u:enumeratedFacet")
            }
        }
    }
}

fn write_field_part<W: Write>(
    w: &mut XmlWriter<W>,
    name: &str,
    field_type: &str,
    part: &str,
) -> Result<()> {
    w.text_element("u:name", &[], name)?;
    w.text_element("u:fieldType", &[], field_type)?;
    w.text_element("u:fieldPart", &[], part)
}

/// A node in an enumerated facet tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValue {
    pub name: String,
    pub field_type: String,
    pub part: String,
    pub value: FacetValueKind,
}

/// Leaf entries select a literal value; inner entries group further entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetValueKind {
    Leaf(String),
    Nested(Vec<FacetValue>),
}

impl FacetValue {
    fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let leaf = xml::child_text(node, COLLECTION_NS, "fieldValue");
        let mut nested = xml::children(node, COLLECTION_NS, "facetValue").peekable();
        // a value is either a leaf or a group, never both
        if leaf.is_some() && nested.peek().is_some() {
            let pos = node.document().text_pos_at(node.range().start);
            return Err(CatalogError::Validation {
                message: "\"facetValue\" may hold \"fieldValue\" or nested \"facetValue\" entries, not both"
                    .to_string(),
                row: pos.row,
                col: pos.col,
            });
        }
        let value = match leaf {
            Some(value) => FacetValueKind::Leaf(value),
            None => FacetValueKind::Nested(
                nested
                    .map(FacetValue::from_element)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(Self {
            name: xml::required_child_text(node, COLLECTION_NS, "name")?,
            field_type: xml::required_child_text(node, COLLECTION_NS, "fieldType")?,
            part: xml::required_child_text(node, COLLECTION_NS, "fieldPart")?,
            value,
        })
    }

    fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        w.start("u:facetValue", &[])?;
        write_field_part(w, &self.name, &self.field_type, &self.part)?;
        match &self.value {
            FacetValueKind::Leaf(value) => w.text_element("u:fieldValue", &[], value)?,
            FacetValueKind::Nested(entries) => {
                for entry in entries {
                    entry.write_to(w)?;
                }
            }
        }
        w.end("u:facetValue")
    }
}

/// Items matching `constraint` have their views blocked within `scope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockViews {
    pub scope: String,
    pub constraint: SearchConstraint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub id: String,
    pub kind: CollectionKind,
    pub full_name: String,
    pub short_name: String,
    pub description: String,
    pub icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Homepage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_manager_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_use: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<SearchConstraint>,
    pub publish: SearchConstraint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_views: Option<BlockViews>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_creation: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_submission: Option<IndexMap<String, String>>,
}

impl CollectionMetadata {
    /// Metadata with the required values set and everything optional left empty.
    ///
    /// The publish condition starts as an empty `And`, which every item satisfies.
    pub fn new(
        id: impl Into<String>,
        kind: CollectionKind,
        full_name: impl Into<String>,
        short_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            full_name: full_name.into(),
            short_name: short_name.into(),
            description: String::new(),
            icon_url: String::new(),
            homepage: None,
            collection_manager_address: None,
            terms_of_use: None,
            facets: Vec::new(),
            featured: None,
            publish: SearchConstraint::and(Vec::new()),
            block_views: None,
            record_creation: None,
            image_submission: None,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind == CollectionKind::Collection
    }

    pub fn is_unit(&self) -> bool {
        self.kind == CollectionKind::Unit
    }

    /// Whether an item would be featured. False when no featured condition is set.
    pub fn is_featured(&self, item: &ItemMetadata) -> bool {
        self.featured.as_ref().is_some_and(|c| c.matches(item))
    }

    pub fn is_published(&self, item: &ItemMetadata) -> bool {
        self.publish.matches(item)
    }

    pub fn is_view_blocked(&self, item: &ItemMetadata) -> bool {
        self.block_views
            .as_ref()
            .is_some_and(|b| b.constraint.matches(item))
    }

    /// Parse a `u:collection` element.
    pub(crate) fn from_element(node: Node<'_, '_>) -> Result<Self> {
        let text = |local: &str| xml::required_child_text(node, COLLECTION_NS, local);

        let homepage = xml::child(node, COLLECTION_NS, "homepage")
            .map(|el| {
                Ok::<_, CatalogError>(Homepage {
                    title: xml::required_child_text(el, COLLECTION_NS, "title")?,
                    url: xml::required_child_text(el, COLLECTION_NS, "url")?,
                })
            })
            .transpose()?;

        let facets = match xml::child(node, COLLECTION_NS, "facets") {
            Some(el) => el
                .children()
                .filter(|c| c.is_element() && c.tag_name().namespace() == Some(COLLECTION_NS))
                .map(Facet::from_element)
                .filter_map(Result::transpose)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let featured = xml::child(node, COLLECTION_NS, "featured")
            .map(SearchConstraint::parse_container)
            .transpose()?;
        let publish = SearchConstraint::parse_container(xml::required_child(
            node,
            COLLECTION_NS,
            "publish",
        )?)?;
        let block_views = xml::child(node, COLLECTION_NS, "blockViews")
            .map(|el| {
                Ok::<_, CatalogError>(BlockViews {
                    scope: xml::required_attribute(el, "scope")?,
                    constraint: SearchConstraint::parse_container(el)?,
                })
            })
            .transpose()?;

        Ok(Self {
            id: text("id")?,
            kind: text("type")?.parse::<CollectionKind>()?,
            full_name: text("fullName")?,
            short_name: text("shortName")?,
            description: text("description")?,
            icon_url: text("iconUrl")?,
            homepage,
            collection_manager_address: xml::child_text(node, COLLECTION_NS, "collectionManagerAddress"),
            terms_of_use: xml::child_text(node, COLLECTION_NS, "termsOfUse"),
            facets,
            featured,
            publish,
            block_views,
            record_creation: xml::child(node, COLLECTION_NS, "enableRecordCreation")
                .map(parse_properties),
            image_submission: xml::child(node, COLLECTION_NS, "enableImageSubmission")
                .map(parse_properties),
        })
    }

    /// Write the `u:collection` element.
    pub(crate) fn write_to<W: Write>(&self, w: &mut XmlWriter<W>, is_public: bool) -> Result<()> {
        w.start("u:collection", &[("isPublic", xml::bool_str(is_public))])?;
        w.text_element("u:id", &[], &self.id)?;
        w.text_element("u:type", &[], self.kind.as_str())?;
        w.text_element("u:fullName", &[], &self.full_name)?;
        w.text_element("u:shortName", &[], &self.short_name)?;
        w.text_element("u:description", &[], &self.description)?;
        w.text_element("u:iconUrl", &[], &self.icon_url)?;
        if let Some(homepage) = &self.homepage {
            w.start("u:homepage", &[])?;
            w.text_element("u:title", &[], &homepage.title)?;
            w.text_element("u:url", &[], &homepage.url)?;
            w.end("u:homepage")?;
        }
        w.optional_text_element(
            "u:collectionManagerAddress",
            self.collection_manager_address.as_deref(),
        )?;
        w.optional_text_element("u:termsOfUse", self.terms_of_use.as_deref())?;
        if !self.facets.is_empty() {
            w.start("u:facets", &[])?;
            for facet in &self.facets {
                facet.write_to(w)?;
            }
            w.end("u:facets")?;
        }
        if let Some(featured) = &self.featured {
            SearchConstraint::write_container(w, "u:featured", &[], featured)?;
        }
        SearchConstraint::write_container(w, "u:publish", &[], &self.publish)?;
        if let Some(block) = &self.block_views {
            SearchConstraint::write_container(
                w,
                "u:blockViews",
                &[("scope", block.scope.as_str())],
                &block.constraint,
            )?;
        }
        if let Some(properties) = &self.record_creation {
            write_properties(w, "u:enableRecordCreation", properties)?;
        }
        if let Some(properties) = &self.image_submission {
            write_properties(w, "u:enableImageSubmission", properties)?;
        }
        w.end("u:collection")
    }
}
