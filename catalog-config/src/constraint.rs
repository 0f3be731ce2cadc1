//! Boolean search conditions embedded in collection metadata.
//!
//! Collections use these to decide which items are published, which are featured and
//! which have their views blocked. The tree is deliberately small: `And`, `Or`, and a
//! comparison of one field part against a literal value.

use std::fmt;
use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::item::ItemMetadata;
use crate::xml::{self, XmlWriter, COLLECTION_NS};

const FIELD_COMPARISON: &str = "FIELD_COMPARISON";
const TOKEN_DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SearchConstraint {
    And { children: Vec<SearchConstraint> },
    Or { children: Vec<SearchConstraint> },
    FieldComparison {
        field: String,
        part: String,
        value: String,
    },
}

impl SearchConstraint {
    pub fn field_comparison(
        field: impl Into<String>,
        part: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        SearchConstraint::FieldComparison {
            field: field.into(),
            part: part.into(),
            value: value.into(),
        }
    }

    pub fn and(children: Vec<SearchConstraint>) -> Self {
        SearchConstraint::And { children }
    }

    pub fn or(children: Vec<SearchConstraint>) -> Self {
        SearchConstraint::Or { children }
    }

    /// Read the children of a `featured`, `publish` or `blockViews` element.
    ///
    /// A single child is returned as is; anything else is wrapped in `And`.
    pub(crate) fn parse_container(node: Node<'_, '_>) -> Result<Self> {
        let mut children = Self::parse_children(node)?;
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(SearchConstraint::And { children })
        }
    }

    fn parse_children(node: Node<'_, '_>) -> Result<Vec<Self>> {
        node.children()
            .filter(|c| c.is_element() && c.tag_name().namespace() == Some(COLLECTION_NS))
            .map(Self::parse)
            .collect()
    }

    fn parse(node: Node<'_, '_>) -> Result<Self> {
        match node.tag_name().name() {
            "or" => Ok(SearchConstraint::Or {
                children: Self::parse_children(node)?,
            }),
            "condition" => {
                let kind = xml::required_attribute(node, "type")?;
                if kind != FIELD_COMPARISON {
                    return Err(CatalogError::UnsupportedCondition { kind });
                }
                let property = |name: &str| {
                    xml::children(node, COLLECTION_NS, "property")
                        .find(|p| xml::attribute(*p, "name").as_deref() == Some(name))
                        .map(xml::text_of)
                        .unwrap_or_default()
                };
                Ok(SearchConstraint::FieldComparison {
                    field: property("field"),
                    part: property("part"),
                    value: property("value"),
                })
            }
            other => Err(CatalogError::UnsupportedCondition {
                kind: other.to_string(),
            }),
        }
    }

    /// Write `constraint` as the content of a container element.
    pub(crate) fn write_container<W: Write>(
        w: &mut XmlWriter<W>,
        element: &str,
        attrs: &[(&str, &str)],
        constraint: &SearchConstraint,
    ) -> Result<()> {
        w.start(element, attrs)?;
        constraint.write_to(w)?;
        w.end(element)
    }

    /// `And` has no element of its own, so its children land directly in the parent.
    fn write_to<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            SearchConstraint::And { children } => {
                for child in children {
                    child.write_to(w)?;
                }
                Ok(())
            }
            SearchConstraint::Or { children } => {
                w.start("u:or", &[])?;
                for child in children {
                    child.write_to(w)?;
                }
                w.end("u:or")
            }
            SearchConstraint::FieldComparison { field, part, value } => {
                w.start("u:condition", &[("type", FIELD_COMPARISON)])?;
                w.text_element("u:property", &[("name", "field")], field)?;
                w.text_element("u:property", &[("name", "part")], part)?;
                w.text_element("u:property", &[("name", "value")], value)?;
                w.end("u:condition")
            }
        }
    }

    /// Whether `item` satisfies this condition.
    ///
    /// An empty `And` matches everything; an empty `Or` matches nothing.
    pub fn matches(&self, item: &ItemMetadata) -> bool {
        match self {
            SearchConstraint::And { children } => children.iter().all(|c| c.matches(item)),
            SearchConstraint::Or { children } => children.iter().any(|c| c.matches(item)),
            SearchConstraint::FieldComparison { field, part, value } => item
                .field_data(field)
                .is_some_and(|data| data.part_values(part).contains(&value.as_str())),
        }
    }

    /// Compact single-line token, suitable for a query string.
    pub fn encode(&self) -> String {
        let parts = match self {
            SearchConstraint::And { children } => group_parts("and", children),
            SearchConstraint::Or { children } => group_parts("or", children),
            SearchConstraint::FieldComparison { field, part, value } => vec![
                "fpvl".to_string(),
                field.clone(),
                part.clone(),
                value.clone(),
                String::new(),
            ],
        };
        parts
            .iter()
            .map(|p| STANDARD.encode(p.as_bytes()))
            .collect::<Vec<_>>()
            .join(&TOKEN_DELIMITER.to_string())
    }

    /// Inverse of [`SearchConstraint::encode`].
    pub fn decode(token: &str) -> Result<Self> {
        let parts = token
            .split(TOKEN_DELIMITER)
            .map(|p| {
                let bytes = STANDARD.decode(p).map_err(encoding_error)?;
                String::from_utf8(bytes).map_err(encoding_error)
            })
            .collect::<Result<Vec<_>>>()?;

        match parts.first().map(String::as_str) {
            Some("fpvl") if parts.len() >= 4 => Ok(SearchConstraint::FieldComparison {
                field: parts[1].clone(),
                part: parts[2].clone(),
                value: parts[3].clone(),
            }),
            Some(tag @ ("and" | "or")) if parts.len() >= 3 => {
                let children = parts[3..]
                    .iter()
                    .map(|child| Self::decode(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(if tag == "and" {
                    SearchConstraint::And { children }
                } else {
                    SearchConstraint::Or { children }
                })
            }
            Some(other) => Err(CatalogError::Encoding {
                message: format!("unknown or truncated constraint \"{other}\""),
            }),
            None => Err(CatalogError::Encoding {
                message: "empty token".to_string(),
            }),
        }
    }
}

fn group_parts(tag: &str, children: &[SearchConstraint]) -> Vec<String> {
    // display text is never set for configured groups; "t" marks the group implicit
    let mut parts = vec![tag.to_string(), String::new(), "t".to_string()];
    parts.extend(children.iter().map(SearchConstraint::encode));
    parts
}

fn encoding_error(err: impl fmt::Display) -> CatalogError {
    CatalogError::Encoding {
        message: err.to_string(),
    }
}

impl fmt::Display for SearchConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn group(f: &mut fmt::Formatter<'_>, op: &str, children: &[SearchConstraint]) -> fmt::Result {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        }
        match self {
            SearchConstraint::And { children } => group(f, "AND", children),
            SearchConstraint::Or { children } => group(f, "OR", children),
            SearchConstraint::FieldComparison { field, part, value } => {
                write!(f, "{field}.{part} = \"{value}\"")
            }
        }
    }
}
