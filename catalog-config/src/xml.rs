//! Namespaces and small helpers shared by every document reader and writer.
//!
//! Reading goes through `roxmltree`, which gives an immutable tree per call. Writing
//! goes through a thin wrapper over `quick_xml::Writer` that knows the handful of
//! shapes our documents use (text element, empty element, element with attributes).

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use roxmltree::{Document, Node};

use crate::error::{CatalogError, Result};

/// Namespace of definitions documents.
pub const DEFINITION_NS: &str = "info:ico/definition";
/// Namespace of collection and unit configuration documents.
pub const COLLECTION_NS: &str = "info:ico/collection";
/// Namespace of item metadata documents.
pub const METADATA_NS: &str = "info:photocat/metadata";
/// XML Schema instance namespace, only ever written on root elements.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Whether `ns` belongs to one of the catalog vocabularies.
pub(crate) fn is_catalog_namespace(ns: Option<&str>) -> bool {
    matches!(ns, Some(DEFINITION_NS) | Some(COLLECTION_NS) | Some(METADATA_NS))
}

pub(crate) fn parse_document(text: &str) -> Result<Document<'_>> {
    Ok(Document::parse(text)?)
}

pub(crate) fn is_element(node: Node<'_, '_>, ns: &str, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(ns)
}

/// Child elements of `node` named `{ns}local`, in document order.
pub(crate) fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| is_element(*c, ns, local))
}

pub(crate) fn child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> Option<Node<'a, 'input>> {
    children(node, ns, local).next()
}

pub(crate) fn required_child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> Result<Node<'a, 'input>> {
    child(node, ns, local)
        .ok_or_else(|| CatalogError::missing_element(local, node.tag_name().name()))
}

/// String value of an element: all descendant text concatenated.
pub(crate) fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

pub(crate) fn child_text(node: Node<'_, '_>, ns: &str, local: &str) -> Option<String> {
    child(node, ns, local).map(text_of)
}

pub(crate) fn required_child_text(node: Node<'_, '_>, ns: &str, local: &str) -> Result<String> {
    required_child(node, ns, local).map(text_of)
}

/// Attribute value by local name, whether or not the attribute is prefixed.
pub(crate) fn attribute(node: Node<'_, '_>, local: &str) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == local)
        .map(|a| a.value().to_string())
}

pub(crate) fn required_attribute(node: Node<'_, '_>, local: &str) -> Result<String> {
    attribute(node, local)
        .ok_or_else(|| CatalogError::missing_attribute(local, node.tag_name().name()))
}

/// Parse an `xs:boolean` lexical value.
pub(crate) fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(CatalogError::InvalidValue {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

pub(crate) fn parse_int(name: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| CatalogError::InvalidNumber {
            name: name.to_string(),
            value: value.to_string(),
        })
}

pub(crate) fn optional_bool_child(node: Node<'_, '_>, ns: &str, local: &str) -> Result<Option<bool>> {
    child_text(node, ns, local)
        .map(|text| parse_bool(local, &text))
        .transpose()
}

pub(crate) fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Indented XML output with the element shapes used by the catalog documents.
pub(crate) struct XmlWriter<W: Write> {
    inner: quick_xml::Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            inner: quick_xml::Writer::new_with_indent(out, b' ', 4),
        }
    }

    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut el = BytesStart::new(name);
        for attr in attrs {
            el.push_attribute(*attr);
        }
        self.event(Event::Start(el))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut el = BytesStart::new(name);
        for attr in attrs {
            el.push_attribute(*attr);
        }
        self.event(Event::Empty(el))
    }

    pub(crate) fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub(crate) fn optional_text_element(&mut self, name: &str, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) => self.text_element(name, &[], text),
            None => Ok(()),
        }
    }

    pub(crate) fn optional_bool_element(&mut self, name: &str, value: Option<bool>) -> Result<()> {
        self.optional_text_element(name, value.map(bool_str))
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner.write_event(event).map_err(CatalogError::write)
    }
}

/// Run `f` against a fresh writer and return the produced document as a string.
pub(crate) fn write_to_string(
    f: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>,
) -> Result<String> {
    let mut writer = XmlWriter::new(Vec::new());
    writer.declaration()?;
    f(&mut writer)?;
    String::from_utf8(writer.into_inner()).map_err(CatalogError::write)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_of_concatenates_descendants() {
        let doc = Document::parse("<a xmlns='x'>one<b>two</b>three</a>").unwrap();
        assert_eq!(text_of(doc.root_element()), "onetwothree");
    }

    #[test]
    fn attribute_matches_prefixed_and_plain() {
        let doc = Document::parse(
            "<d:a xmlns:d='info:ico/definition' d:type='TITLE' id='core'/>",
        )
        .unwrap();
        let root = doc.root_element();
        assert_eq!(attribute(root, "type").as_deref(), Some("TITLE"));
        assert_eq!(attribute(root, "id").as_deref(), Some("core"));
        assert!(attribute(root, "missing").is_none());
    }

    #[test]
    fn parse_bool_accepts_schema_lexicals() {
        assert!(parse_bool("x", "true").unwrap());
        assert!(parse_bool("x", " 1 ").unwrap());
        assert!(!parse_bool("x", "false").unwrap());
        assert!(!parse_bool("x", "0").unwrap());
        assert!(parse_bool("x", "yes").is_err());
    }

    #[test]
    fn parse_int_reports_name() {
        let err = parse_int("catalogingSortIndex", "abc").unwrap_err();
        assert!(err.to_string().contains("catalogingSortIndex"));
        assert_eq!(parse_int("n", " -4 ").unwrap(), -4);
    }

    #[test]
    fn writer_escapes_text_and_attributes() {
        let xml = write_to_string(|w| {
            w.start("u:root", &[("xmlns:u", COLLECTION_NS)])?;
            w.text_element("u:name", &[("name", "a\"b")], "x < y & z")?;
            w.optional_text_element("u:skip", None)?;
            w.end("u:root")
        })
        .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("x &lt; y &amp; z"));
        assert!(!xml.contains("u:skip"));

        let doc = Document::parse(&xml).unwrap();
        let name = child(doc.root_element(), COLLECTION_NS, "name").unwrap();
        assert_eq!(text_of(name), "x < y & z");
        assert_eq!(attribute(name, "name").as_deref(), Some("a\"b"));
    }
}
