//! Declarative structure checks for the three catalog document types.
//!
//! Each element is described by a static [`ElementSchema`]; recursive shapes (nested
//! facet values, nested `or` groups) simply point back at their own static. Validation
//! runs before any model is built.
//!
//! Anything in a catalog namespace that the tables do not allow is an error and aborts
//! the parse. Elements and attributes from foreign namespaces (for example
//! `xsi:schemaLocation`) are reported as warnings through `tracing` and skipped.
//! Sibling order is not enforced, only occurrence counts.

use roxmltree::{Document, Node};
use tracing::warn;

use crate::error::{CatalogError, Result};
use crate::xml::{is_catalog_namespace, COLLECTION_NS, DEFINITION_NS, METADATA_NS};

/// How often a child element may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Occurs {
    Required,
    Optional,
    Many,
    AtLeastOne,
}

impl Occurs {
    fn min(self) -> usize {
        match self {
            Occurs::Required | Occurs::AtLeastOne => 1,
            Occurs::Optional | Occurs::Many => 0,
        }
    }

    fn max(self) -> Option<usize> {
        match self {
            Occurs::Required | Occurs::Optional => Some(1),
            Occurs::Many | Occurs::AtLeastOne => None,
        }
    }
}

/// Lexical constraint on text or attribute values.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ValueKind {
    String,
    Boolean,
    Integer,
    Enumeration(&'static [&'static str]),
}

pub(crate) struct AttributeSchema {
    pub name: &'static str,
    pub required: bool,
    pub kind: ValueKind,
}

pub(crate) struct Particle {
    pub element: &'static ElementSchema,
    pub occurs: Occurs,
}

pub(crate) enum Content {
    Empty,
    Text(ValueKind),
    Elements(&'static [Particle]),
}

pub(crate) struct ElementSchema {
    pub namespace: &'static str,
    pub name: &'static str,
    pub attributes: &'static [AttributeSchema],
    pub content: Content,
}

const fn text(namespace: &'static str, name: &'static str) -> ElementSchema {
    ElementSchema {
        namespace,
        name,
        attributes: &[],
        content: Content::Text(ValueKind::String),
    }
}

const fn boolean(namespace: &'static str, name: &'static str) -> ElementSchema {
    ElementSchema {
        namespace,
        name,
        attributes: &[],
        content: Content::Text(ValueKind::Boolean),
    }
}

const fn parent(
    namespace: &'static str,
    name: &'static str,
    children: &'static [Particle],
) -> ElementSchema {
    ElementSchema {
        namespace,
        name,
        attributes: &[],
        content: Content::Elements(children),
    }
}

const fn one(element: &'static ElementSchema) -> Particle {
    Particle {
        element,
        occurs: Occurs::Required,
    }
}

const fn opt(element: &'static ElementSchema) -> Particle {
    Particle {
        element,
        occurs: Occurs::Optional,
    }
}

const fn many(element: &'static ElementSchema) -> Particle {
    Particle {
        element,
        occurs: Occurs::Many,
    }
}

const fn required_attr(name: &'static str, kind: ValueKind) -> AttributeSchema {
    AttributeSchema {
        name,
        required: true,
        kind,
    }
}

const fn optional_attr(name: &'static str, kind: ValueKind) -> AttributeSchema {
    AttributeSchema {
        name,
        required: false,
        kind,
    }
}

// ---------------------------------------------------------------------------
// Item metadata (m:)
// ---------------------------------------------------------------------------

static M_ID: ElementSchema = text(METADATA_NS, "id");
static M_COLLECTION_ID: ElementSchema = text(METADATA_NS, "collectionId");
static M_ATTRIBUTE: ElementSchema = ElementSchema {
    namespace: METADATA_NS,
    name: "attribute",
    attributes: &[required_attr("name", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static M_PART: ElementSchema = ElementSchema {
    namespace: METADATA_NS,
    name: "part",
    attributes: &[required_attr("property", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static M_VALUE_CHILDREN: [Particle; 1] = [many(&M_PART)];
static M_VALUE: ElementSchema = parent(METADATA_NS, "value", &M_VALUE_CHILDREN);
static M_VALUES_CHILDREN: [Particle; 1] = [many(&M_VALUE)];
static M_VALUES: ElementSchema = parent(METADATA_NS, "values", &M_VALUES_CHILDREN);
static M_FIELD_CHILDREN: [Particle; 2] = [many(&M_ATTRIBUTE), opt(&M_VALUES)];
pub(crate) static M_FIELD: ElementSchema = ElementSchema {
    namespace: METADATA_NS,
    name: "field",
    attributes: &[required_attr("fieldType", ValueKind::String)],
    content: Content::Elements(&M_FIELD_CHILDREN),
};
static M_ITEM_CHILDREN: [Particle; 3] = [one(&M_ID), one(&M_COLLECTION_ID), many(&M_FIELD)];
pub(crate) static ITEM_METADATA: ElementSchema =
    parent(METADATA_NS, "itemMetadata", &M_ITEM_CHILDREN);

// ---------------------------------------------------------------------------
// Field configuration grammar (u:), shared by configuration and definitions
// ---------------------------------------------------------------------------

static U_PROPERTY: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "property",
    attributes: &[required_attr("name", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static U_PROPERTIES: [Particle; 1] = [many(&U_PROPERTY)];

static U_DISPLAY_LABEL: ElementSchema = text(COLLECTION_NS, "displayLabel");
static U_ATTRIBUTE_DISPLAY_LABEL: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "attributeDisplayLabel",
    attributes: &[required_attr("attributeName", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static U_PART_DISPLAY_LABEL: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "partDisplayLabel",
    attributes: &[required_attr("partName", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static U_USAGE_NOTES: ElementSchema = text(COLLECTION_NS, "usageNotes");
static U_READ_ONLY: ElementSchema = boolean(COLLECTION_NS, "readOnly");
static U_REPEATABLE: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "repeatable",
    attributes: &[optional_attr("startingBoxes", ValueKind::Integer)],
    content: Content::Text(ValueKind::Boolean),
};
static U_CATALOGING_BRIEF: ElementSchema = boolean(COLLECTION_NS, "displayedInCatalogingBriefView");
static U_CATALOGING_FULL: ElementSchema = boolean(COLLECTION_NS, "exposedInCatalogingFullView");
static U_DISCOVERY_BRIEF: ElementSchema = boolean(COLLECTION_NS, "displayedInDiscoveryBriefView");
static U_DISCOVERY_FULL: ElementSchema = boolean(COLLECTION_NS, "displayedInDiscoveryFullView");
static U_PRIVATE: ElementSchema = boolean(COLLECTION_NS, "private");
static U_DISABLE: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "disable",
    attributes: &[
        required_attr("name", ValueKind::String),
        required_attr("type", ValueKind::Enumeration(&["part", "attribute"])),
    ],
    content: Content::Empty,
};
static U_AUTHORITY_BINDING: ElementSchema = text(COLLECTION_NS, "authorityBinding");
static U_VALUE_BINDING: ElementSchema = text(COLLECTION_NS, "valueBinding");
static U_SOURCE_CONFIG: ElementSchema = parent(COLLECTION_NS, "sourceConfig", &U_PROPERTIES);
static U_VOCABULARY_SOURCE_CHILDREN: [Particle; 3] = [
    opt(&U_AUTHORITY_BINDING),
    one(&U_VALUE_BINDING),
    opt(&U_SOURCE_CONFIG),
];
static U_VOCABULARY_SOURCE: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "vocabularySource",
    attributes: &[
        required_attr("id", ValueKind::String),
        required_attr("type", ValueKind::String),
    ],
    content: Content::Elements(&U_VOCABULARY_SOURCE_CHILDREN),
};

static FIELD_CONFIGURATION_CHILDREN: [Particle; 13] = [
    opt(&U_DISPLAY_LABEL),
    many(&U_ATTRIBUTE_DISPLAY_LABEL),
    many(&U_PART_DISPLAY_LABEL),
    opt(&U_USAGE_NOTES),
    opt(&U_READ_ONLY),
    opt(&U_REPEATABLE),
    opt(&U_CATALOGING_BRIEF),
    opt(&U_CATALOGING_FULL),
    opt(&U_DISCOVERY_BRIEF),
    opt(&U_DISCOVERY_FULL),
    opt(&U_PRIVATE),
    many(&U_DISABLE),
    many(&U_VOCABULARY_SOURCE),
];

// ---------------------------------------------------------------------------
// Collection configuration (u:)
// ---------------------------------------------------------------------------

static U_ID: ElementSchema = text(COLLECTION_NS, "id");
static U_TYPE: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "type",
    attributes: &[],
    content: Content::Text(ValueKind::Enumeration(&["collection", "unit"])),
};
static U_FULL_NAME: ElementSchema = text(COLLECTION_NS, "fullName");
static U_SHORT_NAME: ElementSchema = text(COLLECTION_NS, "shortName");
static U_DESCRIPTION: ElementSchema = text(COLLECTION_NS, "description");
static U_ICON_URL: ElementSchema = text(COLLECTION_NS, "iconUrl");
static U_TITLE: ElementSchema = text(COLLECTION_NS, "title");
static U_URL: ElementSchema = text(COLLECTION_NS, "url");
static U_HOMEPAGE_CHILDREN: [Particle; 2] = [one(&U_TITLE), one(&U_URL)];
static U_HOMEPAGE: ElementSchema = parent(COLLECTION_NS, "homepage", &U_HOMEPAGE_CHILDREN);
static U_MANAGER_ADDRESS: ElementSchema = text(COLLECTION_NS, "collectionManagerAddress");
static U_TERMS_OF_USE: ElementSchema = text(COLLECTION_NS, "termsOfUse");

static U_NAME: ElementSchema = text(COLLECTION_NS, "name");
static U_FIELD_TYPE: ElementSchema = text(COLLECTION_NS, "fieldType");
static U_FIELD_PART: ElementSchema = text(COLLECTION_NS, "fieldPart");
static U_FIELD_VALUE: ElementSchema = text(COLLECTION_NS, "fieldValue");
static U_DATE_FORMAT: ElementSchema = text(COLLECTION_NS, "dateFormat");
static U_COLLECTION_FACET_CHILDREN: [Particle; 1] = [one(&U_NAME)];
static U_COLLECTION_FACET: ElementSchema =
    parent(COLLECTION_NS, "collectionFacet", &U_COLLECTION_FACET_CHILDREN);
static U_FACET_CHILDREN: [Particle; 3] = [one(&U_NAME), one(&U_FIELD_TYPE), one(&U_FIELD_PART)];
static U_FACET: ElementSchema = parent(COLLECTION_NS, "facet", &U_FACET_CHILDREN);
static U_DATE_FACET_CHILDREN: [Particle; 4] = [
    one(&U_NAME),
    one(&U_FIELD_TYPE),
    one(&U_FIELD_PART),
    one(&U_DATE_FORMAT),
];
static U_DATE_FACET: ElementSchema = parent(COLLECTION_NS, "dateFacet", &U_DATE_FACET_CHILDREN);
static U_FACET_VALUE_CHILDREN: [Particle; 5] = [
    one(&U_NAME),
    one(&U_FIELD_TYPE),
    one(&U_FIELD_PART),
    opt(&U_FIELD_VALUE),
    many(&U_FACET_VALUE),
];
static U_FACET_VALUE: ElementSchema = parent(COLLECTION_NS, "facetValue", &U_FACET_VALUE_CHILDREN);
static U_ENUMERATED_FACET_CHILDREN: [Particle; 2] = [one(&U_NAME), many(&U_FACET_VALUE)];
static U_ENUMERATED_FACET: ElementSchema =
    parent(COLLECTION_NS, "enumeratedFacet", &U_ENUMERATED_FACET_CHILDREN);
static U_FACETS_CHILDREN: [Particle; 4] = [
    many(&U_COLLECTION_FACET),
    many(&U_FACET),
    many(&U_DATE_FACET),
    many(&U_ENUMERATED_FACET),
];
static U_FACETS: ElementSchema = parent(COLLECTION_NS, "facets", &U_FACETS_CHILDREN);

static U_CONDITION: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "condition",
    attributes: &[required_attr("type", ValueKind::String)],
    content: Content::Elements(&U_PROPERTIES),
};
static U_CONSTRAINTS: [Particle; 2] = [many(&U_OR), many(&U_CONDITION)];
static U_OR: ElementSchema = parent(COLLECTION_NS, "or", &U_CONSTRAINTS);
static U_FEATURED: ElementSchema = parent(COLLECTION_NS, "featured", &U_CONSTRAINTS);
static U_PUBLISH: ElementSchema = parent(COLLECTION_NS, "publish", &U_CONSTRAINTS);
static U_BLOCK_VIEWS: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "blockViews",
    attributes: &[required_attr("scope", ValueKind::String)],
    content: Content::Elements(&U_CONSTRAINTS),
};
static U_RECORD_CREATION: ElementSchema =
    parent(COLLECTION_NS, "enableRecordCreation", &U_PROPERTIES);
static U_IMAGE_SUBMISSION: ElementSchema =
    parent(COLLECTION_NS, "enableImageSubmission", &U_PROPERTIES);

static U_COLLECTION_CHILDREN: [Particle; 15] = [
    one(&U_ID),
    one(&U_TYPE),
    one(&U_FULL_NAME),
    one(&U_SHORT_NAME),
    one(&U_DESCRIPTION),
    one(&U_ICON_URL),
    opt(&U_HOMEPAGE),
    opt(&U_MANAGER_ADDRESS),
    opt(&U_TERMS_OF_USE),
    opt(&U_FACETS),
    opt(&U_FEATURED),
    one(&U_PUBLISH),
    opt(&U_BLOCK_VIEWS),
    opt(&U_RECORD_CREATION),
    opt(&U_IMAGE_SUBMISSION),
];
static U_COLLECTION: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "collection",
    attributes: &[optional_attr("isPublic", ValueKind::Boolean)],
    content: Content::Elements(&U_COLLECTION_CHILDREN),
};

static U_FIELD: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "field",
    attributes: &[
        required_attr("type", ValueKind::String),
        optional_attr("catalogingSortIndex", ValueKind::Integer),
        optional_attr("publicationSortIndex", ValueKind::Integer),
    ],
    content: Content::Elements(&FIELD_CONFIGURATION_CHILDREN),
};
static U_DEFAULT_VALUES_CHILDREN: [Particle; 1] = [many(&M_FIELD)];
static U_DEFAULT_VALUES: ElementSchema =
    parent(COLLECTION_NS, "defaultValues", &U_DEFAULT_VALUES_CHILDREN);
static U_FIELDS_CHILDREN: [Particle; 2] = [many(&U_FIELD), opt(&U_DEFAULT_VALUES)];
static U_FIELDS: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "fields",
    attributes: &[required_attr("definitionId", ValueKind::String)],
    content: Content::Elements(&U_FIELDS_CHILDREN),
};
static U_FORMAT_NAME: ElementSchema = text(COLLECTION_NS, "formatName");
static U_XSLT_URL: ElementSchema = text(COLLECTION_NS, "xsltUrl");
static U_TRANSFORMATION_CHILDREN: [Particle; 2] = [one(&U_FORMAT_NAME), one(&U_XSLT_URL)];
static U_TRANSFORMATION: ElementSchema = ElementSchema {
    namespace: COLLECTION_NS,
    name: "transformation",
    attributes: &[
        required_attr("id", ValueKind::String),
        required_attr("fidelity", ValueKind::Enumeration(&["lossy", "lossless"])),
    ],
    content: Content::Elements(&U_TRANSFORMATION_CHILDREN),
};
static U_ITEM_CHILDREN: [Particle; 2] = [
    Particle {
        element: &U_FIELDS,
        occurs: Occurs::AtLeastOne,
    },
    many(&U_TRANSFORMATION),
];
static U_ITEM: ElementSchema = parent(COLLECTION_NS, "item", &U_ITEM_CHILDREN);
static U_CONFIGURATION_CHILDREN: [Particle; 2] = [one(&U_COLLECTION), one(&U_ITEM)];
pub(crate) static CONFIGURATION: ElementSchema =
    parent(COLLECTION_NS, "configuration", &U_CONFIGURATION_CHILDREN);

// ---------------------------------------------------------------------------
// Definitions (d:)
// ---------------------------------------------------------------------------

static D_NAME: ElementSchema = text(DEFINITION_NS, "name");
static D_MEANING: ElementSchema = text(DEFINITION_NS, "meaning");
static D_NAME_MEANING: [Particle; 2] = [one(&D_NAME), one(&D_MEANING)];
static D_MEANING_AND_USAGE: ElementSchema = text(DEFINITION_NS, "meaningAndUsage");
static D_BINDING: ElementSchema = text(DEFINITION_NS, "binding");
static D_PROPERTY: ElementSchema = ElementSchema {
    namespace: DEFINITION_NS,
    name: "property",
    attributes: &[required_attr("name", ValueKind::String)],
    content: Content::Text(ValueKind::String),
};
static D_IMPLEMENTATION_CHILDREN: [Particle; 2] = [one(&D_BINDING), many(&D_PROPERTY)];
static D_IMPLEMENTATION: ElementSchema =
    parent(DEFINITION_NS, "implementation", &D_IMPLEMENTATION_CHILDREN);
static D_ATTRIBUTE: ElementSchema = parent(DEFINITION_NS, "attribute", &D_NAME_MEANING);
static D_PART: ElementSchema = parent(DEFINITION_NS, "part", &D_NAME_MEANING);
static D_VALUE_CHILDREN: [Particle; 1] = [many(&D_PART)];
static D_VALUE: ElementSchema = parent(DEFINITION_NS, "value", &D_VALUE_CHILDREN);
static D_DATA_SPECIFICATION_CHILDREN: [Particle; 2] = [many(&D_ATTRIBUTE), opt(&D_VALUE)];
static D_DATA_SPECIFICATION: ElementSchema =
    parent(DEFINITION_NS, "dataSpecification", &D_DATA_SPECIFICATION_CHILDREN);
static D_DEFAULT_CONFIGURATION: ElementSchema = parent(
    DEFINITION_NS,
    "defaultConfiguration",
    &FIELD_CONFIGURATION_CHILDREN,
);
static D_FIELD_DEFINITION_CHILDREN: [Particle; 4] = [
    one(&D_MEANING_AND_USAGE),
    one(&D_IMPLEMENTATION),
    one(&D_DATA_SPECIFICATION),
    one(&D_DEFAULT_CONFIGURATION),
];
static D_FIELD_DEFINITION: ElementSchema = ElementSchema {
    namespace: DEFINITION_NS,
    name: "fieldDefinition",
    attributes: &[required_attr("type", ValueKind::String)],
    content: Content::Elements(&D_FIELD_DEFINITION_CHILDREN),
};
static D_PARAM: ElementSchema = parent(DEFINITION_NS, "param", &D_NAME_MEANING);
static D_CONFIGURATION_PARAMETERS_CHILDREN: [Particle; 1] = [many(&D_PARAM)];
static D_CONFIGURATION_PARAMETERS: ElementSchema = parent(
    DEFINITION_NS,
    "configurationParameters",
    &D_CONFIGURATION_PARAMETERS_CHILDREN,
);
static D_SOURCE_DEFINITION_CHILDREN: [Particle; 2] =
    [one(&D_IMPLEMENTATION), opt(&D_CONFIGURATION_PARAMETERS)];
static D_SOURCE_DEFINITION: ElementSchema = ElementSchema {
    namespace: DEFINITION_NS,
    name: "sourceDefinition",
    attributes: &[required_attr("type", ValueKind::String)],
    content: Content::Elements(&D_SOURCE_DEFINITION_CHILDREN),
};
static D_DEFINITIONS_CHILDREN: [Particle; 2] =
    [many(&D_FIELD_DEFINITION), many(&D_SOURCE_DEFINITION)];
// `id` is checked by the loader so the error names the attribute directly
pub(crate) static DEFINITIONS: ElementSchema = ElementSchema {
    namespace: DEFINITION_NS,
    name: "definitions",
    attributes: &[optional_attr("id", ValueKind::String)],
    content: Content::Elements(&D_DEFINITIONS_CHILDREN),
};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse `text` and check it against `root` in one step.
pub(crate) fn parse_validated<'input>(
    text: &'input str,
    root: &ElementSchema,
) -> Result<Document<'input>> {
    let doc = crate::xml::parse_document(text)?;
    validate(&doc, root)?;
    Ok(doc)
}

/// Check a parsed document against the schema of its root element.
pub(crate) fn validate(doc: &Document<'_>, root: &ElementSchema) -> Result<()> {
    let el = doc.root_element();
    if !matches_schema(el, root) {
        return Err(violation(
            doc,
            el,
            format!(
                "expected root element {{{}}}{} but found {{{}}}{}",
                root.namespace,
                root.name,
                el.tag_name().namespace().unwrap_or(""),
                el.tag_name().name()
            ),
        ));
    }
    validate_element(doc, el, root)
}

fn matches_schema(node: Node<'_, '_>, schema: &ElementSchema) -> bool {
    node.tag_name().name() == schema.name && node.tag_name().namespace() == Some(schema.namespace)
}

fn violation(doc: &Document<'_>, node: Node<'_, '_>, message: String) -> CatalogError {
    let pos = doc.text_pos_at(node.range().start);
    CatalogError::Validation {
        message,
        row: pos.row,
        col: pos.col,
    }
}

fn validate_element(doc: &Document<'_>, node: Node<'_, '_>, schema: &ElementSchema) -> Result<()> {
    validate_attributes(doc, node, schema)?;

    match schema.content {
        Content::Empty => {
            if let Some(stray) = node
                .children()
                .find(|c| c.is_element() || c.text().is_some_and(|t| !t.trim().is_empty()))
            {
                return Err(violation(
                    doc,
                    stray,
                    format!("element \"{}\" must be empty", schema.name),
                ));
            }
            Ok(())
        }
        Content::Text(kind) => {
            if let Some(child) = node.children().find(|c| c.is_element()) {
                if is_catalog_namespace(child.tag_name().namespace()) {
                    return Err(violation(
                        doc,
                        child,
                        format!(
                            "element \"{}\" may only hold text, found \"{}\"",
                            schema.name,
                            child.tag_name().name()
                        ),
                    ));
                }
                warn!(
                    element = schema.name,
                    child = child.tag_name().name(),
                    "ignoring foreign element inside text content"
                );
            }
            let value = crate::xml::text_of(node);
            check_value(doc, node, schema.name, kind, &value)
        }
        Content::Elements(particles) => validate_children(doc, node, schema, particles),
    }
}

fn validate_attributes(doc: &Document<'_>, node: Node<'_, '_>, schema: &ElementSchema) -> Result<()> {
    for attr in node.attributes() {
        match attr.namespace() {
            Some(ns) if ns != schema.namespace => {
                warn!(
                    element = schema.name,
                    attribute = attr.name(),
                    namespace = ns,
                    "ignoring foreign attribute"
                );
                continue;
            }
            _ => {}
        }
        let decl = schema
            .attributes
            .iter()
            .find(|a| a.name == attr.name())
            .ok_or_else(|| {
                violation(
                    doc,
                    node,
                    format!(
                        "attribute \"{}\" is not allowed on \"{}\"",
                        attr.name(),
                        schema.name
                    ),
                )
            })?;
        check_value(doc, node, decl.name, decl.kind, attr.value())?;
    }

    for decl in schema.attributes.iter().filter(|a| a.required) {
        if !node.attributes().any(|a| a.name() == decl.name) {
            return Err(violation(
                doc,
                node,
                format!(
                    "required attribute \"{}\" is missing on \"{}\"",
                    decl.name, schema.name
                ),
            ));
        }
    }
    Ok(())
}

fn validate_children(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    schema: &ElementSchema,
    particles: &[Particle],
) -> Result<()> {
    let mut counts = vec![0usize; particles.len()];

    for child in node.children() {
        if child.is_text() {
            if child.text().is_some_and(|t| !t.trim().is_empty()) {
                return Err(violation(
                    doc,
                    child,
                    format!("element \"{}\" may not hold text", schema.name),
                ));
            }
            continue;
        }
        if !child.is_element() {
            continue;
        }
        if !is_catalog_namespace(child.tag_name().namespace()) {
            warn!(
                element = schema.name,
                child = child.tag_name().name(),
                "ignoring foreign element"
            );
            continue;
        }
        let index = particles
            .iter()
            .position(|p| matches_schema(child, p.element))
            .ok_or_else(|| {
                violation(
                    doc,
                    child,
                    format!(
                        "element \"{}\" is not allowed in \"{}\"",
                        child.tag_name().name(),
                        schema.name
                    ),
                )
            })?;
        counts[index] += 1;
        if let Some(max) = particles[index].occurs.max() {
            if counts[index] > max {
                return Err(violation(
                    doc,
                    child,
                    format!(
                        "element \"{}\" may occur at most {} time(s) in \"{}\"",
                        child.tag_name().name(),
                        max,
                        schema.name
                    ),
                ));
            }
        }
        validate_element(doc, child, particles[index].element)?;
    }

    for (particle, count) in particles.iter().zip(counts) {
        if count < particle.occurs.min() {
            return Err(violation(
                doc,
                node,
                format!(
                    "required element \"{}\" is missing in \"{}\"",
                    particle.element.name, schema.name
                ),
            ));
        }
    }
    Ok(())
}

fn check_value(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
    kind: ValueKind,
    value: &str,
) -> Result<()> {
    let ok = match kind {
        ValueKind::String => true,
        ValueKind::Boolean => matches!(value.trim(), "true" | "false" | "1" | "0"),
        ValueKind::Integer => value.trim().parse::<i64>().is_ok(),
        ValueKind::Enumeration(allowed) => allowed.contains(&value.trim()),
    };
    if ok {
        Ok(())
    } else {
        Err(violation(
            doc,
            node,
            format!("invalid value \"{}\" for \"{}\"", value, name),
        ))
    }
}
