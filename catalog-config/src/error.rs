//! Error types for catalog configuration documents

use thiserror::Error;

/// Result type for catalog configuration operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Broad classification of a [`CatalogError`].
///
/// Format errors mean a document could not be read as written. Consistency errors mean
/// each document was fine on its own but the combination is not. Io errors come from
/// the reader or writer handed to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Consistency,
    Io,
}

/// Errors that can occur while loading, merging or writing catalog documents
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Document is not well-formed XML
    #[error("malformed document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Document does not conform to its schema
    #[error("schema violation at {row}:{col}: {message}")]
    Validation {
        message: String,
        row: u32,
        col: u32,
    },

    /// A required child element is absent
    #[error("required element \"{element}\" was not found in \"{parent}\"")]
    MissingElement { element: String, parent: String },

    /// A required attribute is absent
    #[error("required attribute \"{attribute}\" was not found on \"{element}\"")]
    MissingAttribute { attribute: String, element: String },

    /// Attribute or element text that should be an integer is not
    #[error("invalid number for \"{name}\": \"{value}\"")]
    InvalidNumber { name: String, value: String },

    /// Value outside the allowed set (booleans, enumerations, collection kind)
    #[error("invalid value for \"{name}\": \"{value}\"")]
    InvalidValue { name: String, value: String },

    /// Two definition sets in one resolution set share an id
    #[error("more than one definitions set was provided with the id \"{id}\"")]
    DuplicateDefinitions { id: String },

    /// A field configuration names a definitions set that was not supplied
    #[error("no field definitions found with id \"{id}\"")]
    UnknownDefinitions { id: String },

    /// A field configuration names a field type its definitions set lacks
    #[error("undefined field \"{field_type}\" in definitions \"{definition_id}\"")]
    UndefinedField {
        field_type: String,
        definition_id: String,
    },

    /// A default value names a field that is not configured
    #[error("default value is specified for an unconfigured field type \"{field_type}\" in \"{definition_id}\"")]
    UndefinedDefaultValue {
        field_type: String,
        definition_id: String,
    },

    /// Two field configurations share the same identity
    #[error("field \"{field_type}\" is configured more than once for definitions \"{definition_id}\"")]
    DuplicateFieldConfiguration {
        field_type: String,
        definition_id: String,
    },

    /// A condition element uses a type other than FIELD_COMPARISON
    #[error("unsupported condition type: \"{kind}\"")]
    UnsupportedCondition { kind: String },

    /// No field behavior is registered under the binding name
    #[error("no field implementation registered for binding \"{binding}\"")]
    UnknownImplementation { binding: String },

    /// FieldData stored under a key for a different field type
    #[error("field type mismatch: \"{expected}\" vs. \"{actual}\"")]
    FieldTypeMismatch { expected: String, actual: String },

    /// Item belongs to a different collection than the configuration
    #[error("item \"{item_id}\" is not a member of the \"{collection_id}\" collection")]
    CollectionMismatch {
        item_id: String,
        collection_id: String,
    },

    /// Field type is not configured for the collection
    #[error("field type \"{field_type}\" is not configured for the \"{collection_id}\" collection")]
    FieldNotConfigured {
        field_type: String,
        collection_id: String,
    },

    /// Encoded search constraint token could not be decoded
    #[error("invalid encoded search constraint: {message}")]
    Encoding { message: String },

    /// Failure while producing an output document
    #[error("failed to write document: {message}")]
    Write { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Xml(_)
            | CatalogError::Validation { .. }
            | CatalogError::MissingElement { .. }
            | CatalogError::MissingAttribute { .. }
            | CatalogError::InvalidNumber { .. }
            | CatalogError::InvalidValue { .. }
            | CatalogError::Encoding { .. } => ErrorKind::Format,
            CatalogError::DuplicateDefinitions { .. }
            | CatalogError::UnknownDefinitions { .. }
            | CatalogError::UndefinedField { .. }
            | CatalogError::UndefinedDefaultValue { .. }
            | CatalogError::DuplicateFieldConfiguration { .. }
            | CatalogError::UnsupportedCondition { .. }
            | CatalogError::UnknownImplementation { .. }
            | CatalogError::FieldTypeMismatch { .. }
            | CatalogError::CollectionMismatch { .. }
            | CatalogError::FieldNotConfigured { .. } => ErrorKind::Consistency,
            CatalogError::Write { .. } | CatalogError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn missing_element(element: &str, parent: &str) -> Self {
        CatalogError::MissingElement {
            element: element.to_string(),
            parent: parent.to_string(),
        }
    }

    pub(crate) fn missing_attribute(attribute: &str, element: &str) -> Self {
        CatalogError::MissingAttribute {
            attribute: attribute.to_string(),
            element: element.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        CatalogError::Write {
            message: err.to_string(),
        }
    }
}
