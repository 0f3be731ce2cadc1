//! Configuration data model for a digital library catalog
//!
//! `catalog-config` reads, validates, edits and writes the three XML documents a
//! catalog is configured with:
//!
//! - **Definitions** (`info:ico/definition`): the field types a catalog knows about,
//!   their parts and attributes, and their default configuration.
//! - **Collection configuration** (`info:ico/collection`): descriptive metadata for a
//!   collection or unit plus per-field overrides, default values and transformations.
//! - **Item metadata** (`info:photocat/metadata`): the field values of one record.
//!
//! # Architecture
//!
//! - **Validated parsing**: every document is checked against a static structural
//!   schema before the model is built.
//! - **Raw and merged views**: [`CollectionConfigurationData`] is exactly what the file
//!   says and round-trips; [`CollectionConfiguration`] resolves each field against its
//!   [`Definitions`] and merges in the definition defaults.
//! - **Static behaviors**: field behavior is looked up by binding name in a
//!   [`FieldRegistry`] rather than loaded dynamically.

pub mod collection;
pub mod collection_data;
pub mod constraint;
pub mod definitions;
pub mod error;
pub mod field_config;
pub mod item;
pub mod metadata;
pub mod registry;
mod schema;
mod xml;

pub use collection::CollectionConfiguration;
pub use collection_data::{CollectionConfigurationData, TransformationConfiguration};
pub use constraint::SearchConstraint;
pub use definitions::{
    DataSpecification, Definitions, FieldDefinition, Implementation, NameMeaning, SourceDefinition,
};
pub use error::{CatalogError, ErrorKind, Result};
pub use field_config::{FieldConfiguration, FieldKey, VocabularySourceConfiguration};
pub use item::{FieldData, ItemMetadata, NameValuePair};
pub use metadata::{
    BlockViews, CollectionKind, CollectionMetadata, Facet, FacetValue, FacetValueKind, Homepage,
};
pub use registry::{BoundField, FieldBehavior, FieldRegistry};
pub use xml::{COLLECTION_NS, DEFINITION_NS, METADATA_NS, XSI_NS};
