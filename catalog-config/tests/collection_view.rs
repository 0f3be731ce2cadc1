//! The merged view of a collection over its definitions, driven from fixture files.

use std::path::PathBuf;
use std::sync::Arc;

use catalog_config::{
    CatalogError, CollectionConfiguration, CollectionConfigurationData, Definitions, FieldRegistry,
    ItemMetadata,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn collection() -> CollectionConfiguration {
    let data = CollectionConfigurationData::from_path(fixture("collection.xml")).unwrap();
    let defs = Definitions::from_path(fixture("definitions.xml")).unwrap();
    CollectionConfiguration::new(data, [Arc::new(defs)]).unwrap()
}

fn item() -> ItemMetadata {
    ItemMetadata::from_path(fixture("item.xml")).unwrap()
}

fn types(collection: &CollectionConfiguration, include_private: bool) -> Vec<String> {
    collection
        .list_field_configurations(include_private)
        .into_iter()
        .map(|c| c.field_type.clone())
        .collect()
}

#[test_log::test]
fn fields_are_listed_in_both_orders() {
    let collection = collection();
    assert_eq!(types(&collection, true), vec!["TITLE", "CREATOR", "SUBJECT", "NOTE"]);
    assert_eq!(types(&collection, false), vec!["TITLE", "SUBJECT", "CREATOR"]);
}

#[test_log::test]
fn overrides_sit_on_top_of_definition_defaults() {
    let collection = collection();
    let creator = collection.field_configuration("CREATOR").unwrap();
    assert_eq!(creator.display_label.as_deref(), Some("Creator"));
    assert_eq!(creator.starting_boxes, Some(2));
    assert!(creator.is_part_disabled("uri"));
    assert_eq!(collection.enabled_part_names(creator), vec!["family", "given"]);
    assert_eq!(collection.field_part_name("CREATOR", "family"), "Creator -- Family name");

    let subject = collection.field_configuration("SUBJECT").unwrap();
    assert_eq!(collection.browsable_part_names(subject), vec!["term"]);
    assert_eq!(collection.field_part_name("SUBJECT", "term"), "Subject");
    assert!(collection.source_definition(subject, "authority").is_some());
}

#[test_log::test]
fn item_splits_into_public_and_private_parts() {
    let collection = collection();
    let item = item();
    let public = collection.public_item_metadata(&item);
    let private = collection.private_item_metadata(&item);

    assert!(public.field_data("NOTE").is_none());
    assert_eq!(public.represented_field_types().count(), 3);
    assert_eq!(private.represented_field_types().collect::<Vec<_>>(), vec!["NOTE"]);
    assert_eq!(private.collection_id(), "postcards");
}

#[test_log::test]
fn summaries_use_registered_behaviors() {
    let collection = collection();
    let registry = FieldRegistry::default();
    let item = item();
    assert_eq!(
        collection.value_summary(&item, "CREATOR", &registry).unwrap().as_deref(),
        Some("Jane Doe")
    );
    assert_eq!(
        collection.value_summary(&item, "SUBJECT", &registry).unwrap().as_deref(),
        Some("Courthouses; Indiana")
    );

    let empty = FieldRegistry::new();
    assert!(matches!(
        collection.value_summary(&item, "TITLE", &empty),
        Err(CatalogError::UnknownImplementation { .. })
    ));
}

#[test_log::test]
fn collection_rules_apply_to_items() {
    let collection = collection();
    let mut item = item();
    let metadata = collection.metadata();
    assert!(metadata.is_published(&item));
    assert!(metadata.is_featured(&item));

    item.delete_field_value("SUBJECT");
    assert!(!metadata.is_published(&item));
    assert!(!metadata.is_featured(&item));
}

#[test]
fn missing_definitions_fail_to_resolve() {
    let data = CollectionConfigurationData::from_path(fixture("collection.xml")).unwrap();
    assert!(matches!(
        CollectionConfiguration::new(data, []),
        Err(CatalogError::UnknownDefinitions { id }) if id == "core"
    ));
}
