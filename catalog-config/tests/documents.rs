//! Loading, validating and re-writing the three document types from disk.

use std::path::PathBuf;

use catalog_config::{
    CatalogError, CollectionConfigurationData, CollectionKind, Definitions, ErrorKind, Facet,
    FieldKey, ItemMetadata, SearchConstraint,
};
use rstest::rstest;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).unwrap()
}

#[test_log::test]
fn definitions_load_from_path() {
    let defs = Definitions::from_path(fixture("definitions.xml")).unwrap();
    assert_eq!(defs.id(), "core");
    assert_eq!(
        defs.field_types().collect::<Vec<_>>(),
        vec!["TITLE", "CREATOR", "SUBJECT", "NOTE"]
    );

    let creator = defs.field_definition("CREATOR").unwrap();
    assert_eq!(creator.implementation().binding, "pattern");
    assert_eq!(creator.implementation().property("pattern"), Some("{given} {family}"));
    assert_eq!(
        creator.data_specification().valid_part_names().collect::<Vec<_>>(),
        vec!["family", "given", "uri"]
    );
    assert_eq!(creator.default_configuration().starting_boxes, Some(2));
    assert_eq!(creator.default_configuration().definition_id, "core");

    let authority = defs.source_definition("authority").unwrap();
    assert_eq!(authority.implementation.property("endpoint"), Some("http://id.loc.gov/"));
    assert_eq!(authority.configuration_parameters[0].name, "scheme");
}

#[test_log::test]
fn collection_loads_every_section() {
    let data = CollectionConfigurationData::from_path(fixture("collection.xml")).unwrap();
    assert!(data.is_public());

    let metadata = data.metadata();
    assert_eq!(metadata.id, "postcards");
    assert_eq!(metadata.kind, CollectionKind::Collection);
    assert_eq!(metadata.homepage.as_ref().unwrap().url, "http://example.edu/postcards");
    assert_eq!(
        metadata.facets.iter().map(Facet::name).collect::<Vec<_>>(),
        vec!["Collection", "Subject", "Region"]
    );
    assert!(matches!(metadata.publish, SearchConstraint::Or { .. }));
    assert_eq!(
        metadata.record_creation.as_ref().unwrap().get("idPrefix").map(String::as_str),
        Some("pc-")
    );

    assert_eq!(data.field_configurations().len(), 4);
    assert_eq!(data.represented_definition_ids(), vec!["core"]);
    let subject = data
        .field_configuration(&FieldKey::new("core", "SUBJECT"))
        .unwrap();
    assert_eq!(subject.vocabulary_sources[0].authority_binding.as_deref(), Some("uri"));
    assert_eq!(
        data.default_value("SUBJECT").unwrap().part_values("term"),
        vec!["Indiana"]
    );
    assert_eq!(data.transformations()[0].format_name, "Dublin Core");
    assert!(data.transformations()[0].lossy);
}

#[test_log::test]
fn collection_round_trips() {
    let data = CollectionConfigurationData::from_xml(&read_fixture("collection.xml")).unwrap();
    let written = data.to_xml_string().unwrap();
    assert!(written.contains("collection.xsd"));
    let reread = CollectionConfigurationData::from_xml(&written).unwrap();
    assert!(data.content_eq(&reread));
    assert_eq!(reread.to_xml_string().unwrap(), written);
}

#[test_log::test]
fn item_round_trips() {
    let item = ItemMetadata::from_path(fixture("item.xml")).unwrap();
    assert_eq!(item.id(), "pc-0001");
    assert_eq!(item.field_data("CREATOR").unwrap().attribute("role"), Some("photographer"));

    let written = item.to_xml_string().unwrap();
    assert!(written.contains("field-metadata.xsd"));
    assert_eq!(ItemMetadata::from_xml(&written).unwrap(), item);
}

#[test_log::test]
fn written_item_goes_to_any_writer() {
    let item = ItemMetadata::from_path(fixture("item.xml")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.xml");
    item.write_to(std::fs::File::create(&path).unwrap()).unwrap();
    assert_eq!(ItemMetadata::from_path(&path).unwrap(), item);
}

#[rstest]
#[case::unknown_element("<u:fullName>", "<u:nickname>x</u:nickname><u:fullName>")]
#[case::bad_collection_type("<u:type>collection</u:type>", "<u:type>archive</u:type>")]
#[case::bad_fidelity("fidelity=\"lossy\"", "fidelity=\"sloppy\"")]
#[case::bad_sort_index("catalogingSortIndex=\"1\"", "catalogingSortIndex=\"first\"")]
#[case::missing_publish("<u:publish>", "<u:unpublished>")]
#[case::facet_value_leaf_and_children(
    "<u:fieldValue>Indiana</u:fieldValue>",
    "<u:fieldValue>Indiana</u:fieldValue><u:facetValue><u:name>South</u:name><u:fieldType>SUBJECT</u:fieldType><u:fieldPart>term</u:fieldPart><u:fieldValue>South</u:fieldValue></u:facetValue>"
)]
fn malformed_collections_are_format_errors(#[case] from: &str, #[case] to: &str) {
    let text = read_fixture("collection.xml").replacen(from, to, 1);
    let err = CollectionConfigurationData::from_xml(&text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format, "{err}");
}

#[test]
fn default_for_unconfigured_field_is_rejected() {
    let text = read_fixture("collection.xml").replace(
        "<m:field fieldType=\"SUBJECT\">",
        "<m:field fieldType=\"PLACE\">",
    );
    assert!(matches!(
        CollectionConfigurationData::from_xml(&text),
        Err(CatalogError::UndefinedDefaultValue { .. })
    ));
}

#[test]
fn duplicate_field_configuration_is_rejected() {
    let text = read_fixture("collection.xml").replace(
        "<u:field type=\"NOTE\" catalogingSortIndex=\"4\"/>",
        "<u:field type=\"NOTE\"/><u:field type=\"NOTE\"/>",
    );
    assert!(matches!(
        CollectionConfigurationData::from_xml(&text),
        Err(CatalogError::DuplicateFieldConfiguration { .. })
    ));
}

#[test]
fn definitions_without_id_are_rejected() {
    let text = read_fixture("definitions.xml").replace(" id=\"core\"", "");
    assert!(matches!(
        Definitions::from_xml(&text),
        Err(CatalogError::MissingAttribute { .. })
    ));
}

#[test]
fn unreadable_path_is_io_error() {
    let err = ItemMetadata::from_path(fixture("missing.xml")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn collection_serializes_for_tooling() {
    let data = CollectionConfigurationData::from_path(fixture("collection.xml")).unwrap();
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["metadata"]["kind"], "collection");
    assert!(json["defaultValues"].get("core/SUBJECT").is_some());
}
