//! Subcommand implementations.
//!
//! Each command loads the documents it needs and returns a serializable report;
//! [`render`] turns the report into the configured output format.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use catalog_config::{
    CollectionConfiguration, CollectionConfigurationData, CollectionKind, Definitions,
    FieldConfiguration, FieldRegistry, ItemMetadata,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cli::{Commands, DocumentKind};
use crate::settings::OutputFormat;

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub definitions: Vec<PathBuf>,
    pub format: OutputFormat,
}

impl CommandContext {
    fn load_definitions(&self) -> Result<Vec<Arc<Definitions>>> {
        if self.definitions.is_empty() {
            warn!("no definitions documents configured");
        }
        self.definitions
            .iter()
            .map(|path| {
                Definitions::from_path(path)
                    .map(Arc::new)
                    .with_context(|| format!("loading definitions {}", path.display()))
            })
            .collect()
    }

    fn load_collection(&self, path: &Path) -> Result<CollectionConfiguration> {
        let data = CollectionConfigurationData::from_path(path)
            .with_context(|| format!("loading collection {}", path.display()))?;
        CollectionConfiguration::new(data, self.load_definitions()?)
            .with_context(|| format!("resolving collection {}", path.display()))
    }
}

fn load_item(path: &Path) -> Result<ItemMetadata> {
    ItemMetadata::from_path(path).with_context(|| format!("loading item {}", path.display()))
}

/// Run `command` and return the rendered report.
pub fn run(command: Commands, ctx: &CommandContext) -> Result<String> {
    match command {
        Commands::Definitions { file } => render(&definitions(&file)?, ctx.format),
        Commands::Collection { file, public } => {
            let collection = ctx.load_collection(&file)?;
            render(&CollectionListing::new(&collection, public), ctx.format)
        }
        Commands::Roundtrip { file, kind } => render(&roundtrip(&file, kind)?, ctx.format),
        Commands::Split { item, collection } => {
            let collection = ctx.load_collection(&collection)?;
            render(&split(&collection, &load_item(&item)?), ctx.format)
        }
        Commands::Summary {
            item,
            collection,
            field,
        } => {
            let collection = ctx.load_collection(&collection)?;
            let item = load_item(&item)?;
            let summary = collection.value_summary(&item, &field, &FieldRegistry::default())?;
            render(
                &SummaryReport {
                    item: item.id(),
                    field: &field,
                    summary,
                },
                ctx.format,
            )
        }
        Commands::Matches { item, collection } => {
            let collection = ctx.load_collection(&collection)?;
            render(&matches(&collection, &load_item(&item)?), ctx.format)
        }
    }
}

pub fn render<T: Serialize>(report: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(report)?,
    })
}

#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub field_type: String,
    pub binding: String,
    pub parts: Vec<String>,
    pub attributes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DefinitionsSummary {
    pub id: String,
    pub fields: Vec<FieldSummary>,
    pub sources: Vec<String>,
}

pub fn definitions(path: &Path) -> Result<DefinitionsSummary> {
    let defs = Definitions::from_path(path)
        .with_context(|| format!("loading definitions {}", path.display()))?;
    let fields = defs
        .field_definitions()
        .map(|def| {
            let spec = def.data_specification();
            FieldSummary {
                field_type: def.field_type().to_string(),
                binding: def.implementation().binding.clone(),
                parts: spec.valid_part_names().map(str::to_string).collect(),
                attributes: spec.valid_attribute_names().map(str::to_string).collect(),
            }
        })
        .collect();
    Ok(DefinitionsSummary {
        id: defs.id().to_string(),
        fields,
        sources: defs.source_types().map(str::to_string).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct CollectionListing<'a> {
    pub id: &'a str,
    pub kind: CollectionKind,
    pub full_name: &'a str,
    pub fields: Vec<&'a FieldConfiguration>,
}

impl<'a> CollectionListing<'a> {
    pub fn new(collection: &'a CollectionConfiguration, public: bool) -> Self {
        let metadata = collection.metadata();
        Self {
            id: &metadata.id,
            kind: metadata.kind,
            full_name: &metadata.full_name,
            fields: collection.list_field_configurations(!public),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoundtripReport {
    pub file: PathBuf,
    pub kind: String,
    pub identical: bool,
}

/// Parse, serialize and re-parse a document. A lossy round trip is an error.
pub fn roundtrip(path: &Path, kind: DocumentKind) -> Result<RoundtripReport> {
    let identical = match kind {
        DocumentKind::Collection => {
            let data = CollectionConfigurationData::from_path(path)?;
            let written = data.to_xml_string()?;
            data.content_eq(&CollectionConfigurationData::from_xml(&written)?)
        }
        DocumentKind::Item => {
            let item = ItemMetadata::from_path(path)?;
            let written = item.to_xml_string()?;
            item == ItemMetadata::from_xml(&written)?
        }
    };
    debug!(file = %path.display(), identical, "round trip compared");
    if !identical {
        bail!("{} did not survive a round trip", path.display());
    }
    Ok(RoundtripReport {
        file: path.to_path_buf(),
        kind: format!("{kind:?}").to_lowercase(),
        identical,
    })
}

#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub public: ItemMetadata,
    pub private: ItemMetadata,
}

pub fn split(collection: &CollectionConfiguration, item: &ItemMetadata) -> SplitReport {
    SplitReport {
        public: collection.public_item_metadata(item),
        private: collection.private_item_metadata(item),
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryReport<'a> {
    pub item: &'a str,
    pub field: &'a str,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub item: String,
    pub published: bool,
    pub featured: bool,
    pub view_blocked: bool,
}

pub fn matches(collection: &CollectionConfiguration, item: &ItemMetadata) -> MatchReport {
    let metadata = collection.metadata();
    MatchReport {
        item: item.id().to_string(),
        published: metadata.is_published(item),
        featured: metadata.is_featured(item),
        view_blocked: metadata.is_view_blocked(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DEFINITIONS: &str = include_str!("../../catalog-config/tests/fixtures/definitions.xml");
    const COLLECTION: &str = include_str!("../../catalog-config/tests/fixtures/collection.xml");
    const ITEM: &str = include_str!("../../catalog-config/tests/fixtures/item.xml");

    struct Workspace {
        _dir: TempDir,
        definitions: PathBuf,
        collection: PathBuf,
        item: PathBuf,
    }

    fn workspace() -> Workspace {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, text: &str| {
            let path = dir.path().join(name);
            fs::write(&path, text).unwrap();
            path
        };
        Workspace {
            definitions: write("definitions.xml", DEFINITIONS),
            collection: write("collection.xml", COLLECTION),
            item: write("item.xml", ITEM),
            _dir: dir,
        }
    }

    fn context(ws: &Workspace) -> CommandContext {
        CommandContext {
            definitions: vec![ws.definitions.clone()],
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn definitions_are_summarized() {
        let ws = workspace();
        let summary = definitions(&ws.definitions).unwrap();
        assert_eq!(summary.id, "core");
        assert_eq!(summary.fields.len(), 4);
        assert_eq!(summary.fields[1].binding, "pattern");
        assert_eq!(summary.sources, vec!["authority"]);
    }

    #[test]
    fn public_listing_hides_private_fields() {
        let ws = workspace();
        let out = run(
            Commands::Collection {
                file: ws.collection.clone(),
                public: true,
            },
            &context(&ws),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        let types: Vec<&str> = json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["fieldType"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["TITLE", "SUBJECT", "CREATOR"]);
    }

    #[test]
    fn both_document_kinds_round_trip() {
        let ws = workspace();
        assert!(roundtrip(&ws.collection, DocumentKind::Collection).unwrap().identical);
        assert!(roundtrip(&ws.item, DocumentKind::Item).unwrap().identical);
    }

    #[test]
    fn wrong_kind_fails_to_round_trip() {
        let ws = workspace();
        assert!(roundtrip(&ws.item, DocumentKind::Collection).is_err());
    }

    #[test]
    fn summary_and_matches_report_in_yaml() {
        let ws = workspace();
        let ctx = CommandContext {
            format: OutputFormat::Yaml,
            ..context(&ws)
        };
        let out = run(
            Commands::Summary {
                item: ws.item.clone(),
                collection: ws.collection.clone(),
                field: "CREATOR".into(),
            },
            &ctx,
        )
        .unwrap();
        assert!(out.contains("summary: Jane Doe"));

        let collection = ctx.load_collection(&ws.collection).unwrap();
        let report = matches(&collection, &load_item(&ws.item).unwrap());
        assert!(report.published);
        assert!(report.featured);
        assert!(!report.view_blocked);
    }

    #[test]
    fn split_separates_private_notes() {
        let ws = workspace();
        let collection = context(&ws).load_collection(&ws.collection).unwrap();
        let report = split(&collection, &load_item(&ws.item).unwrap());
        assert!(report.public.field_data("NOTE").is_none());
        assert!(report.private.field_data("NOTE").is_some());
    }

    #[test]
    fn missing_definitions_are_reported() {
        let ws = workspace();
        let ctx = CommandContext {
            definitions: Vec::new(),
            format: OutputFormat::Json,
        };
        let err = ctx.load_collection(&ws.collection).unwrap_err();
        assert!(format!("{err:#}").contains("core"));
    }
}
