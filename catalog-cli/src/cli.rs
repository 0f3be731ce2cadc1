//! Command-line definition for the `catalog` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::settings::OutputFormat;

/// Document types that can be written back out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    /// A collection configuration (`u:configuration`)
    Collection,
    /// An item metadata record (`m:itemMetadata`)
    Item,
}

/// Inspect and check digital library catalog configuration documents.
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(version)]
#[command(about = "Inspect and check catalog configuration documents")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Settings file to merge over catalog.toml / catalog.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Definitions document, in addition to those from settings (repeatable)
    #[arg(short = 'D', long = "definitions", global = true)]
    pub definitions: Vec<PathBuf>,

    /// Output format, overriding settings
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a definitions document
    Definitions {
        file: PathBuf,
    },
    /// List a collection's merged field configurations
    Collection {
        file: PathBuf,
        /// Only fields shown publicly, in public order
        #[arg(long)]
        public: bool,
    },
    /// Parse, write and re-parse a document, checking nothing was lost
    Roundtrip {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = DocumentKind::Collection)]
        kind: DocumentKind,
    },
    /// Split an item into its public and private fields
    Split {
        item: PathBuf,
        #[arg(long)]
        collection: PathBuf,
    },
    /// Summarize one field of an item
    Summary {
        item: PathBuf,
        #[arg(long)]
        collection: PathBuf,
        /// Field type to summarize
        #[arg(long)]
        field: String,
    },
    /// Evaluate a collection's publish, featured and blocked-view rules for an item
    Matches {
        item: PathBuf,
        #[arg(long)]
        collection: PathBuf,
    },
}
