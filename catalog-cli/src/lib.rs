//! Command-line tools for catalog configuration documents.
//!
//! The `catalog` binary loads definitions, collection configurations and item
//! records through `catalog-config` and reports on them as JSON or YAML.

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands, DocumentKind};
pub use commands::{run, CommandContext};
pub use settings::{OutputFormat, Settings};
