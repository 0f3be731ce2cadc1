//! Layered settings for the `catalog` binary.
//!
//! Sources are merged in precedence order, later ones winning:
//!
//! 1. built-in defaults
//! 2. `catalog.toml`, then `catalog.yaml`, in the working directory
//! 3. an explicit `--config` file (format picked by extension)
//! 4. `CATALOG_`-prefixed environment variables

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix for environment overrides, e.g. `CATALOG_FORMAT=yaml`.
pub const ENV_PREFIX: &str = "CATALOG_";

const DISCOVERED_FILES: [&str; 2] = ["catalog.toml", "catalog.yaml"];

/// How command results are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Definitions documents loaded for every command that merges a collection.
    pub definitions: Vec<PathBuf>,
    pub format: OutputFormat,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            definitions: Vec::new(),
            format: OutputFormat::Json,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings as seen from `working_dir`.
    pub fn load(working_dir: &Path, config: Option<&Path>) -> Result<Self, figment::Error> {
        let settings: Settings = Self::figment(working_dir, config).extract()?;
        debug!(
            definitions = settings.definitions.len(),
            format = ?settings.format,
            "settings loaded"
        );
        Ok(settings)
    }

    fn figment(working_dir: &Path, config: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        for name in DISCOVERED_FILES {
            let path = working_dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "using discovered settings file");
                figment = figment.merge(file_provider(&path));
            }
        }
        if let Some(path) = config {
            figment = figment.merge(file_provider(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }
}

fn file_provider(path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Figment::from(Yaml::file(path)),
        Some("json") => Figment::from(Json::file(path)),
        _ => Figment::from(Toml::file(path)),
    }
}
