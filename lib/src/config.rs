use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, Chainable};
use crate::value::{Dict, Format, Toml};

/// The file, at the root of a content directory, that [`Config::discover()`]
/// reads.
pub const CONFIG_FILE: &str = "quire.toml";

/// Contextual configuration shared by every stage of processing and handed
/// to each [`Parser`](crate::content::Parser).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The entry document of every directory a document graph addresses.
    pub root_document: Arc<str>,
    /// Extensions removed from item names after parsing.
    pub strip_extensions: Vec<Arc<str>>,
    pub converter: Converter,
    /// Values substituted by the `vars` text processor.
    pub vars: Dict,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Converter {
    pub program: Arc<str>,
    pub args: Vec<String>,
}

impl Config {
    /// Reads [`CONFIG_FILE`] from `dir` if it exists, otherwise returns the
    /// default configuration.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Config::default());
        }

        tracing::debug!(path = %path.display(), "reading configuration");
        Toml::read(path.as_path()).chain_with(|| error! {
            "failed to parse configuration",
            "config file" => path.display(),
        })
    }

    /// Whether `ext` is one of [`Config::strip_extensions`], ignoring case.
    pub fn strips(&self, ext: &str) -> bool {
        self.strip_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_document: "main.md".into(),
            strip_extensions: ["md", "markdown", "html", "yaml", "yml", "json"]
                .into_iter()
                .map(Arc::from)
                .collect(),
            converter: Converter::default(),
            vars: Dict::new(),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter { program: "pandoc".into(), args: vec![] }
    }
}
