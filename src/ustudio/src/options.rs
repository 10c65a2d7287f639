//! Decoder configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tunables shared by container loading and object decoding
///
/// Read from TOML; missing keys take their defaults and unknown keys are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Container entry whose format-6 files keep their own version string
    pub main_data_name: String,
    /// Resolve shared-file references against sibling files after loading
    pub resolve_shared_files: bool,
    /// Largest element count accepted for a single array
    pub max_array_len: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            main_data_name: "mainData".to_string(),
            resolve_shared_files: true,
            max_array_len: 16_777_216,
        }
    }
}

impl Options {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
