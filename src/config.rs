//! Index options, loadable from TOML.
//!
//! ```toml
//! storage_directory = "/var/lib/penumbra"
//! sync_on_commit = true
//! default_batch_size = 256
//!
//! [text]
//! k1 = 1.2
//! b = 0.75
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of results fetched per batch by convenience drains.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Options shared by every index opened with them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Directory holding `<index name>.pidx` snapshots. `None` keeps data in memory only.
    pub storage_directory: Option<PathBuf>,
    /// Fsync snapshots when committing.
    pub sync_on_commit: bool,
    /// Batch size used when draining result cursors.
    pub default_batch_size: usize,
    /// Full-text scoring parameters.
    pub text: TextOptions,
}

/// BM25 parameters for text indexes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Term frequency saturation.
    pub k1: f32,
    /// Length normalization, between 0 and 1.
    pub b: f32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            storage_directory: None,
            sync_on_commit: true,
            default_batch_size: DEFAULT_BATCH_SIZE,
            text: TextOptions::default(),
        }
    }
}

impl IndexOptions {
    /// Options persisting snapshots under `dir`.
    pub fn with_storage_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_directory = Some(dir.into());
        self
    }

    /// Enables or disables fsync on commit.
    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Sets the drain batch size.
    pub fn with_default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size;
        self
    }

    /// Sets the BM25 parameters.
    pub fn with_bm25(mut self, k1: f32, b: f32) -> Self {
        self.text = TextOptions { k1, b };
        self
    }

    /// Parses options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: None,
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes the options as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_batch_size",
                reason: "must be greater than zero".into(),
            });
        }
        if !(self.text.k1.is_finite() && self.text.k1 >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "text.k1",
                reason: format!("{} is not a non-negative number", self.text.k1),
            });
        }
        if !(0.0..=1.0).contains(&self.text.b) {
            return Err(ConfigError::Invalid {
                field: "text.b",
                reason: format!("{} is outside 0..=1", self.text.b),
            });
        }
        Ok(())
    }
}

/// Failures loading [`IndexOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read index config {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The TOML was malformed.
    #[error("failed to parse index config{}: {source}", display_path(.path))]
    Parse {
        /// Source file, absent for in-memory text.
        path: Option<PathBuf>,
        /// Parser error.
        source: toml::de::Error,
    },
    /// Options could not be rendered as TOML.
    #[error("failed to serialize index config: {source}")]
    Serialize {
        /// Serializer error.
        source: toml::ser::Error,
    },
    /// A value is out of range.
    #[error("invalid index config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
