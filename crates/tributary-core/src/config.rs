use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TributaryError;

/// Top-level configuration loaded from `.tributary.toml`.
///
/// Resolution order: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use tributary_core::TributaryConfig;
///
/// let config = TributaryConfig::default();
/// assert_eq!(config.mining.max_files_per_commit, 64);
/// assert_eq!(config.projection.max_group_fanin, 256);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TributaryConfig {
    /// Data directory holding `lists/` and `stor/`. Defaults to
    /// `~/.tributary` when unset.
    pub data_dir: Option<PathBuf>,
    /// History-mining settings.
    #[serde(default)]
    pub mining: MiningConfig,
    /// Duality-projection settings.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

impl TributaryConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Io`] if the file cannot be read, or
    /// [`TributaryError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, TributaryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use tributary_core::TributaryConfig;
    ///
    /// let toml = r#"
    /// [projection]
    /// decay = "exponential"
    /// half_life_days = 90.0
    /// "#;
    /// let config = TributaryConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.projection.decay, "exponential");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TributaryError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// History-mining settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Skip commits touching more files than this. Mass renames and
    /// vendored-code imports say nothing about collaboration.
    #[serde(default = "default_max_files")]
    pub max_files_per_commit: usize,
}

fn default_max_files() -> usize {
    64
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_files_per_commit: default_max_files(),
        }
    }
}

/// Duality-projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Decay strategy: `"constant"`, `"exponential"`, or `"inverse"`.
    #[serde(default = "default_decay")]
    pub decay: String,
    /// Half-life in days for the exponential strategy.
    #[serde(default = "default_half_life")]
    pub half_life_days: f64,
    /// Per-file cap on the number of authors considered when pairing.
    /// Bounds the quadratic per-group cost on degenerate files.
    #[serde(default = "default_fanin")]
    pub max_group_fanin: usize,
}

fn default_decay() -> String {
    "constant".into()
}

fn default_half_life() -> f64 {
    180.0
}

fn default_fanin() -> usize {
    256
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            decay: default_decay(),
            half_life_days: default_half_life(),
            max_group_fanin: default_fanin(),
        }
    }
}
