//! Configuration model describing named assets, filters and theme asset groups.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AssetError, AssetResult};

const DEFAULT_CONFIG_FILE: &str = "theme.config.json";

/// Root configuration consumed by [`crate::AssetResolver`].
///
/// Group definitions are keyed by theme name so a single file can describe
/// every theme the application ships with; only the active theme's groups are
/// ever resolved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeAssetConfig {
    /// Registered asset names mapped to one or more raw references.
    pub assets: BTreeMap<String, AssetRefs>,
    /// Registered filter names mapped to built-in filter type names.
    ///
    /// Factory- and instance-valued filter specs cannot be represented in a
    /// config file; they are supplied programmatically through
    /// [`crate::FilterSpec`].
    pub filters: BTreeMap<String, String>,
    /// Group definitions per theme.
    pub themes: BTreeMap<String, ThemeGroups>,
    /// Process-wide default for appending a content-hash query string to URLs.
    pub md5: bool,
    /// Reserved flag carried from the original configuration surface; accepted
    /// but not consulted during URL generation.
    pub secure: bool,
}

/// One or many raw asset reference strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssetRefs {
    /// A single reference.
    One(String),
    /// An ordered list of references.
    Many(Vec<String>),
}

impl AssetRefs {
    /// Iterate the raw references in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let refs: Vec<&str> = match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        };
        refs.into_iter()
    }
}

/// Groups declared for a single theme.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeGroups {
    /// Named asset groups for the theme.
    pub groups: BTreeMap<String, GroupConfig>,
}

/// A single asset group: ordered assets, ordered filters, optional output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Ordered asset references (registered names or raw paths/globs/URLs).
    pub assets: Vec<String>,
    /// Ordered registered filter names applied while merging.
    pub filters: Vec<String>,
    /// Relative output path for the merged artifact. When absent the group is
    /// resolved in memory only and nothing is written or cached on disk.
    pub output: Option<String>,
}

impl ThemeAssetConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// When the configuration file does not exist we fall back to an empty
    /// configuration so callers can continue and fail later with precise
    /// per-group errors.
    pub fn discover(config_dir: &Path) -> AssetResult<Self> {
        let candidate = config_dir.join(DEFAULT_CONFIG_FILE);
        if !candidate.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&candidate)
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> AssetResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| AssetError::io(path, err))?;
        serde_json::from_str(&content).map_err(|err| AssetError::Configuration {
            key: format!("{}: {err}", path.display()),
        })
    }

    /// Look up a group definition for a theme.
    pub fn group(&self, theme: &str, name: &str) -> Option<&GroupConfig> {
        self.themes.get(theme)?.groups.get(name)
    }

    /// Look up a group definition, failing with [`AssetError::Configuration`]
    /// naming the full dotted key when the group is absent.
    pub fn require_group(&self, theme: &str, name: &str) -> AssetResult<&GroupConfig> {
        self.group(theme, name)
            .ok_or_else(|| AssetError::Configuration {
                key: format!("themes.{theme}.groups.{name}"),
            })
    }

    /// Names of all groups declared for a theme, in sorted order.
    pub fn group_names(&self, theme: &str) -> Vec<&str> {
        self.themes
            .get(theme)
            .map(|groups| groups.groups.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
