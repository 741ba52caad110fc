//! Asset group resolution: staleness checks, merged output writing and URLs.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::asset::{self, AssetHandle};
use crate::config::ThemeAssetConfig;
use crate::error::{AssetError, AssetResult};
use crate::filter::{AssetFilter, FilterSpec};
use crate::registry::{AssetRegistry, FilterRegistry};
use crate::theme::ThemeContext;

/// Options recognised by [`AssetResolver::url_for`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlOptions {
    /// Override the process-wide cache-busting default for this URL.
    pub md5: Option<bool>,
    /// Accepted for compatibility with the original configuration surface;
    /// currently has no effect on the generated URL.
    pub secure: Option<bool>,
}

/// Where a group's merged output lives.
#[derive(Debug, Clone)]
pub struct GroupTarget {
    /// Public-relative target path used in URLs (forward slashes).
    pub url_path: String,
    /// Absolute path the merged file is written to.
    pub file_path: PathBuf,
}

/// A fully resolved asset group.
#[derive(Clone)]
pub struct ResolvedGroup {
    /// Group name as declared in configuration.
    pub name: String,
    /// Ordered input assets.
    pub inputs: Vec<AssetHandle>,
    /// Ordered filters applied to each input while merging.
    pub filters: Vec<Arc<dyn AssetFilter>>,
    /// Output target; absent when the group declares no `output`, in which case
    /// nothing is ever written.
    pub target: Option<GroupTarget>,
}

impl std::fmt::Debug for ResolvedGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedGroup")
            .field("name", &self.name)
            .field("inputs", &self.inputs.len())
            .field("filters", &self.filters.len())
            .field("target", &self.target)
            .finish()
    }
}

impl ResolvedGroup {
    /// Merge every input through the filter chain, in declared order.
    ///
    /// Each asset is filtered individually and the filtered pieces are joined
    /// with a newline, so both asset order and filter order are load-bearing.
    pub fn merge(&self) -> AssetResult<String> {
        let mut parts = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let mut content = input.content()?;
            for filter in &self.filters {
                content = filter.apply(&content);
            }
            parts.push(content);
        }
        Ok(parts.join("\n"))
    }
}

/// Resolves named asset groups for the active theme.
///
/// Owns the asset and filter registries (built once at construction) and a
/// per-name cache of resolved groups. The cache is never invalidated; an
/// explicit overwrite request is the only way to rebuild a group within one
/// process run.
pub struct AssetResolver {
    config: ThemeAssetConfig,
    theme: Box<dyn ThemeContext>,
    assets: AssetRegistry,
    filters: FilterRegistry,
    groups: Mutex<BTreeMap<String, Arc<ResolvedGroup>>>,
    md5_default: bool,
}

impl AssetResolver {
    /// Build a resolver whose filters all come from configuration type names.
    pub fn new(config: ThemeAssetConfig, theme: Box<dyn ThemeContext>) -> AssetResult<Self> {
        let filters = FilterRegistry::from_config(&config)?;
        Ok(Self::with_registries(config, theme, filters))
    }

    /// Build a resolver with additional programmatic filter specs layered over
    /// the configuration's type names.
    pub fn with_filter_specs(
        config: ThemeAssetConfig,
        theme: Box<dyn ThemeContext>,
        specs: impl IntoIterator<Item = (String, FilterSpec)>,
    ) -> AssetResult<Self> {
        let mut filters = FilterRegistry::from_config(&config)?;
        for (name, spec) in specs {
            let filter = spec.resolve(&name)?;
            filters.insert(name, filter);
        }
        Ok(Self::with_registries(config, theme, filters))
    }

    fn with_registries(
        config: ThemeAssetConfig,
        theme: Box<dyn ThemeContext>,
        filters: FilterRegistry,
    ) -> Self {
        let assets = AssetRegistry::from_config(&config, theme.as_ref());
        let md5_default = config.md5;
        Self {
            config,
            theme,
            assets,
            filters,
            groups: Mutex::new(BTreeMap::new()),
            md5_default,
        }
    }

    /// Resolve a group by name, writing its merged output when stale.
    ///
    /// With `overwrite` false a previously resolved group is returned from the
    /// cache untouched; with `overwrite` true the group is rebuilt and its
    /// output rewritten unconditionally. The cache lock is held for the whole
    /// build, so concurrent first resolutions of one name produce exactly one
    /// filesystem write.
    pub fn resolve_group(&self, name: &str, overwrite: bool) -> AssetResult<Arc<ResolvedGroup>> {
        let mut groups = match self.groups.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !overwrite
            && let Some(group) = groups.get(name)
        {
            debug!(group = name, "returning cached asset group");
            return Ok(group.clone());
        }

        let group = Arc::new(self.build_group(name, overwrite)?);
        groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    /// Generate the public URL for a group, optionally cache-busted.
    ///
    /// The cache-bust hash is taken from the content of the *first* declared
    /// input asset, not the merged output. Changes confined to later inputs or
    /// to the filter chain therefore do not rotate the URL; this mirrors the
    /// original behaviour and is documented as a known limitation.
    pub fn url_for(&self, name: &str, options: UrlOptions) -> AssetResult<String> {
        let group = self.resolve_group(name, false)?;
        let target = require_target(&group)?;

        let mut cache_buster = String::new();
        if options.md5.unwrap_or(self.md5_default)
            && let Some(first) = group.inputs.first()
        {
            cache_buster = format!("?{}", first.content_hash()?);
        }

        Ok(format!("/{}{}", target.url_path, cache_buster))
    }

    /// The public-relative output path for a group, with no cache-busting.
    pub fn file_path_for(&self, name: &str) -> AssetResult<String> {
        let group = self.resolve_group(name, false)?;
        Ok(require_target(&group)?.url_path.clone())
    }

    /// Public URL of an image under the theme's `img/` asset directory.
    pub fn image_path(&self, file: &str) -> String {
        format!("/{}", self.theme.public_asset_root_path(&format!("img/{file}")))
    }

    /// Public URL of a document under the theme's `pdf/` asset directory.
    pub fn document_path(&self, file: &str) -> String {
        format!("/{}", self.theme.public_asset_root_path(&format!("pdf/{file}")))
    }

    fn build_group(&self, name: &str, overwrite: bool) -> AssetResult<ResolvedGroup> {
        let theme_name = self.theme.current_theme_name();
        let group_config = self.config.require_group(theme_name, name)?;

        let inputs = self.build_asset_list(&group_config.assets)?;
        let filters = self.build_filter_list(&group_config.filters)?;
        let target = group_config.output.as_ref().map(|output| {
            let url_path = self.theme.public_asset_root_path(output);
            let file_path = self.theme.public_dir().join(&url_path);
            GroupTarget {
                url_path,
                file_path,
            }
        });

        let group = ResolvedGroup {
            name: name.to_string(),
            inputs,
            filters,
            target,
        };

        if let Some(target) = &group.target {
            if overwrite || self.needs_write(target, &group.inputs)? {
                self.write_output(&group, target)?;
            } else {
                debug!(group = name, "output is current, skipping write");
            }
        }

        Ok(group)
    }

    fn build_asset_list(&self, references: &[String]) -> AssetResult<Vec<AssetHandle>> {
        let mut handles = Vec::new();
        for reference in references {
            if let Some(registered) = self.assets.get(reference) {
                handles.extend_from_slice(registered);
            } else if asset::is_path_like(reference) {
                handles.push(asset::build_asset(reference, self.theme.as_ref()));
            } else {
                return Err(AssetError::UnknownAsset {
                    name: reference.clone(),
                });
            }
        }
        Ok(handles)
    }

    fn build_filter_list(&self, names: &[String]) -> AssetResult<Vec<Arc<dyn AssetFilter>>> {
        names
            .iter()
            .map(|name| {
                self.filters
                    .get(name)
                    .ok_or_else(|| AssetError::UnknownFilterSpec { name: name.clone() })
            })
            .collect()
    }

    /// Compare the output's mtime with the newest known input mtime.
    ///
    /// A missing output always needs a write. When no input can report an mtime
    /// (remote assets, empty glob sets) the output is treated as stale.
    fn needs_write(&self, target: &GroupTarget, inputs: &[AssetHandle]) -> AssetResult<bool> {
        let Ok(metadata) = fs::metadata(&target.file_path) else {
            return Ok(true);
        };
        let output_mtime = metadata
            .modified()
            .map_err(|err| AssetError::io(&target.file_path, err))?;

        let mut newest_input: Option<SystemTime> = None;
        for input in inputs {
            if let Some(modified) = input.last_modified()?
                && newest_input.is_none_or(|current| modified > current)
            {
                newest_input = Some(modified);
            }
        }

        Ok(match newest_input {
            Some(input_mtime) => output_mtime < input_mtime,
            None => true,
        })
    }

    /// Write the merged output atomically: temp sibling first, then rename.
    fn write_output(&self, group: &ResolvedGroup, target: &GroupTarget) -> AssetResult<()> {
        let merged = group.merge()?;

        if let Some(parent) = target.file_path.parent() {
            fs::create_dir_all(parent).map_err(|err| AssetError::io(parent, err))?;
        }

        let file_name = target
            .file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = target.file_path.with_file_name(format!("{file_name}.tmp"));

        fs::write(&temp_path, merged).map_err(|err| AssetError::io(&temp_path, err))?;
        fs::rename(&temp_path, &target.file_path)
            .map_err(|err| AssetError::io(&target.file_path, err))?;

        info!(
            group = %group.name,
            output = %target.file_path.display(),
            "wrote merged asset group"
        );
        Ok(())
    }
}

impl std::fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetResolver")
            .field("theme", &self.theme.current_theme_name())
            .field("assets", &self.assets)
            .field("filters", &self.filters)
            .finish()
    }
}

fn require_target(group: &ResolvedGroup) -> AssetResult<&GroupTarget> {
    group.target.as_ref().ok_or_else(|| AssetError::Configuration {
        key: format!("groups.{}.output", group.name),
    })
}
