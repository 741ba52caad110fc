//! One-time construction of the asset and filter registries.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::asset::{self, AssetHandle};
use crate::config::ThemeAssetConfig;
use crate::error::AssetResult;
use crate::filter::{AssetFilter, FilterSpec};
use crate::theme::ThemeContext;

/// Named assets registered up front from configuration.
///
/// A registered name may expand to several handles when the configuration
/// lists multiple references under one name. Built once at resolver
/// construction and immutable afterwards.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    entries: BTreeMap<String, Vec<AssetHandle>>,
}

impl AssetRegistry {
    /// Build the registry from the `assets` configuration mapping.
    ///
    /// References are classified eagerly; existence of the underlying files is
    /// only checked when content or modification times are read.
    pub fn from_config(config: &ThemeAssetConfig, theme: &dyn ThemeContext) -> Self {
        let mut entries = BTreeMap::new();
        for (name, refs) in &config.assets {
            let handles: Vec<AssetHandle> = refs
                .iter()
                .map(|reference| asset::build_asset(reference, theme))
                .collect();
            if !handles.is_empty() {
                entries.insert(name.clone(), handles);
            }
        }
        Self { entries }
    }

    /// Handles registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&[AssetHandle]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Whether `name` is a registered asset.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Named filter instances resolved eagerly from filter specs.
#[derive(Default)]
pub struct FilterRegistry {
    entries: BTreeMap<String, Arc<dyn AssetFilter>>,
}

impl FilterRegistry {
    /// Build the registry from the `filters` configuration mapping, whose
    /// string values are built-in filter type names.
    pub fn from_config(config: &ThemeAssetConfig) -> AssetResult<Self> {
        let specs = config
            .filters
            .iter()
            .map(|(name, type_name)| (name.clone(), FilterSpec::TypeName(type_name.clone())));
        Self::from_specs(specs)
    }

    /// Build the registry from explicit filter specs.
    ///
    /// Every spec is resolved now; the first unresolvable spec aborts
    /// construction with [`crate::AssetError::UnknownFilterSpec`].
    pub fn from_specs(
        specs: impl IntoIterator<Item = (String, FilterSpec)>,
    ) -> AssetResult<Self> {
        let mut entries = BTreeMap::new();
        for (name, spec) in specs {
            let filter = spec.resolve(&name)?;
            entries.insert(name, filter);
        }
        Ok(Self { entries })
    }

    /// Register an additional filter instance under `name`.
    pub fn insert(&mut self, name: impl Into<String>, filter: Arc<dyn AssetFilter>) {
        self.entries.insert(name.into(), filter);
    }

    /// The filter registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AssetFilter>> {
        self.entries.get(name).cloned()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use crate::theme::ThemeLayout;

    fn config(json: &str) -> ThemeAssetConfig {
        serde_json::from_str(json).expect("invalid test config")
    }

    #[test]
    fn asset_registry_expands_multi_reference_names() {
        let config = config(
            r#"{"assets": {
                "vendor": ["js/a.js", "js/b.js"],
                "jquery": "js/jquery.js"
            }}"#,
        );
        let layout = ThemeLayout::new("default", "themes", "public");

        let registry = AssetRegistry::from_config(&config, &layout);
        assert!(registry.contains("vendor"));
        assert_eq!(registry.get("vendor").unwrap().len(), 2);
        assert_eq!(registry.get("jquery").unwrap().len(), 1);
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn filter_registry_resolves_builtin_type_names() {
        let config = config(r#"{"filters": {"cssmin": "CssMinFilter", "jsmin": "JsMinFilter"}}"#);

        let registry = FilterRegistry::from_config(&config).unwrap();
        assert!(registry.get("cssmin").is_some());
        assert!(registry.get("jsmin").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn filter_registry_rejects_unknown_type_names_eagerly() {
        let config = config(r#"{"filters": {"broken": "NoSuchFilter"}}"#);

        let err = FilterRegistry::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            AssetError::UnknownFilterSpec { name } if name == "broken"
        ));
    }
}
