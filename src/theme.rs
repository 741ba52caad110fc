//! Active-theme resolution: where theme sources live and where outputs are served.

use std::path::{Path, PathBuf};

/// Supplies the active theme name and the path conventions around it.
///
/// The resolver never hard-codes directory layout; everything it reads comes
/// from `theme_root_path` and everything it writes or links goes through
/// `public_asset_root_path` relative to `public_dir`.
pub trait ThemeContext: Send + Sync {
    /// Name of the currently active theme.
    fn current_theme_name(&self) -> &str;

    /// Absolute path of a file inside the active theme's source tree.
    fn theme_root_path(&self, relative: &str) -> PathBuf;

    /// Public-relative asset path (forward slashes, no leading slash) for the
    /// active theme. This is the string that appears in generated URLs.
    fn public_asset_root_path(&self, relative: &str) -> String;

    /// Directory served as the web root; output files are written beneath it.
    fn public_dir(&self) -> &Path;
}

/// Conventional on-disk theme layout: `<themes_dir>/<name>/` holds sources and
/// outputs are published under `<public_dir>/themes/<name>/assets/`.
#[derive(Debug, Clone)]
pub struct ThemeLayout {
    name: String,
    themes_dir: PathBuf,
    public_dir: PathBuf,
}

impl ThemeLayout {
    /// Create a layout for the given theme name and base directories.
    pub fn new(
        name: impl Into<String>,
        themes_dir: impl Into<PathBuf>,
        public_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            themes_dir: themes_dir.into(),
            public_dir: public_dir.into(),
        }
    }
}

impl ThemeContext for ThemeLayout {
    fn current_theme_name(&self) -> &str {
        &self.name
    }

    fn theme_root_path(&self, relative: &str) -> PathBuf {
        self
            .themes_dir
            .join(&self.name)
            .join(relative.trim_start_matches('/'))
    }

    fn public_asset_root_path(&self, relative: &str) -> String {
        format!(
            "themes/{}/assets/{}",
            self.name,
            relative.trim_start_matches('/')
        )
    }

    fn public_dir(&self) -> &Path {
        &self.public_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ThemeLayout {
        ThemeLayout::new("default", "/srv/themes", "/srv/public")
    }

    #[test]
    fn theme_root_joins_under_active_theme() {
        let layout = layout();
        assert_eq!(
            layout.theme_root_path("css/app.css"),
            PathBuf::from("/srv/themes/default/css/app.css")
        );
    }

    #[test]
    fn public_asset_path_is_url_shaped() {
        let layout = layout();
        assert_eq!(
            layout.public_asset_root_path("css/all.css"),
            "themes/default/assets/css/all.css"
        );
        assert_eq!(
            layout.public_asset_root_path("/css/all.css"),
            "themes/default/assets/css/all.css"
        );
    }
}
