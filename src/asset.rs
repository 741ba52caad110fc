//! Asset references: classification into handle variants and content access.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;

use crate::error::{AssetError, AssetResult};
use crate::theme::ThemeContext;

fn remote_scheme() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^https?://").expect("invalid http(s) regex"))
}

/// Kind of input an asset reference denotes.
///
/// Classification is purely lexical; no filesystem or network access happens
/// here. Existence is validated lazily when content or modification times are
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// A single file resolved relative to the active theme's root.
    LocalFile,
    /// A glob pattern expanded against the active theme's root.
    GlobSet,
    /// An absolute HTTP(S) URL fetched at merge time.
    RemoteHttp,
}

/// Classify a raw asset reference string.
///
/// URLs win over globs so a query string in a remote reference is never
/// mistaken for a single-character wildcard.
pub fn classify(reference: &str) -> AssetKind {
    if remote_scheme().is_match(reference) {
        AssetKind::RemoteHttp
    } else if reference.contains(['*', '?']) {
        AssetKind::GlobSet
    } else {
        AssetKind::LocalFile
    }
}

/// Returns `true` when a reference looks like a path, glob or URL rather than
/// a registered asset name.
pub fn is_path_like(reference: &str) -> bool {
    reference.contains(['/', '.', '-'])
}

/// A resolved input asset, ready to yield content and modification times.
#[derive(Debug, Clone)]
pub enum AssetHandle {
    /// A single local file.
    LocalFile(LocalFileAsset),
    /// A glob pattern over the theme source tree.
    GlobSet(GlobSetAsset),
    /// A remote HTTP(S) resource.
    RemoteHttp(RemoteHttpAsset),
}

/// Build an asset handle from a raw reference, resolving local references
/// against the active theme's root directory.
pub fn build_asset(reference: &str, theme: &dyn ThemeContext) -> AssetHandle {
    match classify(reference) {
        AssetKind::RemoteHttp => AssetHandle::RemoteHttp(RemoteHttpAsset {
            url: reference.to_string(),
        }),
        AssetKind::GlobSet => AssetHandle::GlobSet(GlobSetAsset {
            root: theme.theme_root_path(""),
            pattern: reference.trim_start_matches('/').to_string(),
        }),
        AssetKind::LocalFile => AssetHandle::LocalFile(LocalFileAsset {
            path: theme.theme_root_path(reference),
        }),
    }
}

impl AssetHandle {
    /// Read the full content of the asset.
    ///
    /// Glob sets concatenate every matching file in sorted path order, joined
    /// with a newline. Missing local files surface as [`AssetError::Io`].
    pub fn content(&self) -> AssetResult<String> {
        match self {
            Self::LocalFile(asset) => asset.content(),
            Self::GlobSet(asset) => asset.content(),
            Self::RemoteHttp(asset) => asset.content(),
        }
    }

    /// Last modification time, when one is knowable.
    ///
    /// Remote assets report `None`; an empty glob set reports `None`. A `None`
    /// here means the input cannot vouch for output freshness, so callers treat
    /// it as always-stale.
    pub fn last_modified(&self) -> AssetResult<Option<SystemTime>> {
        match self {
            Self::LocalFile(asset) => asset.last_modified().map(Some),
            Self::GlobSet(asset) => asset.last_modified(),
            Self::RemoteHttp(_) => Ok(None),
        }
    }

    /// Hex-encoded content hash of the asset, used for cache-busting URLs.
    pub fn content_hash(&self) -> AssetResult<String> {
        let content = self.content()?;
        Ok(hex::encode(blake3::hash(content.as_bytes()).as_bytes()))
    }
}

/// A single file inside the active theme.
#[derive(Debug, Clone)]
pub struct LocalFileAsset {
    /// Absolute path of the file.
    pub path: PathBuf,
}

impl LocalFileAsset {
    fn content(&self) -> AssetResult<String> {
        fs::read_to_string(&self.path).map_err(|err| AssetError::io(&self.path, err))
    }

    fn last_modified(&self) -> AssetResult<SystemTime> {
        let metadata = fs::metadata(&self.path).map_err(|err| AssetError::io(&self.path, err))?;
        metadata.modified().map_err(|err| AssetError::io(&self.path, err))
    }
}

/// A glob pattern expanded lazily against a root directory.
///
/// Patterns use `*` (any run of characters within one path segment) and `?`
/// (any single character); matching is performed against `/`-separated paths
/// relative to the root.
#[derive(Debug, Clone)]
pub struct GlobSetAsset {
    /// Directory the pattern is evaluated in.
    pub root: PathBuf,
    /// Raw glob pattern, relative to `root`.
    pub pattern: String,
}

impl GlobSetAsset {
    /// Expand the pattern into sorted absolute paths of matching files.
    ///
    /// A missing root yields an empty set; expansion happens on every call so a
    /// long-lived handle observes files added after construction.
    pub fn expand(&self) -> AssetResult<Vec<PathBuf>> {
        let pattern = glob_regex(&self.pattern);
        let mut matches = BTreeSet::new();
        collect_matches(&self.root, Path::new(""), &pattern, &mut matches)
            .map_err(|err| AssetError::io(&self.root, err))?;
        Ok(matches.into_iter().collect())
    }

    fn content(&self) -> AssetResult<String> {
        let mut parts = Vec::new();
        for path in self.expand()? {
            let part = fs::read_to_string(&path).map_err(|err| AssetError::io(&path, err))?;
            parts.push(part);
        }
        Ok(parts.join("\n"))
    }

    fn last_modified(&self) -> AssetResult<Option<SystemTime>> {
        let mut newest = None;
        for path in self.expand()? {
            let metadata = fs::metadata(&path).map_err(|err| AssetError::io(&path, err))?;
            let modified = metadata.modified().map_err(|err| AssetError::io(&path, err))?;
            if newest.is_none_or(|current| modified > current) {
                newest = Some(modified);
            }
        }
        Ok(newest)
    }
}

/// A remote resource fetched over HTTP(S).
#[derive(Debug, Clone)]
pub struct RemoteHttpAsset {
    /// Absolute URL of the resource.
    pub url: String,
}

impl RemoteHttpAsset {
    fn content(&self) -> AssetResult<String> {
        let mut response = ureq::get(&self.url).call().map_err(|err| AssetError::Http {
            url: self.url.clone(),
            source: Box::new(err),
        })?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|err| AssetError::Http {
                url: self.url.clone(),
                source: Box::new(err),
            })
    }
}

/// Translate a glob pattern into an anchored regex over `/`-separated paths.
fn glob_regex(pattern: &str) -> Regex {
    let mut expression = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expression.push_str("[^/]*"),
            '?' => expression.push_str("[^/]"),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression).expect("invalid glob regex")
}

fn collect_matches(
    root: &Path,
    relative: &Path,
    pattern: &Regex,
    matches: &mut BTreeSet<PathBuf>,
) -> std::io::Result<()> {
    let current = if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    };

    let entries = match fs::read_dir(&current) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    for entry in entries {
        let entry = entry?;
        let child_relative = if relative.as_os_str().is_empty() {
            PathBuf::from(entry.file_name())
        } else {
            relative.join(entry.file_name())
        };

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_matches(root, &child_relative, pattern, matches)?;
        } else {
            let candidate = child_relative.to_string_lossy().replace('\\', "/");
            if pattern.is_match(&candidate) {
                matches.insert(entry.path());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeLayout;
    use tempfile::tempdir;

    #[test]
    fn classifies_urls_globs_and_files() {
        assert_eq!(classify("http://x/y.js"), AssetKind::RemoteHttp);
        assert_eq!(classify("https://cdn.example.com/lib.js"), AssetKind::RemoteHttp);
        assert_eq!(classify("*.css"), AssetKind::GlobSet);
        assert_eq!(classify("js/vendor-?.js"), AssetKind::GlobSet);
        assert_eq!(classify("app.js"), AssetKind::LocalFile);
        assert_eq!(classify("css/site.css"), AssetKind::LocalFile);
    }

    #[test]
    fn path_like_references_contain_separators() {
        assert!(is_path_like("js/app.js"));
        assert!(is_path_like("app.js"));
        assert!(is_path_like("vendor-lib"));
        assert!(!is_path_like("jquery"));
    }

    #[test]
    fn local_files_resolve_under_the_theme_root() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());
        let theme_root = temp.path().join("themes/default");
        fs::create_dir_all(theme_root.join("js")).unwrap();
        fs::write(theme_root.join("js/app.js"), "run();").unwrap();

        let handle = build_asset("js/app.js", &layout);
        assert_eq!(handle.content().unwrap(), "run();");
        assert!(handle.last_modified().unwrap().is_some());
    }

    #[test]
    fn missing_local_file_fails_lazily() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());

        // Construction never touches the filesystem.
        let handle = build_asset("js/missing.js", &layout);
        assert!(matches!(handle.content(), Err(AssetError::Io { .. })));
        assert!(matches!(handle.last_modified(), Err(AssetError::Io { .. })));
    }

    #[test]
    fn glob_sets_expand_in_sorted_order() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());
        let theme_root = temp.path().join("themes/default");
        fs::create_dir_all(theme_root.join("css")).unwrap();
        fs::write(theme_root.join("css/b.css"), "b{}").unwrap();
        fs::write(theme_root.join("css/a.css"), "a{}").unwrap();
        fs::write(theme_root.join("css/skip.txt"), "nope").unwrap();

        let handle = build_asset("css/*.css", &layout);
        assert_eq!(handle.content().unwrap(), "a{}\nb{}");
    }

    #[test]
    fn glob_wildcards_stay_within_one_segment() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());
        let theme_root = temp.path().join("themes/default");
        fs::create_dir_all(theme_root.join("css/nested")).unwrap();
        fs::write(theme_root.join("css/top.css"), "top{}").unwrap();
        fs::write(theme_root.join("css/nested/deep.css"), "deep{}").unwrap();

        let handle = build_asset("css/*.css", &layout);
        assert_eq!(handle.content().unwrap(), "top{}");
    }

    #[test]
    fn empty_glob_set_has_no_modification_time() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());

        let handle = build_asset("css/*.css", &layout);
        assert_eq!(handle.content().unwrap(), "");
        assert!(handle.last_modified().unwrap().is_none());
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let temp = tempdir().unwrap();
        let layout = ThemeLayout::new("default", temp.path().join("themes"), temp.path());
        let theme_root = temp.path().join("themes/default");
        fs::create_dir_all(&theme_root).unwrap();
        fs::write(theme_root.join("app.js"), "run();").unwrap();

        let handle = build_asset("app.js", &layout);
        let first = handle.content_hash().unwrap();
        let second = handle.content_hash().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
