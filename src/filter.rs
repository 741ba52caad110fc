//! Content filters applied to assets while merging a group.

use std::sync::Arc;

use regex::Regex;

use crate::error::{AssetError, AssetResult};

/// A transformation applied to asset content before it is merged.
///
/// Filters are pure string transforms; they receive the full content of one
/// input asset and return the filtered replacement.
pub trait AssetFilter: Send + Sync {
    /// Apply the filter to the given content.
    fn apply(&self, content: &str) -> String;
}

impl std::fmt::Debug for dyn AssetFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AssetFilter")
    }
}

/// How a named filter is produced at registry-build time.
///
/// Configuration files can only carry [`FilterSpec::TypeName`]; the other two
/// variants exist for programmatic registration of filters that carry state or
/// cannot be named in config.
pub enum FilterSpec {
    /// Name of a built-in filter type, constructed with no arguments.
    TypeName(String),
    /// A pre-built filter instance.
    Instance(Arc<dyn AssetFilter>),
    /// A callable producing a filter instance.
    Factory(Box<dyn Fn() -> Arc<dyn AssetFilter> + Send + Sync>),
}

impl std::fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeName(name) => f.debug_tuple("TypeName").field(name).finish(),
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl FilterSpec {
    /// Resolve the spec into a filter instance.
    ///
    /// `name` is the registry key, used only for error reporting. Unrecognized
    /// type names fail with [`AssetError::UnknownFilterSpec`].
    pub fn resolve(&self, name: &str) -> AssetResult<Arc<dyn AssetFilter>> {
        match self {
            Self::TypeName(type_name) => build_named_filter(type_name).ok_or_else(|| {
                AssetError::UnknownFilterSpec {
                    name: name.to_string(),
                }
            }),
            Self::Instance(filter) => Ok(filter.clone()),
            Self::Factory(factory) => Ok(factory()),
        }
    }
}

fn build_named_filter(type_name: &str) -> Option<Arc<dyn AssetFilter>> {
    match type_name {
        "CssMinFilter" => Some(Arc::new(CssMinFilter)),
        "JsMinFilter" => Some(Arc::new(JsMinFilter)),
        _ => None,
    }
}

fn block_comments() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("invalid block comment regex"))
}

/// Conservative CSS minifier: strips comments, collapses whitespace and drops
/// spaces around punctuation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssMinFilter;

impl AssetFilter for CssMinFilter {
    fn apply(&self, content: &str) -> String {
        use std::sync::OnceLock;

        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        static PUNCTUATION: OnceLock<Regex> = OnceLock::new();

        let whitespace =
            WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("invalid whitespace regex"));
        let punctuation = PUNCTUATION
            .get_or_init(|| Regex::new(r"\s*([{};:,>])\s*").expect("invalid punctuation regex"));

        let without_comments = block_comments().replace_all(content, "");
        let collapsed = whitespace.replace_all(&without_comments, " ");
        punctuation.replace_all(&collapsed, "$1").trim().to_string()
    }
}

/// Conservative JS minifier: strips block comments and whole-line `//`
/// comments, then drops blank lines and trailing whitespace.
///
/// Inline `//` comments are left untouched so string literals containing
/// protocol separators survive.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsMinFilter;

impl AssetFilter for JsMinFilter {
    fn apply(&self, content: &str) -> String {
        use std::sync::OnceLock;

        static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();

        let line_comment = LINE_COMMENT
            .get_or_init(|| Regex::new(r"(?m)^\s*//.*$").expect("invalid line comment regex"));

        let without_blocks = block_comments().replace_all(content, "");
        let without_lines = line_comment.replace_all(&without_blocks, "");

        without_lines
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_spec_builds_builtin_filters() {
        let spec = FilterSpec::TypeName("CssMinFilter".into());
        let filter = spec.resolve("cssmin").unwrap();
        assert_eq!(filter.apply("a {  color : red ; }"), "a{color:red;}");
    }

    #[test]
    fn unknown_type_name_fails_with_filter_spec_error() {
        let spec = FilterSpec::TypeName("NoSuchFilter".into());
        let err = spec.resolve("broken").unwrap_err();
        assert!(matches!(
            err,
            AssetError::UnknownFilterSpec { name } if name == "broken"
        ));
    }

    #[test]
    fn instance_spec_returns_the_given_filter() {
        struct Upper;
        impl AssetFilter for Upper {
            fn apply(&self, content: &str) -> String {
                content.to_uppercase()
            }
        }

        let spec = FilterSpec::Instance(Arc::new(Upper));
        let filter = spec.resolve("upper").unwrap();
        assert_eq!(filter.apply("abc"), "ABC");
    }

    #[test]
    fn factory_spec_invokes_the_callable() {
        let spec = FilterSpec::Factory(Box::new(|| Arc::new(JsMinFilter)));
        let filter = spec.resolve("jsmin").unwrap();
        assert_eq!(filter.apply("// gone\nlet x = 1;\n"), "let x = 1;");
    }

    #[test]
    fn cssmin_strips_comments_and_whitespace() {
        let css = "/* banner */\nbody {\n  margin : 0 ;\n}\n\na, b { color: blue; }";
        assert_eq!(
            CssMinFilter.apply(css),
            "body{margin:0;}a,b{color:blue;}"
        );
    }

    #[test]
    fn jsmin_keeps_inline_urls_intact() {
        let js = "// header\nconst url = 'http://example.com'; /* note */\n\n  \nrun();";
        assert_eq!(
            JsMinFilter.apply(js),
            "const url = 'http://example.com';\nrun();"
        );
    }
}
