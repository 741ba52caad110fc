//! Error taxonomy shared across the asset resolution pipeline.

use std::path::PathBuf;

/// Generic result type used across the crate.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors raised while building registries or resolving asset groups.
///
/// All failures are synchronous and fatal to the calling operation: nothing is
/// retried or swallowed internally, and the caller decides whether to propagate
/// or substitute a fallback.
#[derive(Debug)]
pub enum AssetError {
    /// A required configuration key or group definition is missing or malformed.
    Configuration {
        /// Dotted configuration key that failed to resolve.
        key: String,
    },
    /// A group referenced a name that is neither registered nor path-like.
    UnknownAsset {
        /// The offending asset reference.
        name: String,
    },
    /// A filter spec could not be resolved into a filter instance.
    UnknownFilterSpec {
        /// Name of the filter whose spec failed to resolve.
        name: String,
    },
    /// Filesystem access failed while reading an input or writing an output.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },
    /// A remote asset could not be fetched.
    Http {
        /// URL that caused the error.
        url: String,
        /// Source transport error.
        source: Box<ureq::Error>,
    },
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration { key } => {
                write!(f, "missing or invalid configuration value: {key}")
            }
            Self::UnknownAsset { name } => {
                write!(f, "no asset '{name}' defined")
            }
            Self::UnknownFilterSpec { name } => {
                write!(f, "cannot resolve filter spec for '{name}'")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            Self::Http { url, source } => {
                write!(f, "failed to fetch {url}: {source}")
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Http { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl AssetError {
    /// Build an [`AssetError::Io`] capturing the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_names() {
        let err = AssetError::UnknownAsset {
            name: "foo".into(),
        };
        assert_eq!(err.to_string(), "no asset 'foo' defined");

        let err = AssetError::Configuration {
            key: "default.groups.main.output".into(),
        };
        assert!(err.to_string().contains("default.groups.main.output"));
    }

    #[test]
    fn io_errors_expose_their_source() {
        use std::error::Error;

        let err = AssetError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/tmp/missing"));
    }
}
