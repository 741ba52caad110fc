#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset;
pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod theme;

pub use asset::{AssetHandle, AssetKind, classify};
pub use config::ThemeAssetConfig;
pub use error::{AssetError, AssetResult};
pub use filter::{AssetFilter, CssMinFilter, FilterSpec, JsMinFilter};
pub use registry::{AssetRegistry, FilterRegistry};
pub use resolver::{AssetResolver, ResolvedGroup, UrlOptions};
pub use theme::{ThemeContext, ThemeLayout};
