//! Command line front end for resolving theme asset groups.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use theme_assets::{AssetResolver, ThemeAssetConfig, ThemeLayout, UrlOptions};

#[derive(Debug, Parser)]
#[command(
    name = "theme-assets",
    version,
    about = "Merge, filter and cache-bust theme asset groups"
)]
struct Cli {
    /// Path to the configuration file (defaults to theme.config.json in the
    /// config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory searched for theme.config.json when --config is not given.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Active theme name.
    #[arg(long, default_value = "default")]
    theme: String,

    /// Directory containing theme source trees.
    #[arg(long, default_value = "themes")]
    themes_dir: PathBuf,

    /// Web root that merged outputs are written beneath.
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one group, or every group of the active theme, writing stale
    /// outputs.
    Build {
        /// Group to build; omit to build all groups declared for the theme.
        group: Option<String>,
        /// Rebuild and rewrite outputs even when they are current.
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the public URL for a group.
    Url {
        /// Group name.
        group: String,
        /// Append a content-hash cache buster.
        #[arg(long)]
        md5: bool,
    },
    /// Print the public-relative output path for a group.
    File {
        /// Group name.
        group: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("theme_assets=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ThemeAssetConfig::from_path(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ThemeAssetConfig::discover(&cli.config_dir).with_context(|| {
            format!(
                "failed to load configuration from {}",
                cli.config_dir.display()
            )
        })?,
    };

    let layout = ThemeLayout::new(
        cli.theme.clone(),
        cli.themes_dir.clone(),
        cli.public_dir.clone(),
    );
    let resolver = AssetResolver::new(config.clone(), Box::new(layout))
        .context("failed to build registries")?;

    match cli.command {
        Command::Build { group, overwrite } => {
            let names: Vec<String> = match group {
                Some(name) => vec![name],
                None => config
                    .group_names(&cli.theme)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            };
            for name in names {
                let group = resolver
                    .resolve_group(&name, overwrite)
                    .with_context(|| format!("failed to resolve group '{name}'"))?;
                match &group.target {
                    Some(target) => info!(group = %name, output = %target.url_path, "resolved"),
                    None => info!(group = %name, "resolved (no output configured)"),
                }
            }
        }
        Command::Url { group, md5 } => {
            let options = UrlOptions {
                md5: md5.then_some(true),
                secure: None,
            };
            let url = resolver
                .url_for(&group, options)
                .with_context(|| format!("failed to resolve group '{group}'"))?;
            println!("{url}");
        }
        Command::File { group } => {
            let path = resolver
                .file_path_for(&group)
                .with_context(|| format!("failed to resolve group '{group}'"))?;
            println!("{path}");
        }
    }

    Ok(())
}
