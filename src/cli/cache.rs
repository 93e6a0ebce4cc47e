//! The CLI commands for inspecting and clearing the artifact cache.
use super::load_settings;
use crate::cache::ArtifactCache;
use crate::settings::Settings;
use anyhow::Result;
use clap::Subcommand;

/// The available subcommands for managing the artifact cache.
#[derive(Subcommand)]
pub enum CacheSubcommands {
    /// List cached artifacts.
    Info,
    /// Delete the whole artifact cache.
    Clear,
}

impl CacheSubcommands {
    /// Execute the supplied cache subcommand
    pub fn execute(self) -> Result<()> {
        let settings = load_settings(None)?;
        match self {
            Self::Info => handle_cache_info_command(&settings),
            Self::Clear => handle_cache_clear_command(&settings),
        }
    }
}

/// Handle the `cache info` command.
fn handle_cache_info_command(settings: &Settings) -> Result<()> {
    let cache = ArtifactCache::new(&settings.cache_root, false);
    let entries = cache.info()?;
    if entries.is_empty() {
        println!("The cache at {} is empty.", settings.cache_root.display());
        return Ok(());
    }

    for entry in &entries {
        let weather = entry
            .key
            .weather_year
            .map(|year| format!(" (weather {year})"))
            .unwrap_or_default();
        println!(
            "{}\t{} {} {}{weather} v{}\t{} bytes",
            entry.path.display(),
            entry.key.kind,
            entry.key.region_set_name,
            entry.key.year,
            entry.key.source_version,
            entry.size,
        );
    }
    println!("{} artifacts.", entries.len());

    Ok(())
}

/// Handle the `cache clear` command.
fn handle_cache_clear_command(settings: &Settings) -> Result<()> {
    let cache = ArtifactCache::new(&settings.cache_root, false);
    let count = cache.info()?.len();
    cache.clear()?;
    println!("Removed {count} cached artifacts.");

    Ok(())
}
