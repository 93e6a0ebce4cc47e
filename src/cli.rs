//! The command line interface for the preparation pipeline.
use crate::cache::ArtifactCache;
use crate::config::DataConfig;
use crate::input::region::read_region_set;
use crate::log;
use crate::region::RegionSet;
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod cache;
use cache::CacheSubcommands;

pub mod prepare;
use prepare::PrepareSubcommands;

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the preparation pipeline.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Prepare an artifact for a region set and year.
    Prepare {
        /// The available preparation subcommands.
        #[command(subcommand)]
        subcommand: PrepareSubcommands,
    },
    /// Load and validate a dataset without writing artifacts.
    Validate {
        /// Path to the dataset directory.
        dataset_dir: PathBuf,
        /// Name of the region set to validate against.
        #[arg(short, long)]
        region_set: String,
    },
    /// Inspect or clear the artifact cache.
    Cache {
        /// The available cache subcommands.
        #[command(subcommand)]
        subcommand: CacheSubcommands,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Prepare { subcommand } => subcommand.execute(),
            Self::Validate {
                dataset_dir,
                region_set,
            } => handle_validate_command(&dataset_dir, &region_set, None),
            Self::Cache { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start redap
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        command.execute()?;
    } else {
        // No command provided. Show help.
        Cli::command().print_long_help()?;
    }

    Ok(())
}

/// Load program settings unless already provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        return Ok(settings);
    }

    Settings::load().context("Failed to load settings.")
}

/// Read the data source configuration of a dataset directory
fn load_config(dataset_dir: &Path) -> Result<DataConfig> {
    DataConfig::from_dataset_dir(dataset_dir).context("Failed to load data source configuration.")
}

/// Load the named region set from the dataset directory
fn load_region_set(config: &DataConfig, name: &str) -> Result<RegionSet> {
    let file_path = config.resolve(&config.files.region_set, &[("region_set", name)])?;
    let region_set = read_region_set(&file_path, name)?;
    info!(
        "Loaded region set '{name}' ({} regions, identity {}).",
        region_set.len(),
        region_set.short_identity()
    );

    Ok(region_set)
}

/// The artifact cache configured by the program settings
fn open_cache(settings: &Settings, overwrite: bool) -> ArtifactCache {
    ArtifactCache::new(&settings.cache_root, overwrite || settings.overwrite)
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    dataset_dir: &Path,
    region_set_name: &str,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(&settings.log_level).context("Failed to initialise logging.")?;

    let config = load_config(dataset_dir)?;
    let region_set = load_region_set(&config, region_set_name)?;
    prepare::validate_dataset(&config, &region_set).context("Failed to validate dataset.")?;
    info!("Dataset validation successful!");

    Ok(())
}
