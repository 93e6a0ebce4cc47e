//! The preparation subcommands: one per artifact family.
use super::{load_config, load_region_set, load_settings, open_cache};
use crate::balance::EnergyBalance;
use crate::cache::{ArtifactCache, ArtifactKey};
use crate::config::DataConfig;
use crate::demand::{self, AnnualDemandMethod};
use crate::feedin::{self, FeedinCategory, RegionalProfiles};
use crate::input::balance::{read_balance_fixes, read_energy_balance};
use crate::input::demand::{read_annual_demand, read_load_areas, read_load_profile};
use crate::input::feedin::{read_feedin_profiles, read_renewable_statistics};
use crate::input::population::read_municipalities;
use crate::input::powerplant::{read_offshore_patch, read_power_plants};
use crate::input::region::read_state_centroids;
use crate::input::weather::{read_weather_grid, read_weather_table};
use crate::log;
use crate::output::{balance_csv, capacity_csv, population_csv, profiles_csv};
use crate::population::{population_by_region, state_shares_by_region, Municipality};
use crate::powerplant::{
    add_capacity_in, assign_grid_cells, assign_regions, capacity_by_region_fuel,
    fix_pumped_storage, log_fuel_summary, patch_offshore_wind, PowerPlant,
};
use crate::region::RegionSet;
use crate::settings::Settings;
use crate::weather::spatial_average;
use ::log::info;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Difference tolerance of the balance consistency check, in TJ
const BALANCE_TOLERANCE: f64 = 5.0;

/// Options shared by all preparation subcommands
#[derive(Args)]
pub struct PrepareOpts {
    /// Path to the dataset directory.
    pub dataset_dir: PathBuf,
    /// The data year to prepare.
    #[arg(short, long)]
    pub year: u32,
    /// Name of the region set.
    #[arg(short, long)]
    pub region_set: String,
    /// Recompute the artifact even when it is cached.
    #[arg(long)]
    pub overwrite: bool,
}

/// The available preparation subcommands.
#[derive(Subcommand)]
pub enum PrepareSubcommands {
    /// Prepare the capacity table of the harmonised power plant registry.
    Powerplants {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
    },
    /// Prepare normalised regional feed-in profiles.
    Feedin {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
        /// Feed-in category: wind, solar, hydro or geothermal.
        #[arg(short, long)]
        category: String,
        /// Weather year, when it differs from the data year.
        #[arg(long)]
        weather_year: Option<u32>,
    },
    /// Prepare regional hourly demand profiles.
    Demand {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
        /// Annual demand method: fixed, statistics or load-areas.
        #[arg(short, long)]
        method: String,
        /// National annual demand in GWh, required for the fixed method.
        #[arg(long)]
        annual_demand: Option<f64>,
    },
    /// Prepare the regionalised energy balance.
    Balance {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
        /// Apply the documented manual corrections for the year.
        #[arg(long)]
        fix: bool,
    },
    /// Prepare the population table.
    Population {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
    },
    /// Prepare regional averages of an hourly weather parameter.
    Weather {
        /// Shared preparation options
        #[command(flatten)]
        opts: PrepareOpts,
        /// Name of the weather parameter, e.g. temperature.
        #[arg(short, long)]
        parameter: String,
    },
}

impl PrepareSubcommands {
    /// Execute the supplied preparation subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Powerplants { opts } => handle_prepare_powerplants(&opts, None),
            Self::Feedin {
                opts,
                category,
                weather_year,
            } => handle_prepare_feedin(&opts, &category, weather_year, None),
            Self::Demand {
                opts,
                method,
                annual_demand,
            } => handle_prepare_demand(&opts, &method, annual_demand, None),
            Self::Balance { opts, fix } => handle_prepare_balance(&opts, fix, None),
            Self::Population { opts } => handle_prepare_population(&opts, None),
            Self::Weather { opts, parameter } => handle_prepare_weather(&opts, &parameter, None),
        }
    }
}

/// Everything a preparation handler needs
struct PrepareContext {
    /// The data source configuration
    config: DataConfig,
    /// The region set to aggregate onto
    region_set: RegionSet,
    /// The artifact cache
    cache: ArtifactCache,
    /// The data year
    year: u32,
}

impl PrepareContext {
    /// Initialise logging and load config, region set and cache for a preparation run
    fn new(opts: &PrepareOpts, settings: Option<Settings>) -> Result<Self> {
        let settings = load_settings(settings)?;
        log::init(&settings.log_level).context("Failed to initialise logging.")?;
        info!("Starting redap v{}", env!("CARGO_PKG_VERSION"));

        let config = load_config(&opts.dataset_dir)?;
        let region_set = load_region_set(&config, &opts.region_set)?;
        let cache = open_cache(&settings, opts.overwrite);

        Ok(Self {
            config,
            region_set,
            cache,
            year: opts.year,
        })
    }

    /// A cache key for an artifact of this run
    fn key(&self, kind: &str, source_version: &str, weather_year: Option<u32>) -> ArtifactKey {
        ArtifactKey {
            kind: kind.to_string(),
            region_set_name: self.region_set.name().to_string(),
            region_set_identity: self.region_set.identity().to_string(),
            year: self.year,
            source_version: source_version.to_string(),
            weather_year,
        }
    }
}

/// Read and harmonise both registry categories, with all patches applied
fn load_plants(config: &DataConfig, region_set: &RegionSet) -> Result<Vec<PowerPlant>> {
    let centroids = read_state_centroids(
        &config.resolve(&config.files.state_centroids, &[])?,
    )?;

    let version = config.sources.registry.as_str();
    let mut plants = Vec::new();
    for category in ["renewable", "conventional"] {
        let file_path = config.resolve(
            &config.files.powerplants,
            &[("category", category), ("version", version)],
        )?;
        plants.extend(read_power_plants(&file_path, &centroids)?);
    }
    info!("Read {} rows from the registry.", plants.len());

    let patch_path = config.resolve(&config.files.offshore_patch, &[("version", version)])?;
    let patch = read_offshore_patch(&patch_path, &centroids)?;
    if !patch.is_empty() {
        patch_offshore_wind(&mut plants, patch);
    }
    fix_pumped_storage(&mut plants);
    add_capacity_in(&mut plants);
    assign_regions(&mut plants, region_set, &config.spatial);

    Ok(plants)
}

/// Read the municipality table for the configured census year
fn load_municipalities(config: &DataConfig, year: u32) -> Result<Vec<Municipality>> {
    let file_path = config.resolve(
        &config.files.municipalities,
        &[("year", &year.to_string()), ("version", &config.sources.census)],
    )?;

    read_municipalities(&file_path)
}

/// Handle the `prepare powerplants` command.
pub fn handle_prepare_powerplants(opts: &PrepareOpts, settings: Option<Settings>) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let key = ctx.key("powerplants", &ctx.config.sources.registry, None);

    let (path, _) = ctx.cache.fetch_with(&key, || {
        let plants = load_plants(&ctx.config, &ctx.region_set)?;
        log_fuel_summary(&plants, ctx.year);
        capacity_csv(&capacity_by_region_fuel(&plants, ctx.year))
    })?;
    info!("Power plant capacity table: {}", path.display());

    Ok(())
}

/// Handle the `prepare feedin` command.
pub fn handle_prepare_feedin(
    opts: &PrepareOpts,
    category: &str,
    weather_year: Option<u32>,
    settings: Option<Settings>,
) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let weather_year = weather_year.unwrap_or(ctx.year);
    let weather_version = ctx.config.sources.weather.clone();

    match category {
        "wind" | "solar" => {
            let feedin_category: FeedinCategory = match category {
                "wind" => FeedinCategory::Wind,
                _ => FeedinCategory::Solar,
            };
            let sets = match feedin_category {
                FeedinCategory::Wind => &ctx.config.feedin.wind_sets,
                FeedinCategory::Solar => &ctx.config.feedin.solar_sets,
            };

            let mut plants = load_plants(&ctx.config, &ctx.region_set)?;
            let grid = read_weather_grid(
                &ctx.config.resolve(&ctx.config.files.weather_grid, &[])?,
            )?;
            assign_grid_cells(&mut plants, &grid);

            for set_name in sets {
                let key = ctx.key(
                    &format!("feedin_{category}_{set_name}"),
                    &weather_version,
                    Some(weather_year),
                );
                let (path, _) = ctx.cache.fetch_with(&key, || {
                    let file_path = ctx.config.resolve(
                        &ctx.config.files.feedin,
                        &[
                            ("category", category),
                            ("set_name", set_name),
                            ("year", &weather_year.to_string()),
                        ],
                    )?;
                    let profiles = read_feedin_profiles(&file_path, weather_year)?;
                    let regional = feedin::aggregate_by_region(
                        &profiles,
                        &plants,
                        &ctx.region_set,
                        feedin_category,
                        ctx.year,
                    )?;
                    profiles_csv(&regional)
                })?;
                info!("Feed-in profiles ({category}/{set_name}): {}", path.display());
            }
        }
        "hydro" => {
            let key = ctx.key("feedin_hydro", &weather_version, None);
            let (path, _) = ctx.cache.fetch_with(&key, || {
                let stats_path = ctx.config.resolve(
                    &ctx.config.files.renewables,
                    &[("version", &ctx.config.sources.balance)],
                )?;
                let stats = read_renewable_statistics(&stats_path, "hydro", ctx.year)?;
                let regional = feedin::flat_hydro_profile(
                    stats.energy_gwh,
                    stats.capacity_mw,
                    &ctx.region_set,
                    ctx.year,
                )?;
                profiles_csv(&regional)
            })?;
            info!("Feed-in profiles (hydro): {}", path.display());
        }
        "geothermal" => {
            let key = ctx.key("feedin_geothermal", &weather_version, None);
            let (path, _) = ctx.cache.fetch_with(&key, || {
                let regional: RegionalProfiles = feedin::flat_geothermal_profile(
                    ctx.config.feedin.geothermal_full_load_hours,
                    &ctx.region_set,
                    ctx.year,
                );
                profiles_csv(&regional)
            })?;
            info!("Feed-in profiles (geothermal): {}", path.display());
        }
        _ => bail!(
            "Unknown feed-in category '{category}'. Valid categories are: wind, solar, hydro, geothermal"
        ),
    }

    Ok(())
}

/// Handle the `prepare demand` command.
pub fn handle_prepare_demand(
    opts: &PrepareOpts,
    method: &str,
    annual_demand: Option<f64>,
    settings: Option<Settings>,
) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let method: AnnualDemandMethod = method.parse()?;
    let kind = match method {
        AnnualDemandMethod::Fixed => "demand_fixed",
        AnnualDemandMethod::Statistics => "demand_statistics",
        AnnualDemandMethod::LoadAreas => "demand_load_areas",
    };
    let key = ctx.key(kind, &ctx.config.sources.balance, None);

    let (path, _) = ctx.cache.fetch_with(&key, || {
        let regional_demand = match method {
            AnnualDemandMethod::LoadAreas => {
                let file_path = ctx.config.resolve(&ctx.config.files.load_areas, &[])?;
                let load_areas = read_load_areas(&file_path)?;
                demand::annual_demand_by_load_areas(
                    &load_areas,
                    &ctx.region_set,
                    &ctx.config.spatial,
                )?
            }
            _ => {
                let national = match method {
                    AnnualDemandMethod::Fixed => {
                        annual_demand.context("The fixed method requires --annual-demand")?
                    }
                    _ => {
                        let file_path = ctx.config.resolve(
                            &ctx.config.files.annual_demand,
                            &[("version", &ctx.config.sources.balance)],
                        )?;
                        read_annual_demand(&file_path, ctx.year)?
                    }
                };
                let municipalities = load_municipalities(&ctx.config, ctx.year)?;
                let population = population_by_region(
                    &municipalities,
                    &ctx.region_set,
                    &ctx.config.spatial,
                )?;
                demand::annual_demand_by_population(national, &population)?
            }
        };

        let profile_path = ctx.config.resolve(
            &ctx.config.files.load_profile,
            &[("year", &ctx.year.to_string())],
        )?;
        let profile = read_load_profile(&profile_path, ctx.year)?;
        let regional = demand::demand_by_region(&profile, &regional_demand)?;
        profiles_csv(&regional)
    })?;
    info!("Demand profiles: {}", path.display());

    Ok(())
}

/// Handle the `prepare balance` command.
pub fn handle_prepare_balance(
    opts: &PrepareOpts,
    fix: bool,
    settings: Option<Settings>,
) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let key = ctx.key("balance", &ctx.config.sources.balance, None);

    let (path, _) = ctx.cache.fetch_with(&key, || {
        let balance = load_balance(&ctx.config, ctx.year, fix)?;
        let municipalities = load_municipalities(&ctx.config, ctx.year)?;
        let shares =
            state_shares_by_region(&municipalities, &ctx.region_set, &ctx.config.spatial)?;
        let regional = balance.by_region(&shares)?;
        balance_csv(&regional)
    })?;
    info!("Regionalised balance: {}", path.display());

    Ok(())
}

/// Read, optionally fix, group and check the balance of one year
fn load_balance(config: &DataConfig, year: u32, fix: bool) -> Result<EnergyBalance> {
    let year_str = year.to_string();
    let file_path = config.resolve(
        &config.files.balance,
        &[("year", &year_str), ("version", &config.sources.balance)],
    )?;
    let mut balance = read_energy_balance(&file_path, year)?;

    if fix {
        let fixes_path = config.resolve(&config.files.balance_fixes, &[("year", &year_str)])?;
        let fixes = read_balance_fixes(&fixes_path)?;
        balance.apply_fixes(&fixes)?;
    }
    if !config.fuel_groups.is_empty() {
        balance = balance.group_fuels(&config.fuel_groups)?;
    }
    balance.check(BALANCE_TOLERANCE);

    Ok(balance)
}

/// Handle the `prepare population` command.
pub fn handle_prepare_population(opts: &PrepareOpts, settings: Option<Settings>) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let key = ctx.key("population", &ctx.config.sources.census, None);

    let (path, _) = ctx.cache.fetch_with(&key, || {
        let municipalities = load_municipalities(&ctx.config, ctx.year)?;
        let totals = population_by_region(&municipalities, &ctx.region_set, &ctx.config.spatial)?;
        population_csv(&totals)
    })?;
    info!("Population table: {}", path.display());

    Ok(())
}

/// Handle the `prepare weather` command.
pub fn handle_prepare_weather(
    opts: &PrepareOpts,
    parameter: &str,
    settings: Option<Settings>,
) -> Result<()> {
    let ctx = PrepareContext::new(opts, settings)?;
    let key = ctx.key(
        &format!("weather_{parameter}"),
        &ctx.config.sources.weather,
        None,
    );

    let (path, _) = ctx.cache.fetch_with(&key, || {
        let grid = read_weather_grid(&ctx.config.resolve(&ctx.config.files.weather_grid, &[])?)?;
        let file_path = ctx.config.resolve(
            &ctx.config.files.weather,
            &[("parameter", parameter), ("year", &ctx.year.to_string())],
        )?;
        let table = read_weather_table(&file_path, ctx.year)?;
        let averages = spatial_average(&table, &grid, &ctx.region_set)?;
        profiles_csv(&averages)
    })?;
    info!("Weather averages ({parameter}): {}", path.display());

    Ok(())
}

/// Load every table of the dataset without writing artifacts
pub fn validate_dataset(config: &DataConfig, region_set: &RegionSet) -> Result<()> {
    let plants = load_plants(config, region_set)?;
    info!("Registry valid ({} plants).", plants.len());

    let grid = read_weather_grid(&config.resolve(&config.files.weather_grid, &[])?)?;
    info!("Weather grid valid ({} cells).", grid.cells().len());
    grid.cells_by_region(region_set)?;

    Ok(())
}
