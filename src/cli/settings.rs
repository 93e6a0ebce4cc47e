//! The CLI commands for managing the settings file.
use crate::settings::{get_settings_file_path, Settings};
use anyhow::Result;
use clap::Subcommand;

/// The subcommands for managing the settings file.
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Show the current settings.
    Show,
    /// Show the default settings file contents.
    ShowDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Show => handle_settings_show_command(),
            Self::ShowDefault => {
                print!("{}", Settings::default_file_contents());
                Ok(())
            }
        }
    }
}

/// Handle the `settings show` command.
fn handle_settings_show_command() -> Result<()> {
    let path = get_settings_file_path();
    if path.is_file() {
        println!("# Settings from {}", path.display());
    } else {
        println!("# No settings file at {}; showing defaults", path.display());
    }
    let settings = Settings::load()?;
    print!("{}", toml::to_string(&settings)?);

    Ok(())
}
