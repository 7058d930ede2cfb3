//! Mastering settings loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in [`MasteringSettings`] defaults
//! 2. A TOML file (`--config`, or `crest.toml` in the working directory)
//! 3. `CREST_*` environment variables (`CREST_TARGET_LUFS=-16`)
//! 4. Command-line overrides

use crate::error::{CliError, Result};
use crest_core::{BitDepth, DitherMode, MasteringSettings, TargetPreset};
use std::path::{Path, PathBuf};

/// Settings file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "crest.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CREST";

/// Load settings from an optional file plus the environment
///
/// An explicit `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> Result<MasteringSettings> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                builder = builder.add_source(config::File::from(default_path));
            }
        }
    }

    // `CREST_TARGET_LUFS`; nested keys split on `__` only
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let settings: MasteringSettings = builder.build()?.try_deserialize()?;
    tracing::debug!(?settings, "Loaded mastering settings");
    Ok(settings)
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub preset: Option<TargetPreset>,
    pub target_lufs: Option<f64>,
    pub ceiling_dbtp: Option<f64>,
    pub bit_depth: Option<BitDepth>,
    pub dither: Option<DitherMode>,
}

impl SettingsOverrides {
    /// Apply on top of `settings`; an explicit target wins over a preset
    pub fn apply(&self, mut settings: MasteringSettings) -> MasteringSettings {
        if let Some(preset) = self.preset {
            settings = settings.with_target_lufs(preset.target_lufs());
        }
        if let Some(target) = self.target_lufs {
            settings = settings.with_target_lufs(target);
        }
        if let Some(ceiling) = self.ceiling_dbtp {
            settings = settings.with_ceiling_dbtp(ceiling);
        }
        if let Some(bit_depth) = self.bit_depth {
            settings = settings.with_bit_depth(bit_depth);
        }
        if let Some(dither) = self.dither {
            settings = settings.with_dither(dither);
        }
        settings
    }
}

/// Load, override and validate
pub fn resolve_settings(
    path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<MasteringSettings> {
    let settings = overrides.apply(load_settings(path)?);
    settings.validate()?;
    Ok(settings)
}
