//! # pulse-settings
//!
//! Configuration management with layered sources for pulse.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PulseSettings::default()`]
//! 2. **Settings file**: `~/.pulse/settings.json` or an explicit path (deep-merged)
//! 3. **Environment variables**: `GITHUB_TOKEN`, `CRON_SECRET`, `ADMIN_TOKEN`,
//!    and `PULSE_*` overrides (highest priority)
//!
//! Settings are loaded once by the binary and passed down explicitly;
//! nothing in pulse reads configuration from ambient global state.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_file_over_defaults, load_settings,
    load_settings_from_path, pulse_home, settings_path,
};
pub use types::*;
