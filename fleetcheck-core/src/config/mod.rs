//! Fleet configuration
//!
//! One file holds targets, checks and the `[run]`, `[notify]` and `[smtp]`
//! tables. It is read once before a run and never reloaded.

mod file;
pub mod settings;

pub use file::{
    CONFIG_FILE_NAME, ConfigFormat, FleetConfig, default_config_path, load_fleet_config,
    load_fleet_config_with, parse_fleet_config,
};
pub use settings::{
    DEFAULT_SMTP_PORT, NotifySettings, RunSettings, SmtpSettings, resolve_env_value,
};
