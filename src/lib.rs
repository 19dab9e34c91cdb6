// arkbooter - EBOOT classification, launch dispatch and plugin list management
// for the ARK custom firmware.
//
// This is the library crate containing the core logic. The binary crate
// (main.rs) provides the command-line frontend for working against a host
// directory where the console volumes are mounted.

pub mod config;
pub mod eboot;
pub mod logging;
pub mod models;
pub mod plugins;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::SettingsManager;
pub use eboot::classify::{EbootKind, classify, resolve_launch_path};
pub use eboot::launch::{BootEnv, LaunchError, LaunchPlan, LaunchRequest, Launcher};
pub use eboot::{Eboot, PbpHeader, Section};
pub use models::{LauncherSettings, PluginEntry, PluginOrigin, PluginState};
pub use plugins::PluginList;
pub use storage::{DirStorage, Storage, Volume};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
