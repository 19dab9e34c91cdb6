// Data models for the launcher
//
// This module contains the settings structures loaded from YAML and the
// in-memory representation of plugin list entries.

pub mod plugin;
pub mod settings;

pub use plugin::{PluginEntry, PluginOrigin, PluginState};
pub use settings::LauncherSettings;
