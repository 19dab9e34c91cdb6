use serde::{Deserialize, Serialize};

/// Launcher settings from `arkbooter.yaml`.
///
/// Carries the firmware install location (whose PLUGINS.TXT is the primary
/// plugin source), the 1.50 compatibility payload directory, the ms0
/// redirection flag consumed by run-level selection, and the host directory
/// the console volumes are mounted under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSettings {
    #[serde(rename = "ARK Path", default = "default_ark_path")]
    pub ark_path: String,

    #[serde(rename = "DC Path", default = "default_dc_path")]
    pub dc_path: String,

    /// Launch ef0: homebrew through the ms0: redirection run level.
    #[serde(rename = "Redirect ms0", default)]
    pub redirect_ms0: bool,

    #[serde(rename = "Mount Root", default = "default_mount_root")]
    pub mount_root: String,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            ark_path: default_ark_path(),
            dc_path: default_dc_path(),
            redirect_ms0: false,
            mount_root: default_mount_root(),
        }
    }
}

fn default_ark_path() -> String {
    "ms0:/PSP/SAVEDATA/ARK_01234/".to_string()
}

fn default_dc_path() -> String {
    "ms0:/ARK_DC".to_string()
}

fn default_mount_root() -> String {
    ".".to_string()
}
