/// Which of the three plugin files an entry came from, and which one it is
/// written back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOrigin {
    /// `ms0:/SEPLUGINS/PLUGINS.TXT`
    Ms0,
    /// `ef0:/SEPLUGINS/PLUGINS.TXT`
    Ef0,
    /// `PLUGINS.TXT` under the configured firmware install path.
    ArkPath,
}

/// Soft state of a plugin entry. `Removed` entries stay in the list until a
/// save physically drops them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    On,
    Off,
    Removed,
}

/// One line of a merged plugin list.
///
/// Structured entries model a `context, path, on|off` line: `line` holds the
/// recombined `"context, path"` text and the labels are positional. Any other
/// non-empty line is carried verbatim in `line` with no labels, so unmodeled
/// content (comments, malformed lines) survives a load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub origin: PluginOrigin,
    pub line: String,
    /// Positional `plugin_<n>` identifier; `None` marks a passthrough line.
    pub label: Option<String>,
    /// Positional `plugins<n>` identifier.
    pub sub_label: Option<String>,
    pub state: PluginState,
}

impl PluginEntry {
    pub fn is_structured(&self) -> bool {
        self.label.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.state == PluginState::On
    }
}
