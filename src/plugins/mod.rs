//! The plugin list store.
//!
//! Enable/disable configuration for loadable modules lives in up to three
//! PLUGINS.TXT files: one under the firmware install path and one in the
//! SEPLUGINS directory of each volume. Loading merges all three into one
//! editable in-memory list that remembers each entry's origin; saving splits
//! the list back out per origin, dropping entries marked removed.

use crate::models::{LauncherSettings, PluginEntry, PluginOrigin, PluginState};
use crate::storage::Storage;

/// Documentation placeholder synthesized when no source file has any entry.
pub const SAMPLE_PLUGIN_LINE: &str = "ULUS01234, ms0:/SEPLUGINS/example.prx";

const MS0_PLUGIN_FILE: &str = "ms0:/SEPLUGINS/PLUGINS.TXT";
const EF0_PLUGIN_FILE: &str = "ef0:/SEPLUGINS/PLUGINS.TXT";

/// Recognized enable markers for the third field of a plugin line.
pub fn parse_enabled_marker(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("on")
        || token == "1"
        || token.eq_ignore_ascii_case("true")
        || token.eq_ignore_ascii_case("enabled")
    {
        Some(true)
    } else if token.eq_ignore_ascii_case("off")
        || token == "0"
        || token.eq_ignore_ascii_case("false")
        || token.eq_ignore_ascii_case("disabled")
    {
        Some(false)
    } else {
        None
    }
}

fn plugin_file_path(ark_path: &str) -> String {
    if ark_path.ends_with('/') {
        format!("{ark_path}PLUGINS.TXT")
    } else {
        format!("{ark_path}/PLUGINS.TXT")
    }
}

/// The primary path must not double-count entries when the install path is
/// itself one of the standard SEPLUGINS locations.
fn is_standard_location(path: &str) -> bool {
    path.eq_ignore_ascii_case(MS0_PLUGIN_FILE) || path.eq_ignore_ascii_case(EF0_PLUGIN_FILE)
}

/// Merged, editable plugin list.
///
/// Entries keep insertion order within their origin; across origins the order
/// is install path, then ms0, then ef0, concatenated. A load is always a full
/// rebuild.
#[derive(Debug, Clone, Default)]
pub struct PluginList {
    entries: Vec<PluginEntry>,
}

impl PluginList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Soft edit; removal only becomes physical on save.
    pub fn set_state(&mut self, index: usize, state: PluginState) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Read and merge all three configuration locations.
    ///
    /// Unreadable files are skipped; unparseable lines are preserved verbatim.
    /// If nothing at all was found the single example entry is synthesized so
    /// the list is never empty after a load.
    pub fn load<S: Storage>(storage: &S, settings: &LauncherSettings) -> Self {
        let mut list = Self::new();

        let primary = plugin_file_path(&settings.ark_path);
        if !is_standard_location(&primary) {
            list.ingest(storage, &primary, PluginOrigin::ArkPath);
        }
        list.ingest(storage, MS0_PLUGIN_FILE, PluginOrigin::Ms0);
        list.ingest(storage, EF0_PLUGIN_FILE, PluginOrigin::Ef0);

        if list.entries.is_empty() {
            list.entries.push(PluginEntry {
                origin: PluginOrigin::Ms0,
                line: SAMPLE_PLUGIN_LINE.to_string(),
                label: Some("plugin_0".to_string()),
                sub_label: Some("plugins0".to_string()),
                state: PluginState::On,
            });
        }

        tracing::debug!("loaded {} plugin entries", list.entries.len());
        list
    }

    fn ingest<S: Storage>(&mut self, storage: &S, path: &str, origin: PluginOrigin) {
        let raw = match storage.read(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("skipping {path}: {err}");
                return;
            }
        };
        let text = String::from_utf8_lossy(&raw);
        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            self.push_line(line, origin);
        }
    }

    fn push_line(&mut self, line: &str, origin: PluginOrigin) {
        let index = self.entries.len();
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() == 3 {
            if let Some(enabled) = parse_enabled_marker(fields[2]) {
                self.entries.push(PluginEntry {
                    origin,
                    line: format!("{}, {}", fields[0], fields[1]),
                    label: Some(format!("plugin_{index}")),
                    sub_label: Some(format!("plugins{index}")),
                    state: if enabled { PluginState::On } else { PluginState::Off },
                });
                return;
            }
        }
        // anything else is preserved as-is
        self.entries.push(PluginEntry {
            origin,
            line: line.to_string(),
            label: None,
            sub_label: None,
            state: PluginState::On,
        });
    }

    /// True when the list is exactly the untouched synthesized example, which
    /// must never be written to storage.
    pub fn is_untouched_sample(&self) -> bool {
        if self.entries.len() != 1 {
            return false;
        }
        let entry = &self.entries[0];
        entry.line == SAMPLE_PLUGIN_LINE
            && entry.origin == PluginOrigin::Ms0
            && entry.state == PluginState::On
            && entry.is_structured()
    }

    /// Write the list back out, split by origin.
    ///
    /// All destinations are recreated (truncating existing content); entries
    /// marked removed are dropped. A destination whose write fails is logged
    /// and skipped, the rest still go through.
    pub fn save<S: Storage>(&self, storage: &S, settings: &LauncherSettings) {
        if self.entries.is_empty() || self.is_untouched_sample() {
            return;
        }

        let mut outputs = [String::new(), String::new(), String::new()];
        for entry in &self.entries {
            if entry.state == PluginState::Removed {
                continue;
            }
            let out = &mut outputs[slot(entry.origin)];
            out.push_str(&entry.line);
            if entry.is_structured() {
                out.push_str(if entry.is_enabled() { ", on" } else { ", off" });
            }
            out.push('\n');
        }

        let primary = plugin_file_path(&settings.ark_path);
        let destinations: [(&str, usize); 3] = [
            (MS0_PLUGIN_FILE, slot(PluginOrigin::Ms0)),
            (EF0_PLUGIN_FILE, slot(PluginOrigin::Ef0)),
            (primary.as_str(), slot(PluginOrigin::ArkPath)),
        ];
        for (path, index) in destinations {
            // the primary destination disappears when it aliases a standard
            // location; its entries were never loaded separately either
            if index == slot(PluginOrigin::ArkPath) && is_standard_location(path) {
                continue;
            }
            if let Err(err) = storage.write(path, outputs[index].as_bytes()) {
                tracing::warn!("could not write plugin list to {path}: {err}");
            }
        }
    }
}

fn slot(origin: PluginOrigin) -> usize {
    match origin {
        PluginOrigin::Ms0 => 0,
        PluginOrigin::Ef0 => 1,
        PluginOrigin::ArkPath => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enabled_marker() {
        assert_eq!(parse_enabled_marker("on"), Some(true));
        assert_eq!(parse_enabled_marker("ON"), Some(true));
        assert_eq!(parse_enabled_marker("1"), Some(true));
        assert_eq!(parse_enabled_marker("off"), Some(false));
        assert_eq!(parse_enabled_marker("0"), Some(false));
        assert_eq!(parse_enabled_marker("disabled"), Some(false));
        assert_eq!(parse_enabled_marker("maybe"), None);
        assert_eq!(parse_enabled_marker(""), None);
    }

    #[test]
    fn test_plugin_file_path_joins_once() {
        assert_eq!(
            plugin_file_path("ms0:/PSP/SAVEDATA/ARK_01234/"),
            "ms0:/PSP/SAVEDATA/ARK_01234/PLUGINS.TXT"
        );
        assert_eq!(
            plugin_file_path("ms0:/PSP/SAVEDATA/ARK_01234"),
            "ms0:/PSP/SAVEDATA/ARK_01234/PLUGINS.TXT"
        );
    }

    #[test]
    fn test_standard_location_guard() {
        assert!(is_standard_location("ms0:/SEPLUGINS/PLUGINS.TXT"));
        assert!(is_standard_location("MS0:/seplugins/plugins.txt"));
        assert!(!is_standard_location("ms0:/PSP/SAVEDATA/ARK_01234/PLUGINS.TXT"));
    }

    #[test]
    fn test_push_line_shapes() {
        let mut list = PluginList::new();
        list.push_line("ULUS01234, ms0:/SEPLUGINS/x.prx, off", PluginOrigin::Ms0);
        list.push_line("# comment", PluginOrigin::Ms0);
        list.push_line("vsh, ms0:/a.prx", PluginOrigin::Ms0);

        let entries = list.entries();
        assert_eq!(entries[0].line, "ULUS01234, ms0:/SEPLUGINS/x.prx");
        assert_eq!(entries[0].state, PluginState::Off);
        assert_eq!(entries[0].label.as_deref(), Some("plugin_0"));
        assert_eq!(entries[0].sub_label.as_deref(), Some("plugins0"));

        assert!(!entries[1].is_structured());
        assert_eq!(entries[1].line, "# comment");

        // two fields only: passthrough
        assert!(!entries[2].is_structured());
    }

    #[test]
    fn test_labels_are_positional_across_origins() {
        let mut list = PluginList::new();
        list.push_line("game, ms0:/a.prx, on", PluginOrigin::ArkPath);
        list.push_line("game, ms0:/b.prx, on", PluginOrigin::Ms0);
        assert_eq!(list.entries()[1].label.as_deref(), Some("plugin_1"));
    }
}
