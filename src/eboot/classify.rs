//! Deciding what kind of payload a packaged executable holds.
//!
//! Classification reads the container header, pulls the `CATEGORY` tag out of
//! the parameter block and maps it to a launch strategy. Anything that cannot
//! be read or decoded degrades to [`EbootKind::Unknown`] instead of failing;
//! callers must handle `Unknown` explicitly.

use super::{Eboot, Section};
use crate::eboot::sfo::SfoTable;
use crate::storage::Storage;
use std::fmt;

/// Category tags as 2-byte little-endian values.
const CAT_HOMEBREW: u16 = u16::from_le_bytes(*b"MG");
const CAT_PSN: u16 = u16::from_le_bytes(*b"EG");
const CAT_PS1: u16 = u16::from_le_bytes(*b"ME");

/// Well-known system updater locations. A path matching one of these is an
/// updater regardless of what (if anything) is stored there.
pub const UPDATER_PATHS: [&str; 3] = [
    "ms0:/PSP/GAME/UPDATE/EBOOT.PBP",
    "ef0:/PSP/GAME/UPDATE/EBOOT.PBP",
    "ms0:/PSP/APPS/UPDATE/VBOOT.PBP",
];

/// Classification of a packaged executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbootKind {
    /// Unsigned homebrew (category `MG`).
    Homebrew,
    /// Store-purchased title, launched through disc emulation (category `EG`).
    StorePurchased,
    /// PS1 classic running under the legacy-disc emulator (category `ME`).
    LegacyDisc,
    /// System software updater, recognized by path alone.
    Updater,
    /// Anything unreadable, unrecognized or uncategorized.
    Unknown,
}

impl fmt::Display for EbootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EbootKind::Homebrew => "HOMEBREW",
            EbootKind::StorePurchased => "PSN",
            EbootKind::LegacyDisc => "POPS",
            EbootKind::Updater => "UPDATER",
            EbootKind::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Classify the container at `path`.
///
/// Updater paths are matched case-insensitively before any I/O happens. For
/// everything else the parameter block is read and its `CATEGORY` tag mapped;
/// a missing parameter block or an unmapped category yields `Unknown`.
pub fn classify<S: Storage>(storage: &S, path: &str) -> EbootKind {
    if UPDATER_PATHS.iter().any(|p| p.eq_ignore_ascii_case(path)) {
        return EbootKind::Updater;
    }

    let eboot = match Eboot::open(storage, path) {
        Ok(eboot) => eboot,
        Err(err) => {
            tracing::debug!("{path}: unreadable container header: {err}");
            return EbootKind::Unknown;
        }
    };

    let param_len = match eboot.header().section_len(Section::Param) {
        Some(len) if len > 0 => len,
        _ => return EbootKind::Unknown,
    };
    let offset = eboot.header().param_offset as u64;
    let block = match storage.read_at(path, offset, param_len as usize) {
        Ok(block) => block,
        Err(err) => {
            tracing::debug!("{path}: parameter block unreadable: {err}");
            return EbootKind::Unknown;
        }
    };
    let table = match SfoTable::parse(&block) {
        Ok(table) => table,
        Err(err) => {
            tracing::debug!("{path}: parameter block undecodable: {err}");
            return EbootKind::Unknown;
        }
    };

    match table.lookup_u16("CATEGORY") {
        Some(CAT_HOMEBREW) => EbootKind::Homebrew,
        Some(CAT_PSN) => EbootKind::StorePurchased,
        Some(CAT_PS1) => EbootKind::LegacyDisc,
        _ => EbootKind::Unknown,
    }
}

/// Candidate filenames probed under `<base_dir><app>`, in priority order.
/// The last two are update/DLC packages, only probed when asked for.
const CANDIDATE_SUFFIXES: [(&str, bool); 7] = [
    ("%/EBOOT.PBP", false), // 1.50 kernel homebrew
    ("/EBOOT.PBP", false),  // normal EBOOT
    ("/VBOOT.PBP", false),  // ARK EBOOT
    ("/FBOOT.PBP", false),  // TN CEF EBOOT
    ("/WMENU.BIN", false),  // VHBL loader
    ("/PBOOT.PBP", true),   // update package
    ("/PARAM.PBP", true),   // DLC package
];

/// Resolve an application name to a bootable file.
///
/// `app` may already be a full path, in which case it is returned as-is when
/// it exists. Otherwise the candidate filenames are probed in fixed priority
/// order and the first existing one wins. `None` means nothing bootable was
/// found, which is a normal outcome.
pub fn resolve_launch_path<S: Storage>(
    storage: &S,
    base_dir: &str,
    app: &str,
    scan_dlc: bool,
) -> Option<String> {
    if storage.exists(app) {
        return Some(app.to_string());
    }
    for (suffix, dlc_only) in CANDIDATE_SUFFIXES {
        if dlc_only && !scan_dlc {
            continue;
        }
        let candidate = format!("{base_dir}{app}{suffix}");
        if storage.exists(&candidate) {
            return Some(candidate);
        }
    }
    None
}
