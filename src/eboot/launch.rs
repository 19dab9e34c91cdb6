//! Launch dispatch: turning a classified container into a boot request.
//!
//! The firmware's load-exec primitive replaces the calling process, so a
//! launch is planned first ([`LaunchPlan`], inspectable and testable) and then
//! applied against a [`BootEnv`] implementation. `load_exec` never returns on
//! success; observing a return value at all is the anomaly.

use super::classify::{EbootKind, classify};
use super::ELF_MAGIC;
use crate::models::LauncherSettings;
use crate::storage::{Storage, Volume, volume_of};
use std::convert::Infallible;
use thiserror::Error;

// Load-exec API types (run levels), one pair per strategy: the plain value
// boots from the memory stick, the GO variant from internal flash.
pub const HOMEBREW_RUNLEVEL: u32 = 0x141;
pub const HOMEBREW_RUNLEVEL_GO: u32 = 0x152;
pub const ISO_RUNLEVEL: u32 = 0x123;
pub const ISO_RUNLEVEL_GO: u32 = 0x125;
pub const ISO_PBOOT_RUNLEVEL: u32 = 0x124;
pub const ISO_PBOOT_RUNLEVEL_GO: u32 = 0x126;
pub const POPS_RUNLEVEL: u32 = 0x144;
pub const POPS_RUNLEVEL_GO: u32 = 0x155;
pub const UPDATER_RUNLEVEL: u32 = 0x121;

/// Disc-emulation driver forced for store-purchased titles.
pub const PSN_DRIVER: u32 = 1;

/// Default executable inside an emulated disc image.
const DISC_EBOOT_BIN: &str = "disc0:/PSP_GAME/SYSDIR/EBOOT.BIN";

#[derive(Debug, Error)]
pub enum LaunchError {
    /// True `Unknown` classifications are never auto-launched; the invoking
    /// UI decides what to tell the user.
    #[error("{path}: unrecognized payload, refusing to launch")]
    Unclassified { path: String },

    /// The load-exec primitive came back instead of replacing the process.
    #[error("load-exec returned with status {status:#x}")]
    ExecReturned { status: i32 },
}

/// One invocation of the process-replacement primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Run level / API type tag.
    pub api_type: u32,
    /// Target path handed to the kernel.
    pub exec_path: String,
    /// Argument blob (always a single path here).
    pub argument: String,
    /// Context key (`"game"`, `"umdemu"`, `"pops"`, `"updater"`).
    pub key: &'static str,
}

/// Everything that has to happen, in order, to boot a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Disc-emulation driver to force before the exec call.
    pub disc_driver: Option<u32>,
    /// Clear any lingering UMD image association first.
    pub clear_umd: bool,
    /// Compatibility module to load and start, best effort.
    pub compat_module: Option<String>,
    pub request: LaunchRequest,
}

/// The boot environment collaborator: the firmware services a launch needs.
///
/// On the console this is backed by kernel syscalls; tests mock it.
#[cfg_attr(test, mockall::automock)]
pub trait BootEnv {
    /// Process-replacement primitive. Does not return on success; the error
    /// carries the status code if the kernel hands control back.
    fn load_exec(&mut self, request: &LaunchRequest) -> Result<Infallible, LaunchError>;

    /// Select the disc-emulation driver configuration.
    fn set_disc_driver(&mut self, index: u32);

    /// Drop any UMD image association left over from a previous title.
    fn clear_umd_file(&mut self);

    /// Load and start a kernel module. Callers treat failure as best-effort.
    fn load_start_module(&mut self, path: &str) -> Result<(), i32>;
}

/// Launch context: storage plus settings, passed explicitly instead of the
/// process-wide globals the firmware menus use.
pub struct Launcher<'a, S> {
    storage: &'a S,
    settings: &'a LauncherSettings,
}

impl<'a, S: Storage> Launcher<'a, S> {
    pub fn new(storage: &'a S, settings: &'a LauncherSettings) -> Self {
        Self { storage, settings }
    }

    /// Work out how `path` would be booted, without side effects.
    ///
    /// A file starting with the raw-executable signature skips classification
    /// entirely: a plain executable is always homebrew.
    pub fn plan(&self, path: &str) -> Result<LaunchPlan, LaunchError> {
        if self.storage.magic_u32(path) == Some(ELF_MAGIC) {
            return Ok(self.plan_homebrew(path));
        }
        match classify(self.storage, path) {
            EbootKind::Homebrew => Ok(self.plan_homebrew(path)),
            EbootKind::StorePurchased => Ok(self.plan_store(path)),
            EbootKind::LegacyDisc => Ok(self.plan_legacy_disc(path)),
            EbootKind::Updater => Ok(plan_updater(path)),
            EbootKind::Unknown => Err(LaunchError::Unclassified {
                path: path.to_string(),
            }),
        }
    }

    /// Plan and boot. Terminal on success: the kernel tears this process down
    /// as part of the context switch, so `Ok` is uninhabited.
    pub fn execute<B: BootEnv>(&self, boot: &mut B, path: &str) -> Result<Infallible, LaunchError> {
        let plan = self.plan(path)?;
        tracing::info!(
            "launching {} (api_type {:#x}, key {})",
            plan.request.exec_path,
            plan.request.api_type,
            plan.request.key
        );
        if let Some(driver) = plan.disc_driver {
            boot.set_disc_driver(driver);
        }
        if plan.clear_umd {
            boot.clear_umd_file();
        }
        if let Some(module) = &plan.compat_module {
            if let Err(status) = boot.load_start_module(module) {
                tracing::warn!("compatibility module {module} failed to start ({status:#x}), continuing");
            }
        }
        boot.load_exec(&plan.request)
    }

    fn plan_homebrew(&self, path: &str) -> LaunchPlan {
        let api_type = if volume_of(path) == Volume::Ef0 && self.settings.redirect_ms0 {
            HOMEBREW_RUNLEVEL_GO
        } else {
            HOMEBREW_RUNLEVEL
        };

        // Very old homebrew used a '%' directory-name marker; the kernel
        // expects it gone from the boot path.
        let boot_path = path.replacen('%', "", 1);

        let compat_module = if boot_path.starts_with("ms0:/PSP/GAME150/") {
            Some(format!("{}/150/reboot150.prx", self.settings.dc_path))
        } else {
            None
        };

        LaunchPlan {
            disc_driver: None,
            clear_umd: false,
            compat_module,
            request: LaunchRequest {
                api_type,
                exec_path: boot_path.clone(),
                argument: boot_path,
                key: "game",
            },
        }
    }

    fn plan_store(&self, path: &str) -> LaunchPlan {
        let on_ef0 = volume_of(path) == Volume::Ef0;
        // Store titles always go through disc emulation, regardless of origin.
        let mut api_type = if on_ef0 { ISO_RUNLEVEL_GO } else { ISO_RUNLEVEL };
        let mut argument = DISC_EBOOT_BIN.to_string();

        // A sibling PBOOT.PBP carries a custom boot and replaces the argument.
        let pboot = sibling_path(path, "PBOOT.PBP");
        if self.storage.exists(&pboot) {
            api_type = if on_ef0 {
                ISO_PBOOT_RUNLEVEL_GO
            } else {
                ISO_PBOOT_RUNLEVEL
            };
            argument = pboot;
        }

        LaunchPlan {
            disc_driver: Some(PSN_DRIVER),
            clear_umd: true,
            compat_module: None,
            request: LaunchRequest {
                api_type,
                exec_path: path.to_string(),
                argument,
                key: "umdemu",
            },
        }
    }

    fn plan_legacy_disc(&self, path: &str) -> LaunchPlan {
        let api_type = if volume_of(path) == Volume::Ef0 {
            POPS_RUNLEVEL_GO
        } else {
            POPS_RUNLEVEL
        };
        LaunchPlan {
            disc_driver: None,
            clear_umd: false,
            compat_module: None,
            request: LaunchRequest {
                api_type,
                exec_path: path.to_string(),
                argument: path.to_string(),
                key: "pops",
            },
        }
    }
}

fn plan_updater(path: &str) -> LaunchPlan {
    LaunchPlan {
        disc_driver: None,
        clear_umd: false,
        compat_module: None,
        request: LaunchRequest {
            api_type: UPDATER_RUNLEVEL,
            exec_path: path.to_string(),
            argument: path.to_string(),
            key: "updater",
        },
    }
}

/// Replace the file name of a console path.
fn sibling_path(path: &str, file_name: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{file_name}"),
        None => file_name.to_string(),
    }
}
