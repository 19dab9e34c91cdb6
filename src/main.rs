//! arkbooter - command-line frontend.
//!
//! Works against a host directory where the console volumes are mounted
//! (`<root>/ms0/...`, `<root>/ef0/...`), the way a memory stick shows up when
//! plugged into a PC. Classification, launch planning and plugin list editing
//! all run here; the actual process-replacement boot call only exists on the
//! console, so `launch` is dry-run only.

use anyhow::{Context, Result, bail};
use arkbooter::{
    APP_NAME, DirStorage, Eboot, Launcher, PluginList, PluginState, Section, SettingsManager,
    VERSION, classify, resolve_launch_path,
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arkbooter", version, about = "EBOOT classification and plugin list management for the ARK custom firmware")]
struct Cli {
    /// Host directory the console volumes are mounted under (overrides the
    /// settings file)
    #[arg(long)]
    root: Option<Utf8PathBuf>,

    /// Directory holding arkbooter.yaml
    #[arg(long, default_value = "arkbooter-data")]
    config_dir: Utf8PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a packaged executable
    Classify { path: String },

    /// Show container metadata and section layout
    Info { path: String },

    /// Resolve an application name to a bootable file
    Resolve {
        /// Directory the application folders live under, e.g. ms0:/PSP/GAME/
        base_dir: String,
        /// Application folder name, or an already-resolved full path
        app: String,
        /// Also probe update and DLC packages
        #[arg(long)]
        dlc: bool,
    },

    /// Plan how a payload would be booted
    Launch {
        path: String,
        /// Print the plan instead of booting (the only mode on a host build)
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the merged plugin list
    Plugins {
        #[command(subcommand)]
        action: PluginAction,
    },
}

#[derive(Subcommand)]
enum PluginAction {
    /// List all entries with their indices
    List,
    /// Enable the entry at an index
    Enable { index: usize },
    /// Disable the entry at an index
    Disable { index: usize },
    /// Mark the entry at an index for removal on save
    Remove { index: usize },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = logging_guard(cli.debug)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let manager = SettingsManager::new(&cli.config_dir)?;
    let mut settings = manager.load_settings()?;
    if let Some(root) = cli.root {
        settings.mount_root = root.into_string();
    }
    let storage = DirStorage::new(settings.mount_root.as_str());

    match cli.command {
        Command::Classify { path } => {
            println!("{}", classify(&storage, &path));
        }

        Command::Info { path } => {
            let eboot = Eboot::open(&storage, &path)
                .with_context(|| format!("cannot open container {path}"))?;
            let info = eboot.sfo_info(&storage);
            println!("Title:   {}", info.title);
            if !info.disc_id.is_empty() {
                println!("Disc ID: {}", info.disc_id);
            }
            println!("Kind:    {}", classify(&storage, &path));
            for section in Section::ALL {
                match eboot.header().section_len(section) {
                    Some(len) => println!("{:<10} {len} bytes", section.name()),
                    None => println!("{:<10} (to end of file)", section.name()),
                }
            }
        }

        Command::Resolve { base_dir, app, dlc } => {
            match resolve_launch_path(&storage, &base_dir, &app, dlc) {
                Some(resolved) => println!("{resolved}"),
                None => bail!("no bootable file found for {app}"),
            }
        }

        Command::Launch { path, dry_run } => {
            let launcher = Launcher::new(&storage, &settings);
            let plan = launcher.plan(&path)?;
            if !dry_run {
                bail!("booting needs the on-console kernel environment; re-run with --dry-run");
            }
            println!("exec:     {}", plan.request.exec_path);
            println!("api type: {:#x}", plan.request.api_type);
            println!("key:      {}", plan.request.key);
            println!("argument: {}", plan.request.argument);
            if let Some(driver) = plan.disc_driver {
                println!("disc driver: {driver}");
            }
            if plan.clear_umd {
                println!("clears UMD association");
            }
            if let Some(module) = plan.compat_module {
                println!("compat module: {module}");
            }
        }

        Command::Plugins { action } => {
            let mut list = PluginList::load(&storage, &settings);
            match action {
                PluginAction::List => {
                    for (index, entry) in list.entries().iter().enumerate() {
                        let marker = match entry.state {
                            PluginState::On => "on ",
                            PluginState::Off => "off",
                            PluginState::Removed => "del",
                        };
                        if entry.is_structured() {
                            println!("{index:3} [{marker}] {}", entry.line);
                        } else {
                            println!("{index:3} [ - ] {}", entry.line);
                        }
                    }
                }
                PluginAction::Enable { index } => edit(&mut list, index, PluginState::On, &storage, &settings)?,
                PluginAction::Disable { index } => edit(&mut list, index, PluginState::Off, &storage, &settings)?,
                PluginAction::Remove { index } => edit(&mut list, index, PluginState::Removed, &storage, &settings)?,
            }
        }
    }

    Ok(())
}

fn edit(
    list: &mut PluginList,
    index: usize,
    state: PluginState,
    storage: &DirStorage,
    settings: &arkbooter::LauncherSettings,
) -> Result<()> {
    if !list.set_state(index, state) {
        bail!("no plugin entry at index {index} ({} entries)", list.len());
    }
    list.save(storage, settings);
    Ok(())
}

fn logging_guard(debug: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    arkbooter::logging::setup_logging("logs", "arkbooter", debug, false)
}
