use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with a daily-rotating file appender and optional console
/// output.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for log files (e.g., "arkbooter")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to the console
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging
/// active
pub fn setup_logging(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if console_output {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}",
        log_dir,
        log_prefix,
        debug_mode
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_directory_created() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");

        // Only setup once per process; a second init in another test would
        // fail, so this test tolerates an Err as long as the directory exists.
        let _ = setup_logging(log_dir.to_str().unwrap(), "test", false, false);
        assert!(log_dir.exists());
    }
}
