use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::path::Path;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "placement.log";
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Installs the global logger: colored lines on stderr and plain lines in
/// `logs/placement.log`.
///
/// Call once, before the control plane is built. The filter is `level` when
/// given, else `RUST_LOG`, else `info`, e.g.
/// `RUST_LOG=debug backhaul-placement run -c config.json`.
///
/// An unwritable log directory is reported and the logger keeps the
/// console output only.
pub fn init(level: Option<LevelFilter>) {
    let filter = level.or_else(level_from_env).unwrap_or(LevelFilter::Info);
    let log_path = Path::new(LOG_DIR).join(LOG_FILE);

    let mut root = Dispatch::new().level(filter).level_for("tokio", LevelFilter::Warn).level_for("mio", LevelFilter::Warn).chain(console());

    match file(&log_path) {
        Ok(file_dispatch) => root = root.chain(file_dispatch),
        Err(e) => eprintln!("Cannot log to '{}': {}. Continuing with console output only.", log_path.display(), e),
    }

    if let Err(e) = root.apply() {
        eprintln!("Logger already installed: {}", e);
        return;
    }

    log::info!("Logging at level {} to stderr and '{}'.", filter, log_path.display());
}

fn level_from_env() -> Option<LevelFilter> {
    std::env::var("RUST_LOG").ok()?.parse().ok()
}

fn console() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("[{} {:>5} {}] {}", Local::now().format(TIMESTAMP), colors.color(record.level()), record.target(), message))
        })
        .chain(std::io::stderr())
}

fn file(path: &Path) -> std::io::Result<Dispatch> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    Ok(Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{} {:<5} {} {}", Local::now().format(TIMESTAMP), record.level(), record.target(), message))
        })
        .chain(fern::log_file(path)?))
}
