//! Engine logging bootstrap.
//!
//! # Responsibility
//! - Start rolling file logs once per process from `LoggingSettings`.
//! - Capture panics as structured `event=panic_captured` records.
//!
//! # Invariants
//! - Initialization never panics and is idempotent for an identical target.
//! - A running logger is never re-pointed to another directory, level or
//!   rotation policy.
//! - Log records carry paths, counts and error text, never note bodies.

use crate::config::LoggingSettings;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "worldengine";
const BYTES_PER_MIB: u64 = 1024 * 1024;
pub(crate) const DEFAULT_MAX_FILE_MIB: u64 = 10;
pub(crate) const DEFAULT_KEEP_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Size-based rotation: roll at `max_bytes`, keep `keep_files` old files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rotation {
    max_bytes: u64,
    keep_files: usize,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_FILE_MIB * BYTES_PER_MIB,
            keep_files: DEFAULT_KEEP_FILES,
        }
    }
}

/// Normalized logging destination.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LevelFilter,
    dir: PathBuf,
    rotation: Rotation,
}

impl LogTarget {
    fn parse(level: &str, log_dir: &str, rotation: Rotation) -> Result<Self, String> {
        Ok(Self {
            level: parse_level(level)?,
            dir: parse_log_dir(log_dir)?,
            rotation,
        })
    }

    fn from_settings(settings: &LoggingSettings, log_dir: &str) -> Result<Self, String> {
        if settings.max_file_mib == 0 || settings.keep_files == 0 {
            return Err("log rotation needs a non-zero file size and file count".to_string());
        }
        let rotation = Rotation {
            max_bytes: settings.max_file_mib.saturating_mul(BYTES_PER_MIB),
            keep_files: settings.keep_files,
        };
        Self::parse(&settings.level, log_dir, rotation)
    }

    fn conflict_with(&self, active: &LogTarget) -> Option<String> {
        if self.dir != active.dir {
            return Some(format!(
                "logging already writes to `{}`; refusing to switch to `{}`",
                active.dir.display(),
                self.dir.display()
            ));
        }
        if self.level != active.level {
            return Some(format!(
                "logging already runs at `{}`; refusing to switch to `{}`",
                active.level, self.level
            ));
        }
        if self.rotation != active.rotation {
            return Some(format!(
                "logging already rotates at {} bytes keeping {} files; refusing to change",
                active.rotation.max_bytes, active.rotation.keep_files
            ));
        }
        None
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`,
/// with the default rotation policy.
///
/// # Errors
/// - Unknown level, or a blank or relative directory.
/// - A logger is already running with a different target.
/// - The directory cannot be created or the backend fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    activate(LogTarget::parse(level, log_dir, Rotation::default())?)
}

/// Starts logging from engine settings.
///
/// Returns `Ok(false)` without touching the logger when no directory is
/// configured.
pub fn init_from_settings(settings: &LoggingSettings) -> Result<bool, String> {
    let Some(dir) = settings.dir.as_deref() else {
        return Ok(false);
    };
    activate(LogTarget::from_settings(settings, dir)?).map(|()| true)
}

/// `(level, directory)` of the running logger, if any.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.target.level, active.target.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Accepts the `log` level names plus `warning`, in any case.
pub(crate) fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let normalized = level.trim().to_ascii_lowercase();
    let name = if normalized == "warning" {
        "warn"
    } else {
        normalized.as_str()
    };
    name.parse::<LevelFilter>().map_err(|_| {
        format!("unsupported log level `{normalized}`; expected off|error|warn|info|debug|trace")
    })
}

fn activate(target: LogTarget) -> Result<(), String> {
    let active = match ACTIVE_LOGGER.get() {
        Some(active) => active,
        None => ACTIVE_LOGGER.get_or_try_init(|| start_logger(target.clone()))?,
    };
    match target.conflict_with(&active.target) {
        Some(conflict) => Err(conflict),
        None => Ok(()),
    }
}

fn start_logger(target: LogTarget) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&target.dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            target.dir.display()
        )
    })?;

    let spec = LogSpecification::builder().default(target.level).build();
    let handle = Logger::with(spec)
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(target.rotation.max_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(target.rotation.keep_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=engine_logging module=logging status=ok platform={} version={} level={} log_dir={} rotate_bytes={} keep_files={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        target.level,
        target.dir.display(),
        target.rotation.max_bytes,
        target.rotation.keep_files
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(log_dir.trim());
    if path.as_os_str().is_empty() {
        return Err("log directory cannot be empty".to_string());
    }
    if path.is_relative() {
        return Err(format!(
            "log directory must be absolute, got `{}`",
            path.display()
        ));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        let thread = std::thread::current();
        error!(
            "event=panic_captured module=logging status=error thread={} location={} payload={}",
            thread.name().unwrap_or("unnamed"),
            location,
            single_line(message, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

/// Collapses line breaks and caps length at `max_chars`.
fn single_line(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars().map(|ch| match ch {
        '\n' | '\r' => ' ',
        other => other,
    });
    let mut capped = chars.by_ref().take(max_chars).collect::<String>();
    if chars.next().is_some() {
        capped.push_str("...");
    }
    capped
}
