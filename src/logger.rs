//! Session logger — one log file per launch in the OS data directory.
//!
//! The file is truncated at startup so it only holds the latest session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\HeritagePromo\heritagepromo.log`
//!   Linux:    `~/.local/share/HeritagePromo/heritagepromo.log`
//!   macOS:    `~/Library/Application Support/HeritagePromo/heritagepromo.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the
//! crate.  Before `init` (and in tests) lines are dropped.  With `--verbose`
//! the CLI also mirrors every line to stderr.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use time::OffsetDateTime;
use time::macros::format_description;

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static MIRROR_STDERR: AtomicBool = AtomicBool::new(false);

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Also print every log line to stderr.
pub fn set_mirror_stderr(enabled: bool) {
    MIRROR_STDERR.store(enabled, Ordering::Relaxed);
}

/// Write a line to the session log.  I/O errors are ignored.
pub fn write_line(line: &str) {
    if MIRROR_STDERR.load(Ordering::Relaxed) {
        eprintln!("{line}");
    }
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Write a timestamped, level-tagged line to the session log.
pub fn write(level: &str, msg: &str) {
    write_line(&format!("[{}] [{}] {}", timestamp(), level, msg));
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*))
    };
}

/// Initialise the session logger: create or truncate the file, write the
/// session header and mirror panics into the log.
pub fn init() {
    let path = data_dir().join("HeritagePromo").join("heritagepromo.log");

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new().create(true).write(true).truncate(true).open(&path);
    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!("=== HeritagePromo {} session started {} ===", env!("CARGO_PKG_VERSION"), human_timestamp()));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `HH:MM:SS.mmm` for log lines.
fn timestamp() -> String {
    let fmt = format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    now().format(&fmt).unwrap_or_else(|_| "??:??:??".to_string())
}

/// Full date-time for the session header.
fn human_timestamp() -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]");
    now().format(&fmt).unwrap_or_else(|_| "(unknown time)".to_string())
}
