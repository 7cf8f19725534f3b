//! Debug logging behind the `log` facade.
//!
//! Disabled by default; the CLI enables it with `--log` (file) or
//! `--log-stdout`. Kept deliberately simple: one global sink guarded by a
//! mutex, no timestamps fancier than local time.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;

struct ChronicleLogger;

#[derive(Default)]
struct Sink {
    enabled: bool,
    to_stdout: bool,
    file: Option<std::fs::File>,
}

static LOGGER: ChronicleLogger = ChronicleLogger;
static SINK: Lazy<Mutex<Sink>> = Lazy::new(|| Mutex::new(Sink::default()));

impl log::Log for ChronicleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        SINK.lock().enabled && metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let message = format!("{} {} - {}\n", timestamp, record.level(), record.args());

        let mut sink = SINK.lock();
        if let Some(file) = sink.file.as_mut() {
            let _ = file.write_all(message.as_bytes());
            let _ = file.flush();
        }
        if sink.to_stdout {
            print!("{message}");
        }
    }

    fn flush(&self) {}
}

pub fn init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Debug))
}

pub fn enable_logging() {
    SINK.lock().enabled = true;
}

pub fn disable_logging() {
    SINK.lock().enabled = false;
}

pub fn set_log_file(file_path: &str) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    SINK.lock().file = Some(file);
    Ok(())
}

pub fn set_log_to_stdout(enabled: bool) {
    SINK.lock().to_stdout = enabled;
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}
