use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum LogFile {
    Debug,
    Error,
    Session,
}

struct Logger {
    files: Mutex<BTreeMap<LogFile, File>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn init(root: &Path) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;

    let mut files = BTreeMap::new();
    for (log_file, name) in [
        (LogFile::Debug, "debug.log"),
        (LogFile::Error, "error.log"),
        (LogFile::Session, "session.log"),
    ] {
        let path = log_dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("open log {} failed: {}", name, err))?;
        files.insert(log_file, file);
    }

    LOGGER
        .set(Logger {
            files: Mutex::new(files),
        })
        .map_err(|_| "log system already initialized".to_string())?;
    Ok(())
}

pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn log_error(message: &str) {
    log_timestamped(LogFile::Error, message);
}

pub fn log_session(message: &str) {
    log_timestamped(LogFile::Session, message);
}

/// Debug lines are dropped unless enabled, so callers can log freely on
/// per-login paths.
pub fn log_debug(message: &str) {
    if DEBUG_ENABLED.load(Ordering::Relaxed) {
        log_timestamped(LogFile::Debug, message);
    }
}

fn log_timestamped(log_file: LogFile, message: &str) {
    if let Some(logger) = LOGGER.get() {
        let timestamp = format_timestamp();
        let line = format!("{timestamp}: {message}\n");
        let _ = write_line(logger, log_file, &line);
    }
}

fn write_line(logger: &Logger, log_file: LogFile, line: &str) -> std::io::Result<()> {
    let mut files = logger
        .files
        .lock()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log lock poisoned"))?;
    if let Some(file) = files.get_mut(&log_file) {
        file.write_all(line.as_bytes())?;
        file.flush()?;
    }
    Ok(())
}

fn format_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let days = secs / 86_400;
    let seconds_of_day = (secs % 86_400) as u32;
    let hour = seconds_of_day / 3_600;
    let minute = (seconds_of_day % 3_600) / 60;
    let second = seconds_of_day % 60;
    let (year, month, day) = civil_from_days(days);
    format!("{day:02}.{month:02}.{year} {hour:02}:{minute:02}:{second:02}")
}

fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    let year = (y + if m <= 2 { 1 } else { 0 }) as i32;
    (year, m as u32, d as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_from_days_epoch() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }

    #[test]
    fn logging_before_init_never_panics() {
        log_error("no logger yet");
        log_debug("no logger yet");
        log_session("no logger yet");
    }
}
