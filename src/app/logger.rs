use std::io::Write;
use std::str::FromStr;

use crate::{Error, Result};

/// Environment variable that overrides the configured level.
pub const LOG_LEVEL_ENV: &str = "INKSTAT_LOG_LEVEL";
const SYSLOG_IDENT: &str = "inkstat";

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// A valid environment override wins over the configured level.
pub fn effective_level(configured: LogLevel, env_value: Option<&str>) -> LogLevel {
    env_value
        .and_then(|raw| LogLevel::from_str(raw).ok())
        .unwrap_or(configured)
}

/// Install the process-wide logger: stderr by default, syslog for service runs.
pub fn init(level: LogLevel, use_syslog: bool) -> Result<()> {
    let env_value = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = log::LevelFilter::from(effective_level(level, env_value.as_deref()));

    if use_syslog {
        return syslog::init(syslog::Facility::LOG_DAEMON, filter, Some(SYSLOG_IDENT))
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())));
    }

    env_logger::Builder::new()
        .filter_level(filter)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}
