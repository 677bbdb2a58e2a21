use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub mod loader;

pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_secs(1);
pub const DEFAULT_FULL_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_GAUGE_ADDRESS: u8 = 0x62;
pub const DEFAULT_CHARGE_PIN: u8 = 4;
pub const DEFAULT_DISK_MOUNT: &str = "/";
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR_NAME: &str = ".inkstat";
const CONFIG_FILE_NAME: &str = "config.toml";

const MIN_REFRESH_RATE: Duration = Duration::from_millis(100);
const MAX_REFRESH_RATE: Duration = Duration::from_secs(3600);
const MAX_BCM_PIN: u8 = 27;

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(with = "duration_str")]
    pub refresh_rate: Duration,
    #[serde(with = "duration_str")]
    pub full_update_interval: Duration,
    pub rotate: bool,
    pub i2c_bus: u8,
    pub gauge_address: u8,
    pub charge_pin: u8,
    pub disk_mount: PathBuf,
    pub thermal_zone: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_rate: DEFAULT_REFRESH_RATE,
            full_update_interval: DEFAULT_FULL_UPDATE_INTERVAL,
            rotate: true,
            i2c_bus: DEFAULT_I2C_BUS,
            gauge_address: DEFAULT_GAUGE_ADDRESS,
            charge_pin: DEFAULT_CHARGE_PIN,
            disk_mount: PathBuf::from(DEFAULT_DISK_MOUNT),
            thermal_zone: PathBuf::from(DEFAULT_THERMAL_ZONE),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.refresh_rate < MIN_REFRESH_RATE || cfg.refresh_rate > MAX_REFRESH_RATE {
        return Err(Error::Config(format!(
            "refresh_rate must be between {} and {}",
            humantime::format_duration(MIN_REFRESH_RATE),
            humantime::format_duration(MAX_REFRESH_RATE)
        )));
    }
    if cfg.full_update_interval < cfg.refresh_rate {
        return Err(Error::Config(
            "full_update_interval must not be shorter than refresh_rate".into(),
        ));
    }
    if cfg.charge_pin > MAX_BCM_PIN {
        return Err(Error::Config(format!(
            "charge_pin must be a BCM pin number between 0 and {MAX_BCM_PIN}"
        )));
    }
    if !(0x03..=0x77).contains(&cfg.gauge_address) {
        return Err(Error::Config(
            "gauge_address must be a 7-bit I2C address (0x03-0x77)".into(),
        ));
    }
    if cfg.log_level.parse::<crate::app::LogLevel>().is_err() {
        return Err(Error::Config(format!(
            "log_level '{}' is not one of error, warn, info, debug, trace",
            cfg.log_level
        )));
    }
    Ok(())
}

/// Durations are stored as human-readable strings ("1s", "1m 30s").
mod duration_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}
