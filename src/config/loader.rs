use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(&path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
    fs::write(path, format!("# inkstat config\n{body}"))?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(raw).map_err(|e| Error::Config(e.message().to_string()))?;
    super::validate(&cfg)?;
    Ok(cfg)
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::InvalidArgs("HOME not set; cannot locate config directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn loads_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let cfg = load_from_path(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_valid_config() {
        let contents = r#"
            refresh_rate = "2s"
            full_update_interval = "5m"
            rotate = false
            i2c_bus = 3
            gauge_address = 99
            charge_pin = 17
            disk_mount = "/boot"
            thermal_zone = "/tmp/temp"
            log_level = "debug"
        "#;
        let cfg = parse(contents).unwrap();
        assert_eq!(cfg.refresh_rate, Duration::from_secs(2));
        assert_eq!(cfg.full_update_interval, Duration::from_secs(300));
        assert!(!cfg.rotate);
        assert_eq!(cfg.i2c_bus, 3);
        assert_eq!(cfg.gauge_address, 0x63);
        assert_eq!(cfg.charge_pin, 17);
        assert_eq!(cfg.disk_mount, PathBuf::from("/boot"));
        assert_eq!(cfg.thermal_zone, PathBuf::from("/tmp/temp"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = parse("rotate = false").unwrap();
        assert!(!cfg.rotate);
        assert_eq!(cfg.refresh_rate, super::super::DEFAULT_REFRESH_RATE);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse("nope = 1").unwrap_err();
        assert!(format!("{err}").contains("unknown field"));
    }

    #[test]
    fn rejects_unparseable_duration() {
        let err = parse("refresh_rate = \"whenever\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn saves_and_loads_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            refresh_rate: Duration::from_millis(1500),
            full_update_interval: Duration::from_secs(90),
            rotate: false,
            charge_pin: 22,
            ..Config::default()
        };
        cfg.save_to_path(&path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn load_or_default_creates_file_with_defaults() {
        let home = TempDir::new().unwrap();
        std::env::set_var("HOME", home.path());
        let cfg_path = home.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        let cfg = load_or_default().unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg_path.exists(), "expected config file to be created");

        let contents = fs::read_to_string(&cfg_path).unwrap();
        assert!(contents.contains("refresh_rate ="));
        assert!(contents.contains("full_update_interval ="));
    }
}
