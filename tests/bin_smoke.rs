use clap::{CommandFactory, Parser};
use inkstat::{
    app::{App, AppConfig, LogLevel},
    cli::RunOptions,
    config::Config,
    display::Rotation,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
    sync::{Mutex, OnceLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn temp_home() -> PathBuf {
    let mut dir = env::temp_dir();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_micros();
    dir.push(format!("inkstat_test_home_{stamp}"));
    dir
}

fn with_temp_home<F: FnOnce(&Path)>(f: F) {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let original_home = env::var_os("HOME");
    let home = temp_home();
    fs::create_dir_all(&home).expect("failed to create temp HOME");
    env::set_var("HOME", &home);
    f(&home);
    if let Some(val) = original_home {
        env::set_var("HOME", val);
    } else {
        env::remove_var("HOME");
    }
    let _ = fs::remove_dir_all(home);
}

fn write_config(home: &Path, contents: &str) -> PathBuf {
    let cfg_dir = home.join(".inkstat");
    fs::create_dir_all(&cfg_dir).expect("failed to create config dir");
    let path = cfg_dir.join("config.toml");
    fs::write(&path, contents).expect("failed to write config");
    path
}

#[test]
fn first_run_writes_default_config() {
    with_temp_home(|home| {
        let cfg = Config::load_or_default().expect("config load failed");
        assert_eq!(cfg, Config::default());
        let written = home.join(".inkstat/config.toml");
        assert!(written.exists(), "default config was not written");
        let reloaded = Config::load_from_path(&written).expect("written config must parse");
        assert_eq!(reloaded, cfg);
    });
}

#[test]
fn config_file_values_reach_app_config() {
    with_temp_home(|home| {
        write_config(
            home,
            r#"
refresh_rate = "2s"
full_update_interval = "5m"
rotate = false
log_level = "warn"
        "#,
        );
        let cfg = Config::load_or_default().expect("config load failed");
        let merged = AppConfig::from_sources(cfg, RunOptions::default()).unwrap();
        assert_eq!(merged.refresh_rate, Duration::from_secs(2));
        assert_eq!(merged.full_update_interval, Duration::from_secs(300));
        assert_eq!(merged.rotation, Rotation::Upright);
        assert_eq!(merged.log_level, LogLevel::Warn);
    });
}

#[test]
fn cli_overrides_config_file() {
    with_temp_home(|home| {
        let path = write_config(home, "refresh_rate = \"2s\"\n");
        let opts = RunOptions::try_parse_from([
            "inkstat",
            "--config",
            path.to_str().unwrap(),
            "--refresh-rate",
            "750ms",
        ])
        .unwrap();
        let app = App::from_options(opts).expect("app config");
        assert_eq!(app.config().refresh_rate, Duration::from_millis(750));
    });
}

#[test]
fn rejects_unknown_config_keys() {
    with_temp_home(|home| {
        write_config(home, "device = \"/dev/ttyUSB0\"\n");
        let err = App::from_options(RunOptions::default())
            .err()
            .expect("expected unknown key to be rejected");
        assert!(
            format!("{err}").contains("device"),
            "error did not name the key: {err}"
        );
    });
}

#[test]
fn help_lists_core_flags() {
    let help = RunOptions::command().render_help().to_string();
    for flag in [
        "--config",
        "--refresh-rate",
        "--full-update-interval",
        "--no-rotate",
        "--once",
        "--dry-run",
    ] {
        assert!(help.contains(flag), "help output missing flag {flag}: {help}");
    }
}

#[test]
fn dry_run_renders_one_frame_and_exits_cleanly() {
    with_temp_home(|home| {
        let thermal = home.join("temp");
        fs::write(&thermal, "47000\n").expect("failed to write thermal file");
        let config = write_config(
            home,
            &format!("thermal_zone = \"{}\"\n", thermal.display()),
        );
        let output = Command::new(env!("CARGO_BIN_EXE_inkstat"))
            .args(["--dry-run", "--once", "--config"])
            .arg(&config)
            .env("HOME", home)
            .env("INKSTAT_LOG_LEVEL", "debug")
            .output()
            .expect("failed to spawn inkstat");
        assert!(
            output.status.success(),
            "inkstat failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("SingleShot"), "unexpected log: {stderr}");
    });
}

#[test]
fn missing_thermal_zone_fails_with_exit_code() {
    with_temp_home(|home| {
        let config = write_config(
            home,
            &format!(
                "thermal_zone = \"{}\"\n",
                home.join("no-such-zone").display()
            ),
        );
        let output = Command::new(env!("CARGO_BIN_EXE_inkstat"))
            .args(["--dry-run", "--once", "--config"])
            .arg(&config)
            .env("HOME", home)
            .output()
            .expect("failed to spawn inkstat");
        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("error: io error"), "unexpected stderr: {stderr}");
    });
}
