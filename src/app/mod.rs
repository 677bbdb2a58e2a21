use crate::{
    cli::RunOptions,
    config::{self, Config},
    display::Rotation,
    gauge::Gauge,
    panel::{self, Panel},
    telemetry::{DeviceIdentity, SystemSampler},
    Result,
};
use std::{path::PathBuf, str::FromStr, time::Duration};

pub mod control_loop;
pub mod input;
pub mod lifecycle;
pub mod logger;
pub mod power;
pub mod refresh;

use control_loop::{ControlLoop, LoopExit, RenderContext};
use input::{ChargeInput, ChargePin, NoChargeInput};
use lifecycle::create_shutdown_flag;
pub use logger::LogLevel;
use refresh::RefreshScheduler;

/// Config for the daemon: the config file with CLI overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub refresh_rate: Duration,
    pub full_update_interval: Duration,
    pub rotation: Rotation,
    pub i2c_bus: u8,
    pub gauge_address: u8,
    pub charge_pin: u8,
    pub disk_mount: PathBuf,
    pub thermal_zone: PathBuf,
    pub log_level: LogLevel,
    pub syslog: bool,
    pub once: bool,
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_rate: config::DEFAULT_REFRESH_RATE,
            full_update_interval: config::DEFAULT_FULL_UPDATE_INTERVAL,
            rotation: Rotation::Flipped,
            i2c_bus: config::DEFAULT_I2C_BUS,
            gauge_address: config::DEFAULT_GAUGE_ADDRESS,
            charge_pin: config::DEFAULT_CHARGE_PIN,
            disk_mount: PathBuf::from(config::DEFAULT_DISK_MOUNT),
            thermal_zone: PathBuf::from(config::DEFAULT_THERMAL_ZONE),
            log_level: LogLevel::default(),
            syslog: false,
            once: false,
            dry_run: false,
        }
    }
}

impl AppConfig {
    /// Apply CLI overrides on top of the file and re-validate the result.
    pub fn from_sources(mut config: Config, opts: RunOptions) -> Result<Self> {
        if let Some(rate) = opts.refresh_rate {
            config.refresh_rate = rate;
        }
        if let Some(interval) = opts.full_update_interval {
            config.full_update_interval = interval;
        }
        if opts.no_rotate {
            config.rotate = false;
        }
        if let Some(level) = opts.log_level {
            config.log_level = level;
        }
        config::validate(&config)?;

        Ok(Self {
            refresh_rate: config.refresh_rate,
            full_update_interval: config.full_update_interval,
            rotation: if config.rotate {
                Rotation::Flipped
            } else {
                Rotation::Upright
            },
            i2c_bus: config.i2c_bus,
            gauge_address: config.gauge_address,
            charge_pin: config.charge_pin,
            disk_mount: config.disk_mount,
            thermal_zone: config.thermal_zone,
            log_level: LogLevel::from_str(&config.log_level).unwrap_or_default(),
            syslog: opts.syslog,
            once: opts.once,
            dry_run: opts.dry_run,
        })
    }
}

pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = match &opts.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load_or_default()?,
        };
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Ok(Self::new(merged))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon. Probe the hardware, run the loop, and
    /// always blank the panel on the way out.
    pub fn run(&self) -> Result<()> {
        let config = &self.config;
        logger::init(config.log_level, config.syslog)?;
        log::info!(
            "inkstat start (refresh_rate={}, full_update_interval={}, rotation={:?}, dry_run={})",
            humantime::format_duration(config.refresh_rate),
            humantime::format_duration(config.full_update_interval),
            config.rotation,
            config.dry_run
        );

        let running = create_shutdown_flag()?;
        let (gauge, charge) = self.open_power_inputs()?;

        let mut panel = panel::open(config.dry_run)?;
        if let Err(err) = panel.init().and_then(|()| panel.clear(0xFF)) {
            panel.power_down(true);
            return Err(err);
        }

        let identity = DeviceIdentity::discover();
        log::info!(
            "{} at {} ({})",
            identity.host,
            identity.ip,
            identity.model
        );
        let ctx = RenderContext::new(
            panel,
            &identity,
            RefreshScheduler::new(config.full_update_interval),
            config.rotation,
        )
        .with_power_inputs(gauge, charge);
        let sampler = SystemSampler::new(&config.disk_mount, &config.thermal_zone);
        let mut control = ControlLoop::new(ctx, sampler, config.refresh_rate);

        let outcome = control.run(&running, config.once);
        match &outcome {
            Ok(LoopExit::BatteryExhausted) => log::warn!("battery exhausted, blanking panel"),
            Ok(exit) => log::info!("loop finished: {exit:?}"),
            Err(err) => log::error!("loop failed: {err}"),
        }
        let shutdown = control.shutdown();
        outcome?;
        shutdown
    }

    /// Gauge and charge line, or neither when no UPS HAT answers.
    fn open_power_inputs(&self) -> Result<(Option<Box<dyn Gauge>>, Box<dyn ChargeInput>)> {
        if self.config.dry_run {
            return Ok((None, Box::new(NoChargeInput)));
        }
        match probe_gauge(self.config.i2c_bus, self.config.gauge_address)? {
            Some(gauge) => {
                let charge = ChargePin::new(self.config.charge_pin)?;
                Ok((Some(gauge), Box::new(charge)))
            }
            None => Ok((None, Box::new(NoChargeInput))),
        }
    }
}

#[cfg(target_os = "linux")]
fn probe_gauge(bus: u8, address: u8) -> Result<Option<Box<dyn Gauge>>> {
    use crate::gauge::{Cw2015, GaugeProbeResult, RppalGaugeBus};

    let i2c = RppalGaugeBus::open(bus, address)?;
    match Cw2015::probe(i2c) {
        GaugeProbeResult::Present(gauge) => {
            log::info!("UPS gauge found at 0x{address:02x} on i2c-{bus}");
            Ok(Some(Box::new(gauge)))
        }
        GaugeProbeResult::Absent(err) => {
            log::warn!("no UPS gauge at 0x{address:02x} on i2c-{bus} ({err}); battery hidden");
            Ok(None)
        }
        GaugeProbeResult::Fatal(err) => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
fn probe_gauge(_bus: u8, _address: u8) -> Result<Option<Box<dyn Gauge>>> {
    log::warn!("UPS gauge unsupported on this platform; battery hidden");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn defaults_match_config_file_defaults() {
        let merged = AppConfig::from_sources(Config::default(), RunOptions::default()).unwrap();
        assert_eq!(merged, AppConfig::default());
    }

    #[test]
    fn cli_overrides_file() {
        let opts = RunOptions {
            refresh_rate: Some(Duration::from_millis(500)),
            full_update_interval: Some(Duration::from_secs(120)),
            no_rotate: true,
            log_level: Some("debug".into()),
            once: true,
            dry_run: true,
            ..RunOptions::default()
        };
        let merged = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(merged.refresh_rate, Duration::from_millis(500));
        assert_eq!(merged.full_update_interval, Duration::from_secs(120));
        assert_eq!(merged.rotation, Rotation::Upright);
        assert_eq!(merged.log_level, LogLevel::Debug);
        assert!(merged.once && merged.dry_run);
    }

    #[test]
    fn overrides_are_validated() {
        let opts = RunOptions {
            full_update_interval: Some(Duration::from_millis(200)),
            ..RunOptions::default()
        };
        let err = AppConfig::from_sources(Config::default(), opts).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn dry_run_skips_power_hardware() {
        let app = App::new(AppConfig {
            dry_run: true,
            ..AppConfig::default()
        });
        let (gauge, mut charge) = app.open_power_inputs().unwrap();
        assert!(gauge.is_none());
        assert!(!charge.is_charging());
    }
}
