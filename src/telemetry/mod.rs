use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use crate::{
    gauge::{BatteryReading, Gauge},
    Error, Result,
};

pub mod identity;

pub use identity::DeviceIdentity;

const CPU_MAX_FREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuFrequency {
    pub current_mhz: u64,
    pub max_mhz: u64,
}

/// Everything one loop iteration draws. Built once per cycle and dropped after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// `None` when no gauge was found at startup; never zero-filled.
    pub battery: Option<BatteryReading>,
    pub temperature_millic: i64,
    pub uptime_secs: f64,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub cpu_percent: f32,
    pub cpu_freq: CpuFrequency,
    pub timestamp: DateTime<Local>,
}

/// Source of per-cycle telemetry.
pub trait Sampler {
    /// Read a snapshot. `gauge` is passed only when one was detected at startup;
    /// its read errors propagate.
    fn sample(&mut self, gauge: Option<&mut dyn Gauge>) -> Result<TelemetrySnapshot>;
}

/// Samples the running system through sysinfo and sysfs.
pub struct SystemSampler {
    system: System,
    disks: Disks,
    disk_mount: PathBuf,
    thermal_zone: PathBuf,
    cpu_max_freq_path: PathBuf,
}

impl SystemSampler {
    pub fn new(disk_mount: impl Into<PathBuf>, thermal_zone: impl Into<PathBuf>) -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_memory(MemoryRefreshKind::nothing().with_ram())
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage().with_frequency()),
        );
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            disk_mount: disk_mount.into(),
            thermal_zone: thermal_zone.into(),
            cpu_max_freq_path: PathBuf::from(CPU_MAX_FREQ_PATH),
        }
    }

    fn memory(&mut self) -> MemoryUsage {
        self.system
            .refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        MemoryUsage {
            total_bytes: self.system.total_memory(),
            available_bytes: self.system.available_memory(),
        }
    }

    fn disk(&mut self) -> DiskUsage {
        self.disks.refresh(true);
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == self.disk_mount.as_path())
            .or_else(|| self.disks.list().first());
        match disk {
            Some(disk) => {
                let total = disk.total_space();
                DiskUsage {
                    total_bytes: total,
                    used_bytes: total.saturating_sub(disk.available_space()),
                }
            }
            None => DiskUsage::default(),
        }
    }

    fn cpu(&mut self) -> (f32, CpuFrequency) {
        // Usage is measured since the previous refresh, i.e. over the last cycle.
        self.system.refresh_cpu_specifics(
            CpuRefreshKind::nothing().with_cpu_usage().with_frequency(),
        );
        let percent = self.system.global_cpu_usage().clamp(0.0, 100.0);
        let current_mhz = self
            .system
            .cpus()
            .first()
            .map(|cpu| cpu.frequency())
            .unwrap_or(0);
        let max_mhz = read_max_frequency_mhz(&self.cpu_max_freq_path).unwrap_or(current_mhz);
        (
            percent,
            CpuFrequency {
                current_mhz,
                max_mhz,
            },
        )
    }
}

impl Sampler for SystemSampler {
    fn sample(&mut self, gauge: Option<&mut dyn Gauge>) -> Result<TelemetrySnapshot> {
        let battery = match gauge {
            Some(gauge) => Some(gauge.read()?),
            None => None,
        };
        let temperature_millic = read_temperature(&self.thermal_zone)?;
        let uptime_secs = uptime_secs();
        let memory = self.memory();
        let disk = self.disk();
        let (cpu_percent, cpu_freq) = self.cpu();
        Ok(TelemetrySnapshot {
            battery,
            temperature_millic,
            uptime_secs,
            memory,
            disk,
            cpu_percent,
            cpu_freq,
            timestamp: Local::now(),
        })
    }
}

/// Seconds since boot, from the boot timestamp rather than a cached counter.
fn uptime_secs() -> f64 {
    let boot = System::boot_time() as f64;
    let now = Local::now().timestamp_millis() as f64 / 1000.0;
    (now - boot).max(0.0)
}

/// Read a thermal-zone file holding integer millidegrees Celsius.
pub fn read_temperature(path: &Path) -> Result<i64> {
    let raw = fs::read_to_string(path)?;
    raw.trim().parse().map_err(|_| {
        Error::Parse(format!(
            "unexpected temperature '{}' in {}",
            raw.trim(),
            path.display()
        ))
    })
}

fn read_max_frequency_mhz(path: &Path) -> Option<u64> {
    let khz: u64 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
    Some(khz / 1000)
}
