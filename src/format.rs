//! Display strings for each metric.
//!
//! Everything here is a pure function of its inputs. Where a string has to
//! fit a fixed region, the candidates are measured with the font that will
//! draw them; character counts are never used as a width.

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::BinaryColor,
    prelude::Point,
    text::{renderer::TextRenderer, Baseline},
};

use crate::{
    display::layout::DisplayRegion,
    gauge::BatteryReading,
    telemetry::{CpuFrequency, DiskUsage, MemoryUsage},
};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

pub const NO_GAUGE_TEXT: &str = "UPS not detected";

/// Pixel width of a string in a particular font.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> u32;
}

impl TextMeasure for MonoTextStyle<'_, BinaryColor> {
    fn text_width(&self, text: &str) -> u32 {
        self.measure_string(text, Point::zero(), Baseline::Top)
            .bounding_box
            .size
            .width
    }
}

/// Uptime split into whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl UptimeParts {
    pub fn from_secs(secs: f64) -> Self {
        let total = if secs.is_finite() && secs > 0.0 {
            secs.floor() as u64
        } else {
            0
        };
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }
}

/// Uptime strings from most to least detailed: d/h/m/s, d/h/m, d/h.
pub fn uptime_candidates(secs: f64) -> [String; 3] {
    let p = UptimeParts::from_secs(secs);
    let full = [(p.days, 'd'), (p.hours, 'h'), (p.minutes, 'm'), (p.seconds, 's')];
    [
        join_units(&full),
        join_units(&full[..3]),
        join_units(&full[..2]),
    ]
}

fn join_units(components: &[(u64, char)]) -> String {
    let first = components.iter().position(|(value, _)| *value > 0);
    match first {
        Some(start) => components[start..]
            .iter()
            .map(|(value, unit)| format!("{value}{unit}"))
            .collect::<Vec<_>>()
            .join(" "),
        None => {
            // Every unit is zero: keep the smallest one rather than an empty string.
            let (value, unit) = components.last().copied().unwrap_or((0, 's'));
            format!("{value}{unit}")
        }
    }
}

/// Most detailed uptime that fits `region`; the coarsest one when nothing fits.
pub fn uptime(secs: f64, measure: &impl TextMeasure, region: &DisplayRegion) -> String {
    let budget = region.available_width();
    let [full, minutes, hours] = uptime_candidates(secs);
    [full, minutes]
        .into_iter()
        .find(|candidate| measure.text_width(candidate) <= budget)
        .unwrap_or(hours)
}

fn percent_of(part: f64, total: f64) -> u64 {
    if total <= 0.0 {
        return 0;
    }
    (part / total * 100.0).round().clamp(0.0, 100.0) as u64
}

pub fn memory(mem: &MemoryUsage) -> String {
    let total = mem.total_bytes as f64;
    let used = mem.total_bytes.saturating_sub(mem.available_bytes) as f64;
    let (unit, factor) = if total >= GIB { ("GB", GIB) } else { ("MB", MIB) };
    format!(
        "{}%  -  {:.0}/ {:.0} {unit}",
        percent_of(used, total),
        used / factor,
        total / factor
    )
}

pub fn disk(disk: &DiskUsage) -> String {
    let total = disk.total_bytes as f64;
    let used = disk.used_bytes as f64;
    format!(
        "{}%  - {:.1}/ {:.1} GB",
        percent_of(used, total),
        used / GIB,
        total / GIB
    )
}

pub fn cpu(percent: f32, freq: &CpuFrequency) -> String {
    format!(
        "{:.0}%  -  {:.1}/ {:.1} GHz",
        percent,
        freq.current_mhz as f64 / 1000.0,
        freq.max_mhz as f64 / 1000.0
    )
}

pub fn temperature(millidegrees: i64) -> String {
    format!("{:.1} °C", millidegrees as f64 / 1000.0)
}

/// Battery status line; the same string is used to place the charging icon.
pub fn battery(reading: Option<&BatteryReading>) -> String {
    match reading {
        Some(r) => format!("{:.0}%  -  {:.2}V", r.capacity.round(), r.voltage),
        None => NO_GAUGE_TEXT.to_string(),
    }
}

/// `user@host` when it fits, otherwise just the host.
pub fn identity(
    user: Option<&str>,
    host: &str,
    measure: &impl TextMeasure,
    region: &DisplayRegion,
) -> String {
    if let Some(user) = user.filter(|u| !u.is_empty()) {
        let full = format!("{user}@{host}");
        if measure.text_width(&full) <= region.available_width() {
            return full;
        }
    }
    host.to_string()
}

/// Shorten a device-tree model string: drop the board revision and
/// abbreviate the "Raspberry Pi" prefix.
pub fn model_line(raw: &str) -> String {
    let model = strip_revision(raw.trim_matches(|c: char| c == '\0' || c.is_whitespace()));
    match model.strip_prefix("Raspberry Pi") {
        Some(rest) => {
            let rest = rest.trim();
            if rest.is_empty() {
                "RPi".to_string()
            } else {
                format!("RPi {rest}")
            }
        }
        None => model.to_string(),
    }
}

fn strip_revision(model: &str) -> &str {
    let without_number = model.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    if without_number.len() == model.len() {
        return model;
    }
    let head = without_number.trim_end();
    let split = head.len().saturating_sub(3);
    match (head.get(..split), head.get(split..)) {
        (Some(rest), Some(tag)) if tag.eq_ignore_ascii_case("rev") => rest.trim_end(),
        _ => model,
    }
}
