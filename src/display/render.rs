use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, Point, Primitive, Size},
    primitives::{Line, PrimitiveStyle, Rectangle, Triangle},
    text::{Baseline, Text},
    Drawable,
};

use super::{
    frame::FrameBuffer,
    layout::{self, DisplayRegion, Fonts},
};
use crate::{
    format::{self, TextMeasure},
    gauge::BatteryReading,
    telemetry::{DeviceIdentity, TelemetrySnapshot},
};

/// Every string drawn for one snapshot, in the exact form it is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameText {
    pub battery: String,
    pub cpu: String,
    pub memory: String,
    pub disk: String,
    pub uptime: String,
    pub temperature: String,
    pub clock: String,
    pub seconds: String,
    pub date: String,
}

impl FrameText {
    pub fn from_snapshot(snapshot: &TelemetrySnapshot, fonts: &Fonts) -> Self {
        Self {
            battery: format::battery(snapshot.battery.as_ref()),
            cpu: format::cpu(snapshot.cpu_percent, &snapshot.cpu_freq),
            memory: format::memory(&snapshot.memory),
            disk: format::disk(&snapshot.disk),
            uptime: format::uptime(snapshot.uptime_secs, &fonts.small, &layout::UPTIME_TEXT),
            temperature: format::temperature(snapshot.temperature_millic),
            clock: snapshot.timestamp.format("%H:%M").to_string(),
            seconds: snapshot.timestamp.format(":%S").to_string(),
            date: snapshot.timestamp.format("%d.%m.%Y").to_string(),
        }
    }
}

fn draw_text(
    frame: &mut FrameBuffer,
    text: &str,
    at: Point,
    style: MonoTextStyle<'static, BinaryColor>,
) {
    let _ = Text::with_baseline(text, at, style, Baseline::Top).draw(frame);
}

fn fill(frame: &mut FrameBuffer, region: &DisplayRegion, color: BinaryColor) {
    let _ = frame.fill_solid(&region.rectangle(), color);
}

/// Draw the parts of the screen that never change: dividers, labels, the
/// battery outline and the board identity.
pub fn draw_chrome(frame: &mut FrameBuffer, identity: &DeviceIdentity, fonts: &Fonts) {
    let _ = frame.clear(BinaryColor::Off);
    let divider = PrimitiveStyle::with_stroke(BinaryColor::On, layout::DIVIDER_WIDTH);
    let _ = Line::new(
        Point::new(layout::DIVIDER_X, 0),
        Point::new(layout::DIVIDER_X, layout::PANEL_HEIGHT - 1),
    )
    .into_styled(divider)
    .draw(frame);
    let _ = Line::new(
        Point::new(layout::DIVIDER_X, layout::DIVIDER_Y),
        Point::new(layout::PANEL_WIDTH - 1, layout::DIVIDER_Y),
    )
    .into_styled(divider)
    .draw(frame);

    let _ = layout::BATTERY_OUTLINE
        .rectangle()
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(frame);
    fill(frame, &layout::BATTERY_NUB, BinaryColor::On);

    for (label, region) in [
        ("CPU", layout::CPU_TEXT),
        ("RAM", layout::RAM_TEXT),
        ("SD", layout::DISK_TEXT),
    ] {
        draw_text(frame, label, Point::new(layout::LEFT_LABEL_X, region.y + 3), fonts.label);
    }
    for (label, region) in [
        ("IP", layout::IP_TEXT),
        ("UP", layout::UPTIME_TEXT),
        ("TM", layout::TEMPERATURE_TEXT),
    ] {
        draw_text(frame, label, Point::new(layout::RIGHT_LABEL_X, region.y + 1), fonts.label);
    }

    draw_text(frame, &identity.ip.to_string(), layout::IP_TEXT.origin(), fonts.small);
    draw_text(frame, &identity.model, layout::MODEL_TEXT.origin(), fonts.small);
    let who = format::identity(
        identity.user.as_deref(),
        &identity.host,
        &fonts.small,
        &layout::IDENTITY_TEXT,
    );
    draw_text(frame, &who, layout::IDENTITY_TEXT.origin(), fonts.small);
}

/// Where the charging mark goes: just past the battery text as drawn.
pub fn charging_icon_origin(battery_text: &str, measure: &impl TextMeasure) -> Point {
    let width = measure.text_width(battery_text) as i32;
    Point::new(
        layout::BATTERY_TEXT.x + width + layout::CHARGING_ICON_GAP,
        layout::CHARGING_ICON_Y,
    )
}

/// Number of lit bars for a capacity reading.
pub fn battery_bars(capacity: f64) -> usize {
    let rounded = capacity.round() as i64;
    layout::BATTERY_BAR_THRESHOLDS
        .iter()
        .filter(|threshold| rounded >= **threshold)
        .count()
}

fn draw_battery_bars(frame: &mut FrameBuffer, lit: usize) {
    let bars = layout::BATTERY_BARS;
    for idx in 0..lit {
        let x = bars.x + idx as i32 * layout::BATTERY_BAR_PITCH;
        let bar = Rectangle::new(
            Point::new(x, bars.y),
            Size::new(layout::BATTERY_BAR_WIDTH, bars.height),
        );
        let _ = frame.fill_solid(&bar, BinaryColor::On);
    }
}

fn draw_charging_icon(frame: &mut FrameBuffer, origin: Point) {
    let Size { width, height } = layout::CHARGING_ICON_SIZE;
    let (w, h) = (width as i32, height as i32);
    let style = PrimitiveStyle::with_fill(BinaryColor::On);
    let upper = Triangle::new(
        origin + Point::new(w * 3 / 4, 0),
        origin + Point::new(0, h * 3 / 5),
        origin + Point::new(w / 2, h * 3 / 5),
    );
    let lower = Triangle::new(
        origin + Point::new(w / 2, h * 2 / 5),
        origin + Point::new(w, h * 2 / 5),
        origin + Point::new(w / 4, h),
    );
    let _ = upper.into_styled(style).draw(frame);
    let _ = lower.into_styled(style).draw(frame);
}

/// Erase last cycle's values and draw this cycle's. Returns where the
/// charging mark was drawn, if it was.
pub fn draw_values(
    frame: &mut FrameBuffer,
    text: &FrameText,
    battery: Option<&BatteryReading>,
    charging: bool,
    fonts: &Fonts,
) -> Option<Point> {
    for region in [
        layout::LEFT_VALUES,
        layout::CLOCK_AREA,
        layout::UPTIME_TEXT,
        layout::TEMPERATURE_TEXT,
        layout::BATTERY_BARS,
    ] {
        fill(frame, &region, BinaryColor::Off);
    }

    if let Some(reading) = battery {
        draw_battery_bars(frame, battery_bars(reading.capacity));
    }

    draw_text(frame, &text.battery, layout::BATTERY_TEXT.origin(), fonts.value);
    draw_text(frame, &text.cpu, layout::CPU_TEXT.origin(), fonts.value);
    draw_text(frame, &text.memory, layout::RAM_TEXT.origin(), fonts.value);
    draw_text(frame, &text.disk, layout::DISK_TEXT.origin(), fonts.value);
    draw_text(frame, &text.clock, layout::CLOCK.origin(), fonts.clock);
    draw_text(frame, &text.seconds, layout::SECONDS.origin(), fonts.value);
    draw_text(frame, &text.date, layout::DATE.origin(), fonts.value);
    draw_text(frame, &text.uptime, layout::UPTIME_TEXT.origin(), fonts.small);
    draw_text(frame, &text.temperature, layout::TEMPERATURE_TEXT.origin(), fonts.small);

    if battery.is_some() && charging {
        // Recomputed every cycle: the battery text changes width as it updates.
        let origin = charging_icon_origin(&text.battery, &fonts.value);
        draw_charging_icon(frame, origin);
        Some(origin)
    } else {
        None
    }
}
