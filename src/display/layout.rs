//! Fixed screen geometry. Coordinates are landscape pixels, origin top-left.
//!
//! ```text
//!  0        38                         168 170            250
//!  +--------+--------------------------+-+---------------+
//!  | BAT    | 87%  -  4.05V  (charge)  | | 12:34 :56     |
//!  | CPU    | 12%  -  1.5/ 1.8 GHz     | | 18.10.2026    |
//!  | RAM    | 25%  -  1/ 4 GB          | +---------------+
//!  | SD     | 20%  - 3.1/ 29.0 GB      | | IP  ip         |
//!  |        |                          | | UP  uptime     |
//!  |        |                          | | TM  temp       |
//!  |        |                          | | model / user   |
//!  +--------+--------------------------+-+---------------+
//! ```

use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_5X8, FONT_6X10, FONT_6X13_BOLD},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::{Point, Size},
    primitives::Rectangle,
};

use super::frame::{HEIGHT, WIDTH};

/// A named rectangle with a pixel budget for the text drawn into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayRegion {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Text anchored at `origin()` may use this many pixels.
    pub const fn available_width(&self) -> u32 {
        self.width
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn rectangle(&self) -> Rectangle {
        Rectangle::new(self.origin(), Size::new(self.width, self.height))
    }

    /// Region that runs from `(x, y)` to the right edge of the panel.
    pub const fn to_right_edge(x: i32, y: i32, height: u32) -> Self {
        Self::new(x, y, WIDTH - x as u32, height)
    }
}

// Left column: labels at x=0, values from x=38.
pub const BATTERY_TEXT: DisplayRegion = DisplayRegion::new(38, 4, 126, 16);
pub const CPU_TEXT: DisplayRegion = DisplayRegion::new(38, 36, 126, 14);
pub const RAM_TEXT: DisplayRegion = DisplayRegion::new(38, 66, 126, 14);
pub const DISK_TEXT: DisplayRegion = DisplayRegion::new(38, 96, 126, 14);
/// Everything right of the labels that changes every cycle.
pub const LEFT_VALUES: DisplayRegion = DisplayRegion::new(38, 4, 127, 117);

// Battery gauge glyph: outline plus five 2px bars.
pub const BATTERY_OUTLINE: DisplayRegion = DisplayRegion::new(3, 10, 22, 13);
pub const BATTERY_NUB: DisplayRegion = DisplayRegion::new(25, 14, 2, 5);
pub const BATTERY_BARS: DisplayRegion = DisplayRegion::new(5, 12, 18, 9);
pub const BATTERY_BAR_WIDTH: u32 = 2;
pub const BATTERY_BAR_PITCH: i32 = 4;
/// Capacity (rounded percent) at which each bar lights, left to right.
pub const BATTERY_BAR_THRESHOLDS: [i64; 5] = [0, 20, 60, 80, 100];

/// Pixels between the end of the battery text and the charging mark.
pub const CHARGING_ICON_GAP: i32 = 12;
pub const CHARGING_ICON_Y: i32 = 6;
pub const CHARGING_ICON_SIZE: Size = Size::new(8, 13);

// Right column.
pub const CLOCK: DisplayRegion = DisplayRegion::new(172, 0, 52, 20);
pub const SECONDS: DisplayRegion = DisplayRegion::new(224, 6, 26, 14);
pub const DATE: DisplayRegion = DisplayRegion::new(180, 22, 70, 14);
pub const CLOCK_AREA: DisplayRegion = DisplayRegion::new(170, 0, 80, 37);
pub const IP_TEXT: DisplayRegion = DisplayRegion::to_right_edge(186, 50, 10);
pub const UPTIME_TEXT: DisplayRegion = DisplayRegion::to_right_edge(186, 64, 12);
pub const TEMPERATURE_TEXT: DisplayRegion = DisplayRegion::to_right_edge(186, 80, 10);
pub const MODEL_TEXT: DisplayRegion = DisplayRegion::to_right_edge(175, 95, 10);
pub const IDENTITY_TEXT: DisplayRegion = DisplayRegion::to_right_edge(175, 107, 10);

pub const RIGHT_LABEL_X: i32 = 173;
pub const LEFT_LABEL_X: i32 = 2;

pub const DIVIDER_X: i32 = 168;
pub const DIVIDER_Y: i32 = 45;
pub const DIVIDER_WIDTH: u32 = 3;
pub const PANEL_HEIGHT: i32 = HEIGHT as i32;
pub const PANEL_WIDTH: i32 = WIDTH as i32;

/// Text styles used on the panel; measurement and drawing share them.
#[derive(Debug, Clone, Copy)]
pub struct Fonts {
    pub value: MonoTextStyle<'static, BinaryColor>,
    pub clock: MonoTextStyle<'static, BinaryColor>,
    pub small: MonoTextStyle<'static, BinaryColor>,
    pub label: MonoTextStyle<'static, BinaryColor>,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            value: MonoTextStyle::new(&FONT_6X13_BOLD, BinaryColor::On),
            clock: MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
            small: MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
            label: MonoTextStyle::new(&FONT_5X8, BinaryColor::On),
        }
    }
}
