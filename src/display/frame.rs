use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Pixel, Point, Size},
};

/// Landscape width of the 2.13" panel (the controller's gate count).
pub const WIDTH: u32 = 250;
/// Landscape height of the 2.13" panel (the controller's source count).
pub const HEIGHT: u32 = 122;

/// Bytes per row in controller memory, where rows run along the long edge.
pub const PANEL_ROW_BYTES: usize = (HEIGHT as usize).div_ceil(8);
/// Size of the buffer the controller expects for one full frame.
pub const PANEL_BUFFER_LEN: usize = PANEL_ROW_BYTES * WIDTH as usize;

const ROW_BYTES: usize = (WIDTH as usize).div_ceil(8);

/// How the landscape frame is mounted relative to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Upright,
    Flipped,
}

/// 1-bpp landscape drawing surface. `BinaryColor::On` is ink.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    bits: Vec<u8>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inked = self.bits.iter().map(|b| b.count_ones()).sum::<u32>();
        f.debug_struct("FrameBuffer")
            .field("size", &(WIDTH, HEIGHT))
            .field("inked", &inked)
            .finish()
    }
}

impl FrameBuffer {
    /// A blank (all paper) frame.
    pub fn new() -> Self {
        Self {
            bits: vec![0; ROW_BYTES * HEIGHT as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> BinaryColor {
        if x >= WIDTH || y >= HEIGHT {
            return BinaryColor::Off;
        }
        let (idx, mask) = Self::locate(x, y);
        if self.bits[idx] & mask != 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        }
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let (idx, mask) = Self::locate(x, y);
        match color {
            BinaryColor::On => self.bits[idx] |= mask,
            BinaryColor::Off => self.bits[idx] &= !mask,
        }
    }

    fn locate(x: u32, y: u32) -> (usize, u8) {
        let idx = y as usize * ROW_BYTES + x as usize / 8;
        (idx, 0x80 >> (x % 8))
    }

    /// Pack into controller memory order: the frame is turned 90° counter-clockwise
    /// so each landscape column becomes one panel row, MSB first, bit set = white.
    pub fn to_panel_bytes(&self, rotation: Rotation) -> Vec<u8> {
        let mut out = vec![0xFF; PANEL_BUFFER_LEN];
        for row in 0..WIDTH {
            for col in 0..HEIGHT {
                let (x, y) = match rotation {
                    Rotation::Upright => (WIDTH - 1 - row, col),
                    Rotation::Flipped => (row, HEIGHT - 1 - col),
                };
                if self.pixel(x, y) == BinaryColor::On {
                    let idx = row as usize * PANEL_ROW_BYTES + col as usize / 8;
                    out[idx] &= !(0x80 >> (col % 8));
                }
            }
        }
        out
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            if x >= 0 && y >= 0 {
                self.set_pixel(x as u32, y as u32, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{
        prelude::Primitive,
        primitives::{PrimitiveStyle, Rectangle},
        Drawable,
    };

    fn panel_bit(buf: &[u8], row: u32, col: u32) -> bool {
        let idx = row as usize * PANEL_ROW_BYTES + col as usize / 8;
        buf[idx] & (0x80 >> (col % 8)) != 0
    }

    #[test]
    fn blank_frame_packs_to_white() {
        let frame = FrameBuffer::new();
        let buf = frame.to_panel_bytes(Rotation::Upright);
        assert_eq!(buf.len(), 16 * 250);
        assert!(buf.iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn corner_pixel_lands_in_rotated_position() {
        let mut frame = FrameBuffer::new();
        Pixel(Point::new(0, 0), BinaryColor::On)
            .draw(&mut frame)
            .unwrap();

        let upright = frame.to_panel_bytes(Rotation::Upright);
        // Top-left of the landscape frame is the first column of the last panel row.
        assert!(!panel_bit(&upright, WIDTH - 1, 0));
        assert_eq!(upright.iter().filter(|b| **b != 0xFF).count(), 1);

        let flipped = frame.to_panel_bytes(Rotation::Flipped);
        assert!(!panel_bit(&flipped, 0, HEIGHT - 1));
        assert_eq!(flipped.iter().filter(|b| **b != 0xFF).count(), 1);
    }

    #[test]
    fn out_of_bounds_pixels_are_clipped() {
        let mut frame = FrameBuffer::new();
        Rectangle::new(Point::new(240, 110), Size::new(40, 40))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut frame)
            .unwrap();
        assert_eq!(frame.pixel(249, 121), BinaryColor::On);
        assert_eq!(frame.pixel(250, 121), BinaryColor::Off);
    }

    #[test]
    fn fill_can_erase() {
        let mut frame = FrameBuffer::new();
        let area = Rectangle::new(Point::new(10, 10), Size::new(5, 5));
        frame.fill_solid(&area, BinaryColor::On).unwrap();
        assert_eq!(frame.pixel(12, 12), BinaryColor::On);
        frame.fill_solid(&area, BinaryColor::Off).unwrap();
        assert_eq!(frame, FrameBuffer::new());
    }
}
