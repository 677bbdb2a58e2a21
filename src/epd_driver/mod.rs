//! SSD1680 controller as fitted to the Waveshare 2.13" V4 HAT.
//! Command bytes and ordering follow the vendor's reference driver.

use std::time::Duration;

use crate::{Error, Result};

pub mod rppal_link;

/// Panel width in controller orientation (source lines).
pub const WIDTH: u16 = 122;
/// Panel height in controller orientation (gate lines).
pub const HEIGHT: u16 = 250;
pub const ROW_BYTES: usize = (WIDTH as usize).div_ceil(8);
/// Bytes in one full frame of controller RAM.
pub const BUFFER_LEN: usize = ROW_BYTES * HEIGHT as usize;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_POLL_MS: u64 = 10;

// Commands.
const DRIVER_OUTPUT: u8 = 0x01;
const DEEP_SLEEP: u8 = 0x10;
const DATA_ENTRY_MODE: u8 = 0x11;
const SW_RESET: u8 = 0x12;
const TEMP_SENSOR: u8 = 0x18;
const MASTER_ACTIVATION: u8 = 0x20;
const UPDATE_CONTROL_1: u8 = 0x21;
const UPDATE_CONTROL_2: u8 = 0x22;
const WRITE_BW_RAM: u8 = 0x24;
const WRITE_BASE_RAM: u8 = 0x26;
const BORDER_WAVEFORM: u8 = 0x3C;
const RAM_X_RANGE: u8 = 0x44;
const RAM_Y_RANGE: u8 = 0x45;
const RAM_X_COUNTER: u8 = 0x4E;
const RAM_Y_COUNTER: u8 = 0x4F;

const DRIVER_OUTPUT_ARGS: [u8; 3] = [0xF9, 0x00, 0x00];
const ENTRY_X_INC_Y_INC: u8 = 0x03;
const SEQUENCE_FULL: u8 = 0xF7;
const SEQUENCE_PARTIAL: u8 = 0xFF;

/// GPIO assignments (BCM numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpdPins {
    pub rst: u8,
    pub dc: u8,
    pub busy: u8,
    pub pwr: u8,
}

impl Default for EpdPins {
    fn default() -> Self {
        Self {
            rst: 17,
            dc: 25,
            busy: 24,
            pwr: 18,
        }
    }
}

/// Wire-level access to the controller: SPI plus its control lines.
pub trait EpdLink {
    fn command(&mut self, cmd: u8) -> Result<()>;
    fn data(&mut self, bytes: &[u8]) -> Result<()>;
    fn set_reset(&mut self, high: bool);
    /// BUSY is high while the controller is working.
    fn is_busy(&mut self) -> bool;
    fn delay_ms(&mut self, ms: u64);
    /// Drive the control lines low and hand the pins back. With `cleanup`
    /// unset the pins keep their state after the process exits.
    fn release(&mut self, cleanup: bool);
}

pub struct Ssd1680<L: EpdLink> {
    link: L,
    busy_timeout: Duration,
}

impl<L: EpdLink> Ssd1680<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Hardware reset followed by the full-refresh register setup.
    pub fn init(&mut self) -> Result<()> {
        self.reset()?;
        self.wait_idle()?;
        self.link.command(SW_RESET)?;
        self.wait_idle()?;

        self.send(DRIVER_OUTPUT, &DRIVER_OUTPUT_ARGS)?;
        self.send(DATA_ENTRY_MODE, &[ENTRY_X_INC_Y_INC])?;
        self.full_window()?;
        self.send(BORDER_WAVEFORM, &[0x05])?;
        self.send(UPDATE_CONTROL_1, &[0x00, 0x80])?;
        // Internal temperature sensor.
        self.send(TEMP_SENSOR, &[0x80])?;
        self.wait_idle()
    }

    /// Fill controller RAM with `fill` and run a full refresh.
    pub fn clear(&mut self, fill: u8) -> Result<()> {
        self.link.command(WRITE_BW_RAM)?;
        self.link.data(&[fill; BUFFER_LEN])?;
        self.turn_on(SEQUENCE_FULL)
    }

    /// Full refresh with a new image.
    pub fn display(&mut self, image: &[u8]) -> Result<()> {
        check_len(image)?;
        self.send(WRITE_BW_RAM, image)?;
        self.turn_on(SEQUENCE_FULL)
    }

    /// Write `image` to both RAM banks so later partial refreshes diff against it.
    pub fn display_part_base_image(&mut self, image: &[u8]) -> Result<()> {
        check_len(image)?;
        self.send(WRITE_BW_RAM, image)?;
        self.send(WRITE_BASE_RAM, image)?;
        self.turn_on(SEQUENCE_FULL)
    }

    /// Partial refresh against the stored base image.
    pub fn display_partial(&mut self, image: &[u8]) -> Result<()> {
        check_len(image)?;
        self.link.set_reset(false);
        self.link.delay_ms(1);
        self.link.set_reset(true);

        self.send(BORDER_WAVEFORM, &[0x80])?;
        self.send(DRIVER_OUTPUT, &DRIVER_OUTPUT_ARGS)?;
        self.send(DATA_ENTRY_MODE, &[ENTRY_X_INC_Y_INC])?;
        self.full_window()?;
        self.send(WRITE_BW_RAM, image)?;
        self.turn_on(SEQUENCE_PARTIAL)
    }

    /// Deep sleep. The controller needs a reset (`init`) to wake up.
    pub fn sleep(&mut self) -> Result<()> {
        self.send(DEEP_SLEEP, &[0x01])?;
        self.link.delay_ms(2000);
        Ok(())
    }

    pub fn power_down(&mut self, cleanup: bool) {
        self.link.release(cleanup);
    }

    fn reset(&mut self) -> Result<()> {
        self.link.set_reset(true);
        self.link.delay_ms(20);
        self.link.set_reset(false);
        self.link.delay_ms(2);
        self.link.set_reset(true);
        self.link.delay_ms(20);
        Ok(())
    }

    fn turn_on(&mut self, sequence: u8) -> Result<()> {
        self.send(UPDATE_CONTROL_2, &[sequence])?;
        self.link.command(MASTER_ACTIVATION)?;
        self.wait_idle()
    }

    fn full_window(&mut self) -> Result<()> {
        self.set_window(0, 0, WIDTH - 1, HEIGHT - 1)?;
        self.set_cursor(0, 0)
    }

    fn set_window(&mut self, x_start: u16, y_start: u16, x_end: u16, y_end: u16) -> Result<()> {
        self.send(RAM_X_RANGE, &[(x_start >> 3) as u8, (x_end >> 3) as u8])?;
        let [ys_lo, ys_hi] = y_start.to_le_bytes();
        let [ye_lo, ye_hi] = y_end.to_le_bytes();
        self.send(RAM_Y_RANGE, &[ys_lo, ys_hi, ye_lo, ye_hi])
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        self.send(RAM_X_COUNTER, &[x as u8])?;
        self.send(RAM_Y_COUNTER, &y.to_le_bytes())
    }

    fn send(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        self.link.command(cmd)?;
        self.link.data(data)
    }

    fn wait_idle(&mut self) -> Result<()> {
        let polls = (self.busy_timeout.as_millis() as u64 / BUSY_POLL_MS).max(1);
        for _ in 0..polls {
            if !self.link.is_busy() {
                return Ok(());
            }
            self.link.delay_ms(BUSY_POLL_MS);
        }
        Err(Error::Timeout(format!(
            "panel busy for more than {}",
            humantime::format_duration(self.busy_timeout)
        )))
    }
}

fn check_len(image: &[u8]) -> Result<()> {
    if image.len() != BUFFER_LEN {
        return Err(Error::InvalidArgs(format!(
            "panel image must be {BUFFER_LEN} bytes, got {}",
            image.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Wire {
        Command(u8),
        Data(Vec<u8>),
        Reset(bool),
        Delay(u64),
        Release(bool),
    }

    #[derive(Default)]
    struct FakeLink {
        wire: Vec<Wire>,
        busy: VecDeque<bool>,
        stuck_busy: bool,
    }

    impl EpdLink for FakeLink {
        fn command(&mut self, cmd: u8) -> Result<()> {
            self.wire.push(Wire::Command(cmd));
            Ok(())
        }

        fn data(&mut self, bytes: &[u8]) -> Result<()> {
            self.wire.push(Wire::Data(bytes.to_vec()));
            Ok(())
        }

        fn set_reset(&mut self, high: bool) {
            self.wire.push(Wire::Reset(high));
        }

        fn is_busy(&mut self) -> bool {
            self.busy.pop_front().unwrap_or(self.stuck_busy)
        }

        fn delay_ms(&mut self, ms: u64) {
            self.wire.push(Wire::Delay(ms));
        }

        fn release(&mut self, cleanup: bool) {
            self.wire.push(Wire::Release(cleanup));
        }
    }

    impl FakeLink {
        fn commands(&self) -> Vec<u8> {
            self.wire
                .iter()
                .filter_map(|w| match w {
                    Wire::Command(c) => Some(*c),
                    _ => None,
                })
                .collect()
        }

        fn data_after(&self, cmd: u8) -> Vec<&[u8]> {
            self.wire
                .windows(2)
                .filter_map(|pair| match pair {
                    [Wire::Command(c), Wire::Data(d)] if *c == cmd => Some(d.as_slice()),
                    _ => None,
                })
                .collect()
        }
    }

    fn driver() -> Ssd1680<FakeLink> {
        Ssd1680::new(FakeLink::default())
    }

    #[test]
    fn buffer_matches_frame_packing() {
        assert_eq!(BUFFER_LEN, crate::display::frame::PANEL_BUFFER_LEN);
    }

    #[test]
    fn init_resets_then_configures() {
        let mut epd = driver();
        epd.init().unwrap();
        let link = epd.link();
        assert_eq!(
            &link.wire[..6],
            &[
                Wire::Reset(true),
                Wire::Delay(20),
                Wire::Reset(false),
                Wire::Delay(2),
                Wire::Reset(true),
                Wire::Delay(20),
            ]
        );
        assert_eq!(
            link.commands(),
            vec![SW_RESET, 0x01, 0x11, 0x44, 0x45, 0x4E, 0x4F, 0x3C, 0x21, 0x18]
        );
        assert_eq!(link.data_after(0x01), vec![&[0xF9, 0x00, 0x00][..]]);
        assert_eq!(link.data_after(0x44), vec![&[0x00, 0x0F][..]]);
        assert_eq!(link.data_after(0x45), vec![&[0x00, 0x00, 0xF9, 0x00][..]]);
        assert_eq!(link.data_after(0x4F), vec![&[0x00, 0x00][..]]);
    }

    #[test]
    fn full_display_uses_full_sequence() {
        let mut epd = driver();
        let image = vec![0xAA; BUFFER_LEN];
        epd.display(&image).unwrap();
        assert_eq!(epd.link().commands(), vec![0x24, 0x22, 0x20]);
        assert_eq!(epd.link().data_after(0x22), vec![&[0xF7][..]]);
        assert_eq!(epd.link().data_after(0x24), vec![image.as_slice()]);
    }

    #[test]
    fn base_image_fills_both_banks() {
        let mut epd = driver();
        let image = vec![0x0F; BUFFER_LEN];
        epd.display_part_base_image(&image).unwrap();
        assert_eq!(epd.link().commands(), vec![0x24, 0x26, 0x22, 0x20]);
        assert_eq!(epd.link().data_after(0x26), vec![image.as_slice()]);
    }

    #[test]
    fn partial_display_pulses_reset_and_uses_partial_sequence() {
        let mut epd = driver();
        epd.display_partial(&vec![0xFF; BUFFER_LEN]).unwrap();
        let link = epd.link();
        assert_eq!(
            &link.wire[..3],
            &[Wire::Reset(false), Wire::Delay(1), Wire::Reset(true)]
        );
        assert_eq!(
            link.commands(),
            vec![0x3C, 0x01, 0x11, 0x44, 0x45, 0x4E, 0x4F, 0x24, 0x22, 0x20]
        );
        assert_eq!(link.data_after(0x3C), vec![&[0x80][..]]);
        assert_eq!(link.data_after(0x22), vec![&[0xFF][..]]);
    }

    #[test]
    fn clear_writes_whole_frame_of_fill() {
        let mut epd = driver();
        epd.clear(0xFF).unwrap();
        let written = epd.link().data_after(0x24);
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].len(), 16 * 250);
        assert!(written[0].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn wrong_sized_image_is_rejected_before_any_io() {
        let mut epd = driver();
        let err = epd.display(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
        assert!(epd.link().wire.is_empty());
    }

    #[test]
    fn waits_while_busy() {
        let mut link = FakeLink::default();
        link.busy = VecDeque::from(vec![true, true, false]);
        let mut epd = Ssd1680::new(link);
        epd.display(&vec![0xFF; BUFFER_LEN]).unwrap();
        let polls = epd
            .link()
            .wire
            .iter()
            .filter(|w| **w == Wire::Delay(BUSY_POLL_MS))
            .count();
        assert_eq!(polls, 2);
    }

    #[test]
    fn stuck_busy_times_out() {
        let link = FakeLink {
            stuck_busy: true,
            ..FakeLink::default()
        };
        let mut epd = Ssd1680::new(link).with_busy_timeout(Duration::from_millis(50));
        let err = epd.display(&vec![0xFF; BUFFER_LEN]).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn sleep_then_release() {
        let mut epd = driver();
        epd.sleep().unwrap();
        epd.power_down(true);
        assert_eq!(
            epd.link().wire,
            vec![
                Wire::Command(0x10),
                Wire::Data(vec![0x01]),
                Wire::Delay(2000),
                Wire::Release(true),
            ]
        );
    }
}
