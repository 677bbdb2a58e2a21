use super::{EpdLink, EpdPins};
use crate::{Error, Result};

/// SPI clock used by the HAT's reference driver.
pub const SPI_CLOCK_HZ: u32 = 4_000_000;
// spidev rejects transfers larger than its buffer (4096 by default).
#[cfg(target_os = "linux")]
const SPI_CHUNK: usize = 4096;

#[cfg(target_os = "linux")]
fn map_gpio_err(err: rppal::gpio::Error) -> Error {
    Error::Gpio(err.to_string())
}

#[cfg(target_os = "linux")]
fn map_spi_err(err: rppal::spi::Error) -> Error {
    Error::Bus(err.to_string())
}

/// SPI0/CE0 plus the HAT's control lines, via rppal.
#[cfg(target_os = "linux")]
pub struct RppalLink {
    spi: rppal::spi::Spi,
    rst: rppal::gpio::OutputPin,
    dc: rppal::gpio::OutputPin,
    pwr: rppal::gpio::OutputPin,
    busy: rppal::gpio::InputPin,
}

#[cfg(target_os = "linux")]
impl RppalLink {
    /// Claim the pins, power the panel and open the SPI device.
    pub fn open(pins: EpdPins) -> Result<Self> {
        use rppal::{
            gpio::Gpio,
            spi::{Bus, Mode, SlaveSelect, Spi},
        };

        let gpio = Gpio::new().map_err(map_gpio_err)?;
        let rst = gpio.get(pins.rst).map_err(map_gpio_err)?.into_output();
        let dc = gpio.get(pins.dc).map_err(map_gpio_err)?.into_output();
        let mut pwr = gpio.get(pins.pwr).map_err(map_gpio_err)?.into_output();
        let busy = gpio.get(pins.busy).map_err(map_gpio_err)?.into_input();
        pwr.set_high();

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(map_spi_err)?;
        log::debug!("panel link open: {pins:?}, spi0.0 at {SPI_CLOCK_HZ} Hz");
        Ok(Self {
            spi,
            rst,
            dc,
            pwr,
            busy,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        for chunk in bytes.chunks(SPI_CHUNK) {
            self.spi.write(chunk).map_err(map_spi_err)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl EpdLink for RppalLink {
    fn command(&mut self, cmd: u8) -> Result<()> {
        self.dc.set_low();
        self.write(&[cmd])
    }

    fn data(&mut self, bytes: &[u8]) -> Result<()> {
        self.dc.set_high();
        self.write(bytes)
    }

    fn set_reset(&mut self, high: bool) {
        if high {
            self.rst.set_high();
        } else {
            self.rst.set_low();
        }
    }

    fn is_busy(&mut self) -> bool {
        self.busy.is_high()
    }

    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }

    fn release(&mut self, cleanup: bool) {
        self.rst.set_low();
        self.dc.set_low();
        self.pwr.set_low();
        if !cleanup {
            self.rst.set_reset_on_drop(false);
            self.dc.set_reset_on_drop(false);
            self.pwr.set_reset_on_drop(false);
            self.busy.set_reset_on_drop(false);
        }
    }
}

/// Non-Linux stub so the crate builds on dev hosts; fails at runtime.
#[cfg(not(target_os = "linux"))]
pub struct RppalLink;

#[cfg(not(target_os = "linux"))]
impl RppalLink {
    pub fn open(_pins: EpdPins) -> Result<Self> {
        Err(Error::InvalidArgs(
            "the e-paper link is only available on Linux targets".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl EpdLink for RppalLink {
    fn command(&mut self, _cmd: u8) -> Result<()> {
        Err(Error::InvalidArgs(
            "the e-paper link is only available on Linux targets".into(),
        ))
    }

    fn data(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(Error::InvalidArgs(
            "the e-paper link is only available on Linux targets".into(),
        ))
    }

    fn set_reset(&mut self, _high: bool) {}

    fn is_busy(&mut self) -> bool {
        false
    }

    fn delay_ms(&mut self, _ms: u64) {}

    fn release(&mut self, _cleanup: bool) {}
}
