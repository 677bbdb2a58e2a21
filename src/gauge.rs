//! CW2015 battery gauge on the UPS HAT.
//!
//! The gauge answers SMBus word reads whose bytes arrive swapped relative to
//! the register's big-endian layout. Presence is decided once at startup by
//! [`Cw2015::probe`]; after that every bus failure is fatal.

use crate::{Error, Result};

pub const CW2015_ADDRESS: u8 = 0x62;
pub const REG_VCELL: u8 = 0x02;
pub const REG_SOC: u8 = 0x04;
pub const REG_MODE: u8 = 0x0A;
/// Written to the mode register to wake the gauge from sleep.
pub const MODE_WAKE: u16 = 0x30;

const MILLIVOLTS_PER_LSB: f64 = 0.305;

// errno values the I2C adapter reports when nothing acknowledges the address.
const EIO: i32 = 5;
const ENXIO: i32 = 6;
const EREMOTEIO: i32 = 121;

/// One voltage/capacity pair read from the gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub voltage: f64,
    pub capacity: f64,
}

/// SMBus word access used by the gauge driver.
pub trait GaugeBus {
    fn read_word(&mut self, register: u8) -> Result<u16>;
    fn write_word(&mut self, register: u8, value: u16) -> Result<()>;
}

/// Anything that can report the battery state.
pub trait Gauge {
    /// Cell voltage in volts.
    fn voltage(&mut self) -> Result<f64>;
    /// State of charge in percent.
    fn capacity(&mut self) -> Result<f64>;

    fn read(&mut self) -> Result<BatteryReading> {
        Ok(BatteryReading {
            voltage: self.voltage()?,
            capacity: self.capacity()?,
        })
    }
}

/// Outcome of the startup probe.
pub enum GaugeProbeResult<G> {
    Present(G),
    Absent(Error),
    Fatal(Error),
}

impl<G> std::fmt::Debug for GaugeProbeResult<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GaugeProbeResult::Present(_) => f.write_str("Present"),
            GaugeProbeResult::Absent(err) => write!(f, "Absent({err})"),
            GaugeProbeResult::Fatal(err) => write!(f, "Fatal({err})"),
        }
    }
}

pub struct Cw2015<B: GaugeBus> {
    bus: B,
}

impl<B: GaugeBus> Cw2015<B> {
    /// Wake the gauge. A silent bus means no UPS HAT is fitted; any other
    /// failure is reported as fatal.
    pub fn probe(mut bus: B) -> GaugeProbeResult<Self> {
        match bus.write_word(REG_MODE, MODE_WAKE) {
            Ok(()) => GaugeProbeResult::Present(Self { bus }),
            Err(err) if is_bus_silent(&err) => GaugeProbeResult::Absent(err),
            Err(err) => GaugeProbeResult::Fatal(err),
        }
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: GaugeBus> Gauge for Cw2015<B> {
    fn voltage(&mut self) -> Result<f64> {
        let raw = self.bus.read_word(REG_VCELL)?;
        Ok(decode_voltage(raw))
    }

    fn capacity(&mut self) -> Result<f64> {
        let raw = self.bus.read_word(REG_SOC)?;
        Ok(decode_capacity(raw))
    }
}

/// Cell voltage in volts from a raw SMBus word.
pub fn decode_voltage(raw: u16) -> f64 {
    f64::from(raw.swap_bytes()) * MILLIVOLTS_PER_LSB / 1000.0
}

/// State of charge in percent from a raw SMBus word.
pub fn decode_capacity(raw: u16) -> f64 {
    f64::from(raw.swap_bytes()) / 256.0
}

/// True when the error is the adapter reporting that no device answered.
pub fn is_bus_silent(err: &Error) -> bool {
    match err {
        Error::Io(io_err) => matches!(io_err.raw_os_error(), Some(EIO | ENXIO | EREMOTEIO)),
        _ => false,
    }
}

#[cfg(target_os = "linux")]
pub use rppal_bus::RppalGaugeBus;

#[cfg(target_os = "linux")]
mod rppal_bus {
    use super::GaugeBus;
    use crate::{Error, Result};

    fn map_i2c_err(err: rppal::i2c::Error) -> Error {
        // Keep the io::Error intact so the errno survives for probe classification.
        match err {
            rppal::i2c::Error::Io(io_err) => Error::Io(io_err),
            other => Error::Bus(other.to_string()),
        }
    }

    /// SMBus access through rppal's I2C.
    pub struct RppalGaugeBus {
        inner: rppal::i2c::I2c,
    }

    impl RppalGaugeBus {
        /// Open a specific bus by number (bus 1 => /dev/i2c-1) and target `address`.
        pub fn open(bus: u8, address: u8) -> Result<Self> {
            let mut inner = rppal::i2c::I2c::with_bus(bus).map_err(map_i2c_err)?;
            inner
                .set_slave_address(u16::from(address))
                .map_err(map_i2c_err)?;
            Ok(Self { inner })
        }
    }

    impl GaugeBus for RppalGaugeBus {
        fn read_word(&mut self, register: u8) -> Result<u16> {
            self.inner.smbus_read_word(register).map_err(map_i2c_err)
        }

        fn write_word(&mut self, register: u8, value: u16) -> Result<()> {
            self.inner
                .smbus_write_word(register, value)
                .map_err(map_i2c_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    #[derive(Default)]
    struct FakeBus {
        words: HashMap<u8, u16>,
        writes: Vec<(u8, u16)>,
        write_errno: Option<i32>,
    }

    impl GaugeBus for FakeBus {
        fn read_word(&mut self, register: u8) -> Result<u16> {
            self.words
                .get(&register)
                .copied()
                .ok_or_else(|| Error::Io(io::Error::from_raw_os_error(EIO)))
        }

        fn write_word(&mut self, register: u8, value: u16) -> Result<()> {
            if let Some(code) = self.write_errno {
                return Err(Error::Io(io::Error::from_raw_os_error(code)));
            }
            self.writes.push((register, value));
            Ok(())
        }
    }

    #[test]
    fn decode_swaps_bytes_before_scaling() {
        let swapped = f64::from(0x3412u16);
        assert_eq!(decode_voltage(0x1234), swapped * 0.305 / 1000.0);
        assert_eq!(decode_capacity(0x1234), swapped / 256.0);
    }

    #[test]
    fn probe_wakes_gauge_when_present() {
        let probed = Cw2015::probe(FakeBus::default());
        let GaugeProbeResult::Present(gauge) = probed else {
            panic!("expected gauge to be present, got {probed:?}");
        };
        assert_eq!(gauge.into_inner().writes, vec![(REG_MODE, MODE_WAKE)]);
    }

    #[test]
    fn probe_treats_silent_bus_as_absent() {
        for code in [EIO, ENXIO, EREMOTEIO] {
            let bus = FakeBus {
                write_errno: Some(code),
                ..FakeBus::default()
            };
            assert!(matches!(
                Cw2015::probe(bus),
                GaugeProbeResult::Absent(_)
            ));
        }
    }

    #[test]
    fn probe_treats_other_failures_as_fatal() {
        let bus = FakeBus {
            write_errno: Some(13),
            ..FakeBus::default()
        };
        assert!(matches!(Cw2015::probe(bus), GaugeProbeResult::Fatal(_)));
    }

    #[test]
    fn read_reports_voltage_and_capacity() {
        let mut bus = FakeBus::default();
        bus.words.insert(REG_VCELL, 0x1234);
        bus.words.insert(REG_SOC, 0x0050);
        let GaugeProbeResult::Present(mut gauge) = Cw2015::probe(bus) else {
            panic!("probe failed");
        };
        let reading = gauge.read().unwrap();
        assert_eq!(reading.voltage, decode_voltage(0x1234));
        assert_eq!(reading.capacity, 80.0);
    }

    #[test]
    fn read_failure_after_probe_propagates() {
        let GaugeProbeResult::Present(mut gauge) = Cw2015::probe(FakeBus::default()) else {
            panic!("probe failed");
        };
        assert!(gauge.read().is_err());
    }
}
