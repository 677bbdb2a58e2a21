use crate::Result;
#[cfg(not(target_os = "linux"))]
use crate::Error;

/// Charge-presence line from the UPS HAT.
pub trait ChargeInput {
    /// True while external power is connected.
    fn is_charging(&mut self) -> bool;
}

/// Used when there is no gauge, or on dry runs: never charging.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChargeInput;

impl ChargeInput for NoChargeInput {
    fn is_charging(&mut self) -> bool {
        false
    }
}

/// GPIO input wrapper; stubbed on non-Linux platforms.
#[cfg(target_os = "linux")]
pub struct ChargePin {
    pin: rppal::gpio::InputPin,
}

#[cfg(target_os = "linux")]
impl ChargePin {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| crate::Error::Gpio(e.to_string()))?;
        let input = gpio
            .get(pin)
            .map_err(|e| crate::Error::Gpio(e.to_string()))?
            .into_input();
        Ok(Self { pin: input })
    }
}

#[cfg(target_os = "linux")]
impl ChargeInput for ChargePin {
    fn is_charging(&mut self) -> bool {
        self.pin.is_high()
    }
}

#[cfg(not(target_os = "linux"))]
pub struct ChargePin;

#[cfg(not(target_os = "linux"))]
impl ChargePin {
    pub fn new(_pin: u8) -> Result<Self> {
        Err(Error::InvalidArgs(
            "charge input unsupported on this platform".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl ChargeInput for ChargePin {
    fn is_charging(&mut self) -> bool {
        false
    }
}
