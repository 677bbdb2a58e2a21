use crate::gauge::BatteryReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// No gauge answered at startup; shutdown is never requested.
    NoGauge,
    OnPower,
    OnBattery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerDecision {
    pub state: PowerState,
    /// Set on the one observation that found the battery exhausted.
    pub shutdown: bool,
}

/// Tracks the power source across cycles and latches the shutdown request.
#[derive(Debug, Default)]
pub struct PowerMonitor {
    last_state: Option<PowerState>,
    shutdown_requested: bool,
}

impl PowerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one cycle. `battery` is `None` when no gauge is fitted.
    pub fn observe(&mut self, battery: Option<&BatteryReading>, charging: bool) -> PowerDecision {
        let state = match battery {
            None => PowerState::NoGauge,
            Some(_) if charging => PowerState::OnPower,
            Some(_) => PowerState::OnBattery,
        };
        if self.last_state != Some(state) {
            log::info!("power source: {state:?}");
            self.last_state = Some(state);
        }

        let exhausted = state == PowerState::OnBattery
            && battery.is_some_and(|reading| reading.capacity <= 0.0);
        let shutdown = exhausted && !self.shutdown_requested;
        if shutdown {
            log::warn!("battery exhausted, shutting down");
            self.shutdown_requested = true;
        }
        PowerDecision { state, shutdown }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}
