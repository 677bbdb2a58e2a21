use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use embedded_graphics::prelude::Point;

use super::{
    input::{ChargeInput, NoChargeInput},
    lifecycle,
    power::{PowerDecision, PowerMonitor, PowerState},
    refresh::{RefreshKind, RefreshScheduler},
};
use crate::{
    display::{
        layout::Fonts,
        render::{self, FrameText},
        FrameBuffer, Rotation,
    },
    gauge::Gauge,
    panel::Panel,
    telemetry::{DeviceIdentity, Sampler},
    Result,
};

/// Longest single sleep, so an interrupt is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// State owned by the render loop for the life of the process.
pub struct RenderContext<P: Panel> {
    panel: P,
    frame: FrameBuffer,
    scheduler: RefreshScheduler,
    gauge: Option<Box<dyn Gauge>>,
    charge: Box<dyn ChargeInput>,
    power: PowerMonitor,
    rotation: Rotation,
    fonts: Fonts,
}

impl<P: Panel> RenderContext<P> {
    /// Build the context and draw the static chrome into the frame. No gauge
    /// and no charge input until [`with_power_inputs`](Self::with_power_inputs).
    pub fn new(
        panel: P,
        identity: &DeviceIdentity,
        scheduler: RefreshScheduler,
        rotation: Rotation,
    ) -> Self {
        let fonts = Fonts::default();
        let mut frame = FrameBuffer::new();
        render::draw_chrome(&mut frame, identity, &fonts);
        Self {
            panel,
            frame,
            scheduler,
            gauge: None,
            charge: Box::new(NoChargeInput),
            power: PowerMonitor::new(),
            rotation,
            fonts,
        }
    }

    pub fn with_power_inputs(
        mut self,
        gauge: Option<Box<dyn Gauge>>,
        charge: Box<dyn ChargeInput>,
    ) -> Self {
        self.gauge = gauge;
        self.charge = charge;
        self
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub refresh: RefreshKind,
    pub power: PowerDecision,
    pub text: FrameText,
    pub charging_icon: Option<Point>,
    pub elapsed: Duration,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Interrupted,
    BatteryExhausted,
    SingleShot,
}

/// Time left in the period after a cycle that took `elapsed`.
pub fn sleep_budget(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Fixed-period sample, render and refresh loop.
pub struct ControlLoop<P: Panel, S: Sampler> {
    ctx: RenderContext<P>,
    sampler: S,
    period: Duration,
}

impl<P: Panel, S: Sampler> ControlLoop<P, S> {
    pub fn new(ctx: RenderContext<P>, sampler: S, period: Duration) -> Self {
        Self {
            ctx,
            sampler,
            period,
        }
    }

    pub fn context(&self) -> &RenderContext<P> {
        &self.ctx
    }

    pub fn into_context(self) -> RenderContext<P> {
        self.ctx
    }

    /// One iteration: sample, classify power, compose and push the frame.
    pub fn run_once(&mut self) -> Result<CycleReport> {
        let start = Instant::now();
        let ctx = &mut self.ctx;

        let gauge = match ctx.gauge.as_mut() {
            Some(gauge) => Some(&mut **gauge as &mut dyn Gauge),
            None => None,
        };
        let snapshot = self.sampler.sample(gauge)?;
        let charging = ctx.charge.is_charging();
        let power = ctx.power.observe(snapshot.battery.as_ref(), charging);

        let text = FrameText::from_snapshot(&snapshot, &ctx.fonts);
        let charging_icon = render::draw_values(
            &mut ctx.frame,
            &text,
            snapshot.battery.as_ref(),
            power.state == PowerState::OnPower,
            &ctx.fonts,
        );
        let image = ctx.panel.get_buffer(&ctx.frame, ctx.rotation);
        let refresh = ctx.scheduler.refresh(&mut ctx.panel, &image, Instant::now())?;

        Ok(CycleReport {
            refresh,
            power,
            text,
            charging_icon,
            elapsed: start.elapsed(),
        })
    }

    /// Run until interrupted, the battery is exhausted, or after one cycle
    /// when `once` is set. Errors end the loop immediately.
    pub fn run(&mut self, running: &AtomicBool, once: bool) -> Result<LoopExit> {
        loop {
            if !running.load(Ordering::SeqCst) {
                log::info!("interrupt received, stopping");
                return Ok(LoopExit::Interrupted);
            }
            let report = self.run_once()?;
            log::trace!(
                "cycle: {:?} in {}",
                report.refresh,
                humantime::format_duration(report.elapsed)
            );
            if report.power.shutdown {
                return Ok(LoopExit::BatteryExhausted);
            }
            if once {
                return Ok(LoopExit::SingleShot);
            }
            let budget = sleep_budget(self.period, report.elapsed);
            if budget.is_zero() {
                log::debug!(
                    "cycle overran the {} period",
                    humantime::format_duration(self.period)
                );
            }
            sleep_while_running(budget, running);
        }
    }

    /// Blank, sleep and release the panel.
    pub fn shutdown(&mut self) -> Result<()> {
        lifecycle::run_shutdown_sequence(&mut self.ctx.panel)
    }
}

fn sleep_while_running(budget: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + budget;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() || !running.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(left.min(SLEEP_SLICE));
    }
}
