//! The e-paper panel as the render loop sees it.
//!
//! [`EpdPanel`] drives real hardware through the SSD1680 driver;
//! [`MemoryPanel`] records what would have been sent and backs `--dry-run`
//! and the tests.

use crate::{
    display::{FrameBuffer, Rotation},
    epd_driver::{rppal_link::RppalLink, EpdLink, EpdPins, Ssd1680, BUFFER_LEN},
    Error, Result,
};

/// Operations the render loop and shutdown path need from a panel.
pub trait Panel {
    fn init(&mut self) -> Result<()>;
    fn clear(&mut self, fill: u8) -> Result<()>;

    /// Pack a landscape frame into the byte layout `display*` expects.
    fn get_buffer(&self, frame: &FrameBuffer, rotation: Rotation) -> Vec<u8> {
        frame.to_panel_bytes(rotation)
    }

    fn display_part_base_image(&mut self, image: &[u8]) -> Result<()>;
    fn display_partial(&mut self, image: &[u8]) -> Result<()>;
    fn display(&mut self, image: &[u8]) -> Result<()>;
    fn sleep(&mut self) -> Result<()>;
    /// Release the GPIO/SPI resources. Safe to call after a failed refresh.
    fn power_down(&mut self, cleanup: bool);
}

impl<P: Panel + ?Sized> Panel for Box<P> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn clear(&mut self, fill: u8) -> Result<()> {
        (**self).clear(fill)
    }

    fn get_buffer(&self, frame: &FrameBuffer, rotation: Rotation) -> Vec<u8> {
        (**self).get_buffer(frame, rotation)
    }

    fn display_part_base_image(&mut self, image: &[u8]) -> Result<()> {
        (**self).display_part_base_image(image)
    }

    fn display_partial(&mut self, image: &[u8]) -> Result<()> {
        (**self).display_partial(image)
    }

    fn display(&mut self, image: &[u8]) -> Result<()> {
        (**self).display(image)
    }

    fn sleep(&mut self) -> Result<()> {
        (**self).sleep()
    }

    fn power_down(&mut self, cleanup: bool) {
        (**self).power_down(cleanup)
    }
}

/// Hardware panel: an SSD1680 behind some link.
pub struct EpdPanel<L: EpdLink> {
    epd: Ssd1680<L>,
}

impl<L: EpdLink> EpdPanel<L> {
    pub fn new(epd: Ssd1680<L>) -> Self {
        Self { epd }
    }
}

impl<L: EpdLink> Panel for EpdPanel<L> {
    fn init(&mut self) -> Result<()> {
        self.epd.init()
    }

    fn clear(&mut self, fill: u8) -> Result<()> {
        self.epd.clear(fill)
    }

    fn display_part_base_image(&mut self, image: &[u8]) -> Result<()> {
        self.epd.display_part_base_image(image)
    }

    fn display_partial(&mut self, image: &[u8]) -> Result<()> {
        self.epd.display_partial(image)
    }

    fn display(&mut self, image: &[u8]) -> Result<()> {
        self.epd.display(image)
    }

    fn sleep(&mut self) -> Result<()> {
        self.epd.sleep()
    }

    fn power_down(&mut self, cleanup: bool) {
        self.epd.power_down(cleanup)
    }
}

/// One call recorded by [`MemoryPanel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCall {
    Init,
    Clear(u8),
    BaseImage,
    Partial,
    Full,
    Sleep,
    PowerDown(bool),
}

/// Panel that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryPanel {
    calls: Vec<PanelCall>,
    last_image: Option<Vec<u8>>,
    fail_on: Option<PanelCall>,
}

impl MemoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call matching `call` fail with a bus error.
    pub fn fail_on(mut self, call: PanelCall) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn calls(&self) -> &[PanelCall] {
        &self.calls
    }

    /// Most recent image passed to any `display*` call.
    pub fn last_image(&self) -> Option<&[u8]> {
        self.last_image.as_deref()
    }

    fn record(&mut self, call: PanelCall) -> Result<()> {
        if self.fail_on == Some(call) {
            self.fail_on = None;
            return Err(Error::Bus(format!("simulated {call:?} failure")));
        }
        log::trace!("panel: {call:?}");
        self.calls.push(call);
        Ok(())
    }

    fn record_image(&mut self, call: PanelCall, image: &[u8]) -> Result<()> {
        if image.len() != BUFFER_LEN {
            return Err(Error::InvalidArgs(format!(
                "panel image must be {BUFFER_LEN} bytes, got {}",
                image.len()
            )));
        }
        self.record(call)?;
        self.last_image = Some(image.to_vec());
        Ok(())
    }
}

impl Panel for MemoryPanel {
    fn init(&mut self) -> Result<()> {
        self.record(PanelCall::Init)
    }

    fn clear(&mut self, fill: u8) -> Result<()> {
        self.record(PanelCall::Clear(fill))
    }

    fn display_part_base_image(&mut self, image: &[u8]) -> Result<()> {
        self.record_image(PanelCall::BaseImage, image)
    }

    fn display_partial(&mut self, image: &[u8]) -> Result<()> {
        self.record_image(PanelCall::Partial, image)
    }

    fn display(&mut self, image: &[u8]) -> Result<()> {
        self.record_image(PanelCall::Full, image)
    }

    fn sleep(&mut self) -> Result<()> {
        self.record(PanelCall::Sleep)
    }

    fn power_down(&mut self, cleanup: bool) {
        self.calls.push(PanelCall::PowerDown(cleanup));
    }
}

/// Open the hardware panel, or an in-memory one for dry runs.
pub fn open(dry_run: bool) -> Result<Box<dyn Panel>> {
    if dry_run {
        log::info!("dry run: panel output is discarded");
        return Ok(Box::new(MemoryPanel::new()));
    }
    let link = RppalLink::open(EpdPins::default())?;
    Ok(Box::new(EpdPanel::new(Ssd1680::new(link))))
}
