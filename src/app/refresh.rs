use std::time::{Duration, Instant};

use crate::{panel::Panel, Result};

/// How a frame was pushed to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// First frame: written to both RAM banks as the base for partial updates.
    Baseline,
    /// Full refresh to clear ghosting, then a new base image.
    Full,
    Partial,
}

/// Decides between partial and periodic full refreshes.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: Duration,
    last_full: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(full_update_interval: Duration) -> Self {
        Self {
            interval: full_update_interval,
            last_full: None,
        }
    }

    /// What `refresh` would do at `now`.
    pub fn plan(&self, now: Instant) -> RefreshKind {
        match self.last_full {
            None => RefreshKind::Baseline,
            // A `now` older than the stamp saturates to zero and stays partial.
            Some(last) if now.saturating_duration_since(last) > self.interval => RefreshKind::Full,
            Some(_) => RefreshKind::Partial,
        }
    }

    /// Push `image` to the panel. The full-refresh stamp moves only after the
    /// panel accepted the frame.
    pub fn refresh<P: Panel + ?Sized>(
        &mut self,
        panel: &mut P,
        image: &[u8],
        now: Instant,
    ) -> Result<RefreshKind> {
        let kind = self.plan(now);
        match kind {
            RefreshKind::Baseline => panel.display_part_base_image(image)?,
            RefreshKind::Full => {
                log::debug!("full refresh");
                panel.display(image)?;
                panel.display_part_base_image(image)?;
            }
            RefreshKind::Partial => panel.display_partial(image)?,
        }
        if kind != RefreshKind::Partial {
            self.last_full = Some(now);
        }
        Ok(kind)
    }

    pub fn last_full(&self) -> Option<Instant> {
        self.last_full
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
