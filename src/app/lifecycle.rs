use crate::{panel::Panel, Error, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Install a SIGINT/SIGTERM handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

/// Blank the panel, put it to sleep and release its pins.
///
/// The pins are released even when an earlier step fails; the first failure
/// is returned.
pub fn run_shutdown_sequence<P: Panel + ?Sized>(panel: &mut P) -> Result<()> {
    let blanked = panel
        .init()
        .and_then(|()| panel.clear(0xFF))
        .and_then(|()| panel.sleep());
    panel.power_down(true);
    if let Err(err) = &blanked {
        log::error!("panel shutdown incomplete: {err}");
    }
    blanked
}
