//! Frame composition for the 250x122 landscape panel.

pub mod frame;
pub mod layout;
pub mod render;

pub use frame::{FrameBuffer, Rotation};
pub use layout::DisplayRegion;
