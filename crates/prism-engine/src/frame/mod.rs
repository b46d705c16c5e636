//! Render loop: clear → draw → present → poll, until the context asks to close.

mod frame_loop;

pub use frame_loop::{DrawRange, FrameLoop, FrameLoopError, FrameStats, LoopState};
