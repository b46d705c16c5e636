//! Native window + GPU context.
//!
//! Owns the winit `EventLoop` and `Window` plus the wgpu [`Gpu`](crate::device::Gpu),
//! and exposes them through the `gfx` traits. Events are pumped on demand
//! (`poll_events`) instead of handing control to `run_app`, so the caller owns
//! the frame loop.

mod config;
mod events;
mod native;
mod pipeline;

pub use config::WindowConfig;
pub use native::NativeContext;
