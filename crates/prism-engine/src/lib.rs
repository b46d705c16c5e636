//! Prism engine crate.
//!
//! Minimal real-time rendering bootstrap: a graphics context abstraction,
//! the shader program build pipeline (compile → link → validate) and a
//! clear/draw/present/poll frame loop.

pub mod device;
pub mod frame;
pub mod gfx;
pub mod logging;
pub mod paint;
pub mod shader;
pub mod time;
pub mod window;
