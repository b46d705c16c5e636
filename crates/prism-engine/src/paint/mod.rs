//! Color representation used for clears.

mod color;

pub use color::Color;
