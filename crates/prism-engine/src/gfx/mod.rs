//! Graphics-context abstraction.
//!
//! The shader compiler, linker and frame loop talk to the GPU only through the
//! traits defined here. Two contexts implement them:
//! - `window::NativeContext`: winit window + wgpu device
//! - [`HeadlessContext`]: no GPU; records commands (tests, CI smoke runs)

mod context;
mod geometry;
mod headless;
pub(crate) mod registry;
mod resource;

pub use context::{GeometryUpload, GraphicsContext, RenderContext};
pub use geometry::VertexLayout;
pub use headless::{FrameCommand, HeadlessContext};
pub use resource::ResourceId;

pub(crate) use geometry::{check_layout, check_upload};
pub(crate) use resource::ResourceTable;
