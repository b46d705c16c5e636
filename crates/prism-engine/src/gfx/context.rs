use crate::paint::Color;
use crate::shader::ShaderStage;

use super::{ResourceId, VertexLayout};

/// Driver-level shader/program and draw protocol.
///
/// All "currently bound" state (program, vertex layout) belongs to the
/// implementing object; nothing is ambient. Operations on unknown ids are
/// ignored and status queries on them report `false`.
pub trait GraphicsContext {
    fn create_shader(&mut self, stage: ShaderStage) -> ResourceId;
    fn shader_source(&mut self, shader: ResourceId, source: &str);
    fn compile_shader(&mut self, shader: ResourceId);
    fn compile_status(&self, shader: ResourceId) -> bool;
    /// Full info log of the last compile, or `None` when it is empty.
    fn shader_diagnostic(&self, shader: ResourceId) -> Option<String>;
    fn delete_shader(&mut self, shader: ResourceId);
    fn is_shader(&self, shader: ResourceId) -> bool;

    fn create_program(&mut self) -> ResourceId;
    fn attach_shader(&mut self, program: ResourceId, shader: ResourceId);
    fn link_program(&mut self, program: ResourceId);
    fn link_status(&self, program: ResourceId) -> bool;
    /// Checks the program against the current pipeline state.
    fn validate_program(&mut self, program: ResourceId);
    fn validate_status(&self, program: ResourceId) -> bool;
    /// Link + validation log, or `None` when it is empty.
    fn program_diagnostic(&self, program: ResourceId) -> Option<String>;
    fn delete_program(&mut self, program: ResourceId);
    fn is_program(&self, program: ResourceId) -> bool;
    /// Binds `program` for subsequent draws. `ResourceId::NULL` unbinds.
    fn use_program(&mut self, program: ResourceId);

    fn clear(&mut self, color: Color);
    /// Draws `count` vertices starting at `first` as a triangle list using the
    /// bound program and vertex layout.
    fn draw_arrays(&mut self, first: u32, count: u32);
}

/// Static vertex data upload.
pub trait GeometryUpload {
    /// Uploads `data` as `data.len() / dims` vertices of `dims` floats.
    fn upload_static_vertices(&mut self, data: &[f32], dims: u32) -> anyhow::Result<ResourceId>;
    /// Binds `buffer` as the source of float attribute `attribute_index`.
    fn bind_vertex_layout(&mut self, buffer: ResourceId, attribute_index: u32, dims: u32);
    /// Layout used by the next draw, if one is bound.
    fn vertex_layout(&self) -> Option<VertexLayout>;
    fn delete_buffer(&mut self, buffer: ResourceId);
}

/// Window + presentation side of a context.
pub trait RenderContext {
    fn should_close(&self) -> bool;
    /// Presents the completed frame. May block on vsync.
    fn swap_buffers(&mut self);
    /// Processes pending window/input events; may set close intent.
    fn poll_events(&mut self);
    /// One-line driver/adapter description, for logging.
    fn driver_info(&self) -> String;
}
