use std::collections::HashSet;

use crate::paint::Color;
use crate::shader::ShaderStage;

use super::geometry::{check_layout, check_upload};
use super::registry::{check_pipeline_state, ProgramRegistry};
use super::{GeometryUpload, GraphicsContext, RenderContext, ResourceId, ResourceTable, VertexLayout};

/// Frame-level command recorded by [`HeadlessContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum FrameCommand {
    UseProgram(ResourceId),
    Clear(Color),
    Draw {
        program: ResourceId,
        first: u32,
        count: u32,
    },
    Present,
    PollEvents,
}

#[derive(Debug)]
struct VertexBuffer {
    data: Vec<f32>,
}

/// GPU-less context.
///
/// Runs the same WGSL front-end and object model as the native context, keeps
/// uploaded vertices in memory and records every frame command. Closes after a
/// scripted number of presented frames, or on [`request_close`](Self::request_close).
#[derive(Debug, Default)]
pub struct HeadlessContext {
    registry: ProgramRegistry<()>,
    buffers: ResourceTable<VertexBuffer>,

    bound_program: ResourceId,
    layout: Option<VertexLayout>,

    commands: Vec<FrameCommand>,
    rejected_draws: u64,
    warned: HashSet<(ResourceId, Option<VertexLayout>)>,

    frames_presented: u64,
    close_after: Option<u64>,
    close_requested: bool,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports "should close" once `frames` frames have been presented.
    pub fn close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn commands(&self) -> &[FrameCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<FrameCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Draw calls dropped because the pipeline state was invalid.
    pub fn rejected_draws(&self) -> u64 {
        self.rejected_draws
    }

    pub fn bound_program(&self) -> ResourceId {
        self.bound_program
    }

    pub fn live_shaders(&self) -> usize {
        self.registry.live_shaders()
    }

    pub fn live_programs(&self) -> usize {
        self.registry.live_programs()
    }

    pub fn vertex_data(&self, buffer: ResourceId) -> Option<&[f32]> {
        self.buffers.get(buffer).map(|b| b.data.as_slice())
    }

    fn reject_draw(&mut self, reason: &str) {
        self.rejected_draws += 1;
        if self.warned.insert((self.bound_program, self.layout)) {
            log::warn!("draw skipped (program {}): {reason}", self.bound_program);
        }
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_shader(&mut self, stage: ShaderStage) -> ResourceId {
        self.registry.create_shader(stage)
    }

    fn shader_source(&mut self, shader: ResourceId, source: &str) {
        self.registry.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ResourceId) {
        self.registry.compile_shader(shader, |_, _, _| ());
    }

    fn compile_status(&self, shader: ResourceId) -> bool {
        self.registry.compile_status(shader)
    }

    fn shader_diagnostic(&self, shader: ResourceId) -> Option<String> {
        self.registry.shader_diagnostic(shader)
    }

    fn delete_shader(&mut self, shader: ResourceId) {
        self.registry.delete_shader(shader);
    }

    fn is_shader(&self, shader: ResourceId) -> bool {
        self.registry.is_shader(shader)
    }

    fn create_program(&mut self) -> ResourceId {
        self.registry.create_program()
    }

    fn attach_shader(&mut self, program: ResourceId, shader: ResourceId) {
        self.registry.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: ResourceId) {
        self.registry.link_program(program);
    }

    fn link_status(&self, program: ResourceId) -> bool {
        self.registry.link_status(program)
    }

    fn validate_program(&mut self, program: ResourceId) {
        self.registry.validate_program(program, self.layout.as_ref());
    }

    fn validate_status(&self, program: ResourceId) -> bool {
        self.registry.validate_status(program)
    }

    fn program_diagnostic(&self, program: ResourceId) -> Option<String> {
        self.registry.program_diagnostic(program)
    }

    fn delete_program(&mut self, program: ResourceId) {
        self.registry.delete_program(program);
        if self.bound_program == program {
            self.bound_program = ResourceId::NULL;
        }
    }

    fn is_program(&self, program: ResourceId) -> bool {
        self.registry.is_program(program)
    }

    fn use_program(&mut self, program: ResourceId) {
        if !program.is_null() && !self.registry.link_status(program) {
            log::warn!("use_program: program {program} is not linked");
            return;
        }
        self.bound_program = program;
        self.commands.push(FrameCommand::UseProgram(program));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(FrameCommand::Clear(color));
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        let Some(linked) = self.registry.linked(self.bound_program) else {
            self.reject_draw("no linked program bound");
            return;
        };
        if let Err(reason) = check_pipeline_state(linked, self.layout.as_ref()) {
            self.reject_draw(&reason);
            return;
        }

        let available = self
            .layout
            .and_then(|l| self.buffers.get(l.buffer).map(|b| l.vertices_in(b.data.len())))
            .unwrap_or(0);
        if first.saturating_add(count) > available {
            self.reject_draw("vertex range exceeds bound buffer");
            return;
        }

        self.commands.push(FrameCommand::Draw {
            program: self.bound_program,
            first,
            count,
        });
    }
}

impl GeometryUpload for HeadlessContext {
    fn upload_static_vertices(&mut self, data: &[f32], dims: u32) -> anyhow::Result<ResourceId> {
        check_upload(data, dims)?;
        Ok(self.buffers.insert(VertexBuffer {
            data: data.to_vec(),
        }))
    }

    fn bind_vertex_layout(&mut self, buffer: ResourceId, attribute_index: u32, dims: u32) {
        let Some(buf) = self.buffers.get(buffer) else {
            log::warn!("bind_vertex_layout: unknown buffer {buffer}");
            return;
        };
        if let Err(err) = check_layout(buf.data.len(), dims) {
            log::warn!("bind_vertex_layout: buffer {buffer}: {err}");
            return;
        }
        self.layout = Some(VertexLayout {
            buffer,
            attribute: attribute_index,
            dims,
        });
    }

    fn vertex_layout(&self) -> Option<VertexLayout> {
        self.layout
    }

    fn delete_buffer(&mut self, buffer: ResourceId) {
        self.buffers.remove(buffer);
        if self.layout.is_some_and(|l| l.buffer == buffer) {
            self.layout = None;
        }
    }
}

impl RenderContext for HeadlessContext {
    fn should_close(&self) -> bool {
        self.close_requested || self.close_after.is_some_and(|n| self.frames_presented >= n)
    }

    fn swap_buffers(&mut self) {
        self.frames_presented += 1;
        self.commands.push(FrameCommand::Present);
    }

    fn poll_events(&mut self) {
        self.commands.push(FrameCommand::PollEvents);
    }

    fn driver_info(&self) -> String {
        "headless (naga front-end, no GPU)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::builtin;

    fn linked_program(ctx: &mut HeadlessContext) -> ResourceId {
        let vs = ctx.create_shader(ShaderStage::Vertex);
        ctx.shader_source(vs, builtin::PASSTHROUGH_VERTEX);
        ctx.compile_shader(vs);
        let fs = ctx.create_shader(ShaderStage::Fragment);
        ctx.shader_source(fs, builtin::SOLID_WHITE_FRAGMENT);
        ctx.compile_shader(fs);
        let p = ctx.create_program();
        ctx.attach_shader(p, vs);
        ctx.attach_shader(p, fs);
        ctx.link_program(p);
        ctx.delete_shader(vs);
        ctx.delete_shader(fs);
        p
    }

    #[test]
    fn draw_without_layout_is_rejected() {
        let mut ctx = HeadlessContext::new();
        let p = linked_program(&mut ctx);
        ctx.use_program(p);
        ctx.draw_arrays(0, 3);
        assert_eq!(ctx.rejected_draws(), 1);
        assert!(!ctx.commands().iter().any(|c| matches!(c, FrameCommand::Draw { .. })));
    }

    #[test]
    fn draw_with_full_state_is_recorded() {
        let mut ctx = HeadlessContext::new();
        let buf = ctx.upload_static_vertices(&[0.0; 6], 2).unwrap();
        ctx.bind_vertex_layout(buf, 0, 2);
        let p = linked_program(&mut ctx);
        ctx.use_program(p);
        ctx.draw_arrays(0, 3);
        assert_eq!(ctx.rejected_draws(), 0);
        assert_eq!(
            ctx.commands().last(),
            Some(&FrameCommand::Draw {
                program: p,
                first: 0,
                count: 3
            })
        );
    }

    #[test]
    fn draw_past_buffer_end_is_rejected() {
        let mut ctx = HeadlessContext::new();
        let buf = ctx.upload_static_vertices(&[0.0; 6], 2).unwrap();
        ctx.bind_vertex_layout(buf, 0, 2);
        let p = linked_program(&mut ctx);
        ctx.use_program(p);
        ctx.draw_arrays(1, 3);
        assert_eq!(ctx.rejected_draws(), 1);
    }

    #[test]
    fn rebinding_with_wider_dims_shrinks_drawable_range() {
        let mut ctx = HeadlessContext::new();
        let buf = ctx.upload_static_vertices(&[0.0; 6], 2).unwrap();
        ctx.bind_vertex_layout(buf, 0, 3);
        let p = linked_program(&mut ctx);
        ctx.use_program(p);

        ctx.draw_arrays(0, 3);
        assert_eq!(ctx.rejected_draws(), 1);

        ctx.draw_arrays(0, 2);
        assert_eq!(ctx.rejected_draws(), 1);
        assert_eq!(
            ctx.commands().last(),
            Some(&FrameCommand::Draw {
                program: p,
                first: 0,
                count: 2
            })
        );
    }

    #[test]
    fn unsupported_layout_dims_are_not_bound() {
        let mut ctx = HeadlessContext::new();
        let buf = ctx.upload_static_vertices(&[0.0; 10], 2).unwrap();
        let p = linked_program(&mut ctx);

        ctx.bind_vertex_layout(buf, 0, 0);
        ctx.validate_program(p);
        assert!(!ctx.validate_status(p));

        ctx.bind_vertex_layout(buf, 0, 5);
        ctx.validate_program(p);
        assert!(!ctx.validate_status(p));

        ctx.bind_vertex_layout(buf, 0, 2);
        ctx.validate_program(p);
        assert!(ctx.validate_status(p));
    }

    #[test]
    fn use_program_refuses_unlinked() {
        let mut ctx = HeadlessContext::new();
        let p = ctx.create_program();
        ctx.link_program(p);
        ctx.use_program(p);
        assert_eq!(ctx.bound_program(), ResourceId::NULL);
    }

    #[test]
    fn closes_after_scripted_frames() {
        let mut ctx = HeadlessContext::new().close_after(2);
        assert!(!ctx.should_close());
        ctx.swap_buffers();
        assert!(!ctx.should_close());
        ctx.swap_buffers();
        assert!(ctx.should_close());
    }

    #[test]
    fn deleting_bound_buffer_unbinds_layout() {
        let mut ctx = HeadlessContext::new();
        let buf = ctx.upload_static_vertices(&[0.0; 6], 2).unwrap();
        ctx.bind_vertex_layout(buf, 0, 2);
        ctx.delete_buffer(buf);
        assert!(ctx.vertex_data(buf).is_none());

        let p = linked_program(&mut ctx);
        ctx.validate_program(p);
        assert!(!ctx.validate_status(p));
    }
}
