use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::time::Duration;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use wgpu::util::DeviceExt;
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::Window;

use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::gfx::registry::{check_pipeline_state, ProgramRegistry};
use crate::gfx::{
    check_layout, check_upload, GeometryUpload, GraphicsContext, RenderContext, ResourceId,
    ResourceTable, VertexLayout,
};
use crate::paint::Color;
use crate::shader::ShaderStage;

use super::events::EventPump;
use super::pipeline;
use super::WindowConfig;

/// Startup pumps allowed before giving up on window creation.
const STARTUP_PUMPS: usize = 100;
const STARTUP_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct VertexBuffer {
    buffer: wgpu::Buffer,
    floats: usize,
}

type PipelineKey = (ResourceId, Option<VertexLayout>);

struct PendingDraw {
    key: PipelineKey,
    vertices: Range<u32>,
}

/// Commands recorded since the last present.
#[derive(Default)]
struct PendingFrame {
    clear: Option<Color>,
    draws: Vec<PendingDraw>,
}

/// Window + wgpu device implementing the `gfx` traits.
///
/// Clear and draw calls are recorded and encoded into a single render pass
/// when the frame is presented by `swap_buffers`.
pub struct NativeContext {
    registry: ProgramRegistry<wgpu::ShaderModule>,
    buffers: ResourceTable<VertexBuffer>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    bound_program: ResourceId,
    layout: Option<VertexLayout>,
    frame: PendingFrame,
    warned: HashSet<PipelineKey>,
    closing: bool,

    // Window (and the surface borrowing it) must drop before the event loop.
    entry: WindowEntry,
    events: EventPump,
    event_loop: EventLoop<()>,
}

impl NativeContext {
    /// Opens the window and acquires the GPU.
    ///
    /// Any failure here is fatal for the caller: no rendering is possible
    /// without a context.
    pub fn create(config: WindowConfig, gpu_init: GpuInit) -> Result<Self> {
        let mut event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut events = EventPump::new(config);

        let mut window = None;
        for _ in 0..STARTUP_PUMPS {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(STARTUP_PUMP_TIMEOUT), &mut events)
            {
                anyhow::bail!("event loop exited during startup (code {code})");
            }
            if let Some(err) = events.take_create_error() {
                return Err(err);
            }
            window = events.take_window();
            if window.is_some() {
                break;
            }
        }
        let window = window.context("window was not created during startup")?;

        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        Ok(Self {
            registry: ProgramRegistry::default(),
            buffers: ResourceTable::default(),
            pipelines: HashMap::new(),
            bound_program: ResourceId::NULL,
            layout: None,
            frame: PendingFrame::default(),
            warned: HashSet::new(),
            closing: false,
            entry,
            events,
            event_loop,
        })
    }

    pub fn window(&self) -> &Window {
        self.entry.borrow_window()
    }

    fn reject_draw(&mut self, key: PipelineKey, reason: &str) {
        if self.warned.insert(key) {
            log::warn!("draw skipped (program {}): {reason}", key.0);
        }
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(linked) = self.registry.linked(key.0) else { return };

        let gpu = self.entry.borrow_gpu();
        let pipeline =
            pipeline::create_pipeline(gpu.device(), gpu.surface_format(), linked, key.1.as_ref());
        log::debug!("created pipeline for program {}", key.0);
        self.pipelines.insert(key, pipeline);
    }

    fn apply_size_changes(&mut self) {
        if let Some(size) = self.events.take_resize() {
            self.entry.with_gpu_mut(|gpu| gpu.resize(size));
        }
        if self.events.take_rescale() {
            let size = self.entry.borrow_window().inner_size();
            self.entry.with_gpu_mut(|gpu| gpu.resize(size));
        }
    }
}

fn encode_frame(
    frame: &mut GpuFrame,
    pending: &PendingFrame,
    pipelines: &HashMap<PipelineKey, wgpu::RenderPipeline>,
    buffers: &ResourceTable<VertexBuffer>,
) {
    let load = match pending.clear {
        Some(c) => wgpu::LoadOp::Clear(c.to_wgpu()),
        None => wgpu::LoadOp::Load,
    };

    let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("prism frame pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &frame.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    for draw in &pending.draws {
        let Some(pipeline) = pipelines.get(&draw.key) else { continue };
        rpass.set_pipeline(pipeline);

        if let Some(layout) = draw.key.1 {
            // Buffer deleted after the draw was recorded.
            let Some(vb) = buffers.get(layout.buffer) else { continue };
            rpass.set_vertex_buffer(0, vb.buffer.slice(..));
        }
        rpass.draw(draw.vertices.clone(), 0..1);
    }
}

impl GraphicsContext for NativeContext {
    fn create_shader(&mut self, stage: ShaderStage) -> ResourceId {
        self.registry.create_shader(stage)
    }

    fn shader_source(&mut self, shader: ResourceId, source: &str) {
        self.registry.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ResourceId) {
        let device = self.entry.borrow_gpu().device();
        self.registry.compile_shader(shader, |stage, source, _| {
            let label = format!("prism {stage} shader {shader}");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label.as_str()),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        });
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
        // A relinked program gets fresh pipelines.
        self.pipelines.retain(|key, _| key.0 != program);
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
        self.pipelines.retain(|key, _| key.0 != program);
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
    }

    fn clear(&mut self, color: Color) {
        self.frame.clear = Some(color);
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        let key = (self.bound_program, self.layout);

        let Some(linked) = self.registry.linked(self.bound_program) else {
            self.reject_draw(key, "no linked program bound");
            return;
        };
        if let Err(reason) = check_pipeline_state(linked, self.layout.as_ref()) {
            self.reject_draw(key, &reason);
            return;
        }

        let available = self
            .layout
            .and_then(|l| self.buffers.get(l.buffer).map(|b| l.vertices_in(b.floats)))
            .unwrap_or(0);
        let Some(end) = first.checked_add(count).filter(|&end| end <= available) else {
            self.reject_draw(key, "vertex range exceeds bound buffer");
            return;
        };

        self.ensure_pipeline(key);
        self.frame.draws.push(PendingDraw {
            key,
            vertices: first..end,
        });
    }
}

impl GeometryUpload for NativeContext {
    fn upload_static_vertices(&mut self, data: &[f32], dims: u32) -> Result<ResourceId> {
        let vertices = check_upload(data, dims)?;
        let buffer = self
            .entry
            .borrow_gpu()
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("prism static vertices"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = self.buffers.insert(VertexBuffer {
            buffer,
            floats: data.len(),
        });
        log::debug!("uploaded {vertices} vertices ({dims} floats each) to buffer {id}");
        Ok(id)
    }

    fn bind_vertex_layout(&mut self, buffer: ResourceId, attribute_index: u32, dims: u32) {
        let Some(buf) = self.buffers.get(buffer) else {
            log::warn!("bind_vertex_layout: unknown buffer {buffer}");
            return;
        };
        if let Err(err) = check_layout(buf.floats, dims) {
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
        if let Some(vb) = self.buffers.remove(buffer) {
            vb.buffer.destroy();
        }
        if self.layout.is_some_and(|l| l.buffer == buffer) {
            self.layout = None;
        }
        self.pipelines
            .retain(|key, _| key.1.is_none_or(|l| l.buffer != buffer));
    }
}

impl RenderContext for NativeContext {
    fn should_close(&self) -> bool {
        self.closing || self.events.close_requested()
    }

    fn swap_buffers(&mut self) {
        let pending = std::mem::take(&mut self.frame);
        let pipelines = &self.pipelines;
        let buffers = &self.buffers;

        let action = self.entry.with_mut(|fields| {
            let mut frame = match fields.gpu.begin_frame() {
                Ok(f) => f,
                Err(err) => {
                    log::debug!("surface error: {err}");
                    return Some(fields.gpu.handle_surface_error(err));
                }
            };

            encode_frame(&mut frame, &pending, pipelines, buffers);

            fields.window.pre_present_notify();
            fields.gpu.submit(frame);
            None
        });

        if action == Some(SurfaceErrorAction::Fatal) {
            log::error!("fatal surface error; closing");
            self.closing = true;
        }
    }

    fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.events)
        {
            log::info!("event loop exited (code {code})");
            self.closing = true;
        }
        self.apply_size_changes();
    }

    fn driver_info(&self) -> String {
        self.entry.borrow_gpu().adapter_summary()
    }
}
