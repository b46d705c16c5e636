use anyhow::{Context, Result};

use prism_engine::device::GpuInit;
use prism_engine::frame::{DrawRange, FrameLoop};
use prism_engine::gfx::{GeometryUpload, RenderContext, ResourceId};
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::shader::{build_program, builtin};
use prism_engine::window::{NativeContext, WindowConfig};

/// Window/context creation failed.
const EXIT_CONTEXT_FAILURE: i32 = -1;
/// Startup failed after the context existed (geometry or shader program).
const EXIT_STARTUP_FAILURE: i32 = 1;

const NUM_DIMS: u32 = 2;
const NUM_POSITIONS: u32 = 3;

#[rustfmt::skip]
const POSITIONS: [f32; (NUM_DIMS * NUM_POSITIONS) as usize] = [
    -0.5,  0.5,
     0.5,  0.5,
     0.0, -0.5,
];

fn main() {
    init_logging(LoggingConfig::default());
    std::process::exit(run());
}

fn run() -> i32 {
    let config = WindowConfig::new(640, 480, "Hello World");
    let mut ctx = match NativeContext::create(config, GpuInit::default()) {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("failed to create render context: {e:#}");
            return EXIT_CONTEXT_FAILURE;
        }
    };

    log::info!("driver: {}", ctx.driver_info());

    let buffer = match upload_triangle(&mut ctx) {
        Ok(id) => id,
        Err(e) => {
            log::error!("{e:#}");
            return EXIT_STARTUP_FAILURE;
        }
    };

    let program = build_program(
        &mut ctx,
        builtin::PASSTHROUGH_VERTEX,
        builtin::SOLID_WHITE_FRAGMENT,
    );

    let frame_loop = match FrameLoop::new(&ctx, &program, DrawRange::vertices(NUM_POSITIONS)) {
        Ok(fl) => fl,
        Err(e) => {
            for d in program.diagnostics() {
                log::error!("{d}");
            }
            log::error!("cannot start render loop: {e}");
            program.destroy(&mut ctx);
            ctx.delete_buffer(buffer);
            return EXIT_STARTUP_FAILURE;
        }
    };

    let stats = frame_loop.run(&mut ctx);
    match stats.mean_frame_time() {
        Some(mean) => log::info!(
            "rendered {} frames in {:.2?} (mean {:.2?}/frame)",
            stats.frames,
            stats.elapsed,
            mean
        ),
        None => log::info!("closed before the first frame"),
    }

    program.destroy(&mut ctx);
    ctx.delete_buffer(buffer);
    0
}

fn upload_triangle(ctx: &mut NativeContext) -> Result<ResourceId> {
    let buffer = ctx
        .upload_static_vertices(&POSITIONS, NUM_DIMS)
        .context("failed to upload triangle vertices")?;
    ctx.bind_vertex_layout(buffer, 0, NUM_DIMS);
    Ok(buffer)
}
