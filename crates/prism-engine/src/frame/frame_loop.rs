use std::fmt;
use std::time::Duration;

use crate::gfx::{GeometryUpload, GraphicsContext, RenderContext, ResourceId};
use crate::paint::Color;
use crate::shader::{LinkStatus, ShaderProgram};
use crate::time::FrameClock;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Vertex range drawn each frame from the bound vertex layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawRange {
    pub first: u32,
    pub count: u32,
}

impl DrawRange {
    pub const fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }

    /// The first `count` vertices.
    pub const fn vertices(count: u32) -> Self {
        Self { first: 0, count }
    }
}

/// Returned when a loop cannot start from the current context state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FrameLoopError {
    NotLinked {
        program: ResourceId,
        status: LinkStatus,
    },
    NoVertexLayout,
}

impl fmt::Display for FrameLoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLinked { program, status } => {
                write!(f, "program {program} is not bindable (status {status:?})")
            }
            Self::NoVertexLayout => f.write_str("no vertex layout is bound"),
        }
    }
}

impl std::error::Error for FrameLoopError {}

/// Summary of a finished render session.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub elapsed: Duration,
}

impl FrameStats {
    pub fn mean_frame_time(&self) -> Option<Duration> {
        u32::try_from(self.frames)
            .ok()
            .filter(|&n| n > 0)
            .map(|n| self.elapsed / n)
    }
}

/// Drives frames until the render context reports close intent.
///
/// Each iteration checks `should_close` first; only then does it clear,
/// draw the configured range with the loop's program, present and poll.
/// Once `Terminated`, further steps are no-ops.
#[derive(Debug)]
pub struct FrameLoop {
    program: ResourceId,
    range: DrawRange,
    clear_color: Color,
    state: LoopState,
    bound: bool,
    clock: FrameClock,
}

impl FrameLoop {
    /// Accepts only a linked program, with a vertex layout already bound on `ctx`.
    pub fn new<C>(
        ctx: &C,
        program: &ShaderProgram,
        range: DrawRange,
    ) -> Result<Self, FrameLoopError>
    where
        C: GeometryUpload + ?Sized,
    {
        if program.status() != LinkStatus::Linked || program.handle().is_null() {
            return Err(FrameLoopError::NotLinked {
                program: program.handle(),
                status: program.status(),
            });
        }
        if ctx.vertex_layout().is_none() {
            return Err(FrameLoopError::NoVertexLayout);
        }

        Ok(Self {
            program: program.handle(),
            range,
            clear_color: Color::BLACK,
            state: LoopState::Running,
            bound: false,
            clock: FrameClock::new(),
        })
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    /// Runs one iteration.
    pub fn step<C>(&mut self, ctx: &mut C) -> LoopState
    where
        C: RenderContext + GraphicsContext + ?Sized,
    {
        if self.state == LoopState::Terminated {
            return LoopState::Terminated;
        }

        if ctx.should_close() {
            log::debug!("close requested after {} frames", self.clock.frames());
            self.state = LoopState::Terminated;
            return self.state;
        }

        if !self.bound {
            ctx.use_program(self.program);
            self.bound = true;
        }

        ctx.clear(self.clear_color);
        ctx.draw_arrays(self.range.first, self.range.count);
        ctx.swap_buffers();
        ctx.poll_events();

        let ft = self.clock.tick();
        log::trace!("frame {} dt={:.4}s", ft.frame_index, ft.dt);

        LoopState::Running
    }

    /// Binds the program and steps until terminated.
    pub fn run<C>(mut self, ctx: &mut C) -> FrameStats
    where
        C: RenderContext + GraphicsContext + ?Sized,
    {
        self.clock.reset();
        while self.step(ctx) == LoopState::Running {}

        FrameStats {
            frames: self.clock.frames(),
            elapsed: self.clock.elapsed(),
        }
    }
}
