use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::{Window, WindowId};

use super::WindowConfig;

/// Event sink for pumped winit events.
///
/// Creates the window on the first `resumed`, then only records what the
/// context cares about: close intent and size changes.
pub(crate) struct EventPump {
    config: WindowConfig,
    window_id: Option<WindowId>,
    created: Option<Window>,
    create_error: Option<anyhow::Error>,

    close_requested: bool,
    resized: Option<PhysicalSize<u32>>,
    rescaled: bool,
}

impl EventPump {
    pub(crate) fn new(config: WindowConfig) -> Self {
        Self {
            config,
            window_id: None,
            created: None,
            create_error: None,
            close_requested: false,
            resized: None,
            rescaled: false,
        }
    }

    /// Hands over the window created during startup, once.
    pub(crate) fn take_window(&mut self) -> Option<Window> {
        self.created.take()
    }

    pub(crate) fn take_create_error(&mut self) -> Option<anyhow::Error> {
        self.create_error.take()
    }

    pub(crate) fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub(crate) fn take_resize(&mut self) -> Option<PhysicalSize<u32>> {
        self.resized.take()
    }

    pub(crate) fn take_rescale(&mut self) -> bool {
        std::mem::take(&mut self.rescaled)
    }
}

impl ApplicationHandler for EventPump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);

        if self.window_id.is_some() || self.create_error.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                log::debug!("window created: {:?}", window.id());
                self.window_id = Some(window.id());
                self.created = Some(window);
            }
            Err(e) => {
                self.create_error = Some(anyhow::Error::new(e).context("failed to create window"));
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window_id != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => self.resized = Some(size),
            WindowEvent::ScaleFactorChanged { .. } => self.rescaled = true,
            _ => {}
        }
    }
}
