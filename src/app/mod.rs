mod egui_host;
mod input;

use crate::assets::source_for;
use crate::config::{config_path_from, ViewerConfig, CONFIG_ENV};
use crate::controller::{
    ContainerSize, CursorAffordance, FrameRequest, Host, ListenerKind, SceneController, SceneEvents,
};
use crate::render::{queue_overlay, GpuRenderer, OverlayQueue, RenderBackend, RenderError};
use crate::ui::Overlay;
use egui_host::EguiHost;
use input::{map_mouse_button, wheel_delta_y, PointerTracker};

use glam::Vec2;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowAttributes, WindowId};

/// The scene's container is the whole window.
struct WindowHost {
    window: Arc<Window>,
    overlay: OverlayQueue,
    surface_present: bool,
    listeners: HashSet<ListenerKind>,
    next_request: u64,
    pending_frame: Option<FrameRequest>,
}

impl WindowHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            overlay: Rc::new(RefCell::new(None)),
            surface_present: false,
            listeners: HashSet::new(),
            next_request: 0,
            pending_frame: None,
        }
    }

    fn listens(&self, kind: ListenerKind) -> bool {
        self.listeners.contains(&kind)
    }
}

impl Host for WindowHost {
    fn container_size(&self) -> ContainerSize {
        let size = self
            .window
            .inner_size()
            .to_logical::<f32>(self.window.scale_factor());
        ContainerSize::new(size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn create_surface(&mut self) -> Result<Box<dyn RenderBackend>, RenderError> {
        let renderer = GpuRenderer::new(self.window.clone(), self.overlay.clone())?;
        self.surface_present = true;
        Ok(Box::new(renderer))
    }

    fn remove_surface(&mut self) {
        if self.surface_present {
            log::debug!("Render surface released");
        }
        self.surface_present = false;
        self.overlay.borrow_mut().take();
    }

    fn add_listener(&mut self, kind: ListenerKind) {
        self.listeners.insert(kind);
    }

    fn remove_listener(&mut self, kind: ListenerKind) {
        self.listeners.remove(&kind);
    }

    /// Redraws are requested from `about_to_wait`, paced to the monitor.
    fn request_frame(&mut self) -> FrameRequest {
        self.next_request += 1;
        let request = FrameRequest(self.next_request);
        self.pending_frame = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending_frame == Some(request) {
            self.pending_frame = None;
        }
    }

    fn set_cursor(&mut self, cursor: CursorAffordance) {
        let icon = match cursor {
            CursorAffordance::Grab => CursorIcon::Grab,
            CursorAffordance::Grabbing => CursorIcon::Grabbing,
            CursorAffordance::Pointer => CursorIcon::Pointer,
        };
        self.window.set_cursor(icon);
    }
}

/// Navigation sink: logs the target and shows it in the title bar.
struct WindowNavigation {
    window: Arc<Window>,
    base_title: String,
}

impl SceneEvents for WindowNavigation {
    fn on_hover(&mut self, title: Option<&str>, pointer: Vec2) {
        match title {
            Some(title) => log::debug!("Hovering '{title}' at ({:.0}, {:.0})", pointer.x, pointer.y),
            None => log::debug!("Hover cleared"),
        }
    }

    fn on_activate(&mut self, path: &str) {
        log::info!("Navigate to {path}");
        self.window.set_title(&format!("{} · {path}", self.base_title));
    }
}

struct Running {
    window: Arc<Window>,
    host: WindowHost,
    controller: SceneController,
    egui: EguiHost,
    pointer: PointerTracker,
}

pub struct App {
    config: ViewerConfig,
    overlay: Overlay,
    running: Option<Running>,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    close_requested: bool,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            overlay: Overlay::new(&config.overlay),
            config,
            running: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            close_requested: false,
        }
    }

    fn start(&mut self, window: Arc<Window>) {
        let mut host = WindowHost::new(window.clone());
        let events = WindowNavigation {
            window: window.clone(),
            base_title: self.config.window.title.clone(),
        };
        let controller = SceneController::attach(
            &mut host,
            &self.config,
            self.config.sections.clone(),
            source_for(&self.config.asset.location),
            Box::new(events),
        );
        let egui = EguiHost::new(&window);
        self.update_target_frame_duration(&window);
        self.running = Some(Running {
            window,
            host,
            controller,
            egui,
            pointer: PointerTracker::default(),
        });
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.as_mut() {
            running.controller.detach(&mut running.host);
        }
        self.close_requested = true;
        event_loop.exit();
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn redraw(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        // Redraws the OS asks for on its own carry no frame request.
        let Some(request) = running.host.pending_frame.take() else {
            return;
        };

        let tooltip = running
            .controller
            .tooltip_anchor()
            .map(|anchor| (anchor, running.controller.tooltip().text.as_str()));
        let overlay = &self.overlay;
        let paint = running
            .egui
            .paint(&running.window, |ctx| overlay.show(ctx, tooltip));
        queue_overlay(&running.host.overlay, paint);

        running
            .controller
            .tick(&mut running.host, request, Instant::now());
    }

    fn is_exit_request(event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => true,
            WindowEvent::KeyboardInput { event, .. } => {
                event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
            }
            _ => false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.close_requested {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);

        match event_loop.create_window(window_attrs) {
            Ok(window) => self.start(Arc::new(window)),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if Self::is_exit_request(&event) {
            self.shutdown(event_loop);
            return;
        }
        if matches!(event, WindowEvent::RedrawRequested) {
            self.redraw();
            return;
        }
        if matches!(
            event,
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } | WindowEvent::Moved(_)
        ) {
            if let Some(window) = self.running.as_ref().map(|r| r.window.clone()) {
                self.update_target_frame_duration(&window);
            }
        }

        let Some(running) = self.running.as_mut() else {
            return;
        };
        // Only new presses and wheel steps yield to egui; drags must still end.
        let egui_consumed = running.egui.on_window_event(&running.window, &event);
        let scale_factor = running.window.scale_factor();

        match event {
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if running.host.listens(ListenerKind::Resize) {
                    running.controller.resize(&mut running.host);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let sample = running.pointer.moved(position, scale_factor);
                if running.host.listens(ListenerKind::PointerMove) {
                    running.controller.pointer_move(&mut running.host, sample);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(sample) = running.pointer.left() {
                    if running.host.listens(ListenerKind::PointerLeave) {
                        running.controller.pointer_leave(&mut running.host, sample);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = map_mouse_button(button) else {
                    return;
                };
                match state {
                    ElementState::Pressed if egui_consumed => {}
                    ElementState::Pressed => {
                        if let Some(sample) = running.pointer.pressed(button) {
                            if running.host.listens(ListenerKind::PointerDown) {
                                running
                                    .controller
                                    .pointer_down(&mut running.host, button, sample);
                            }
                        }
                    }
                    ElementState::Released => {
                        if let Some((sample, click)) = running.pointer.released(button) {
                            if running.host.listens(ListenerKind::PointerUp) {
                                running.controller.pointer_up(&mut running.host, sample);
                            }
                            if click && running.host.listens(ListenerKind::Click) {
                                running.controller.click(&mut running.host, sample);
                            }
                        }
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !egui_consumed && running.host.listens(ListenerKind::Wheel) {
                    running
                        .controller
                        .wheel(&mut running.host, wheel_delta_y(delta, scale_factor));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_ref() else {
            return;
        };
        if running.host.pending_frame.is_none() {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        let now = Instant::now();
        if now >= self.next_frame_time {
            running.window.request_redraw();
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut running) = self.running.take() {
            if running.controller.is_attached() {
                running.controller.detach(&mut running.host);
            }
        }
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = config_path_from(&args, std::env::var(CONFIG_ENV).ok());
    let config = match ViewerConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}; falling back to built-in defaults");
            ViewerConfig::default()
        }
    };

    log::info!("🚀 {}", config.window.title);
    log::info!("   Model: {}", config.asset.location);
    log::info!("   Press ESC or close window to exit");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
    }

    log::info!("👋 Goodbye!");
}
