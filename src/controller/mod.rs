//! The scene controller: owns camera, controls, renderer and the loaded model
//! for one container, and turns pointer input into hover and navigation.

mod frame_loop;
mod host;
mod timing;

pub use frame_loop::{CancellationToken, FrameLoop, FrameRequest};
pub use host::{
    ContainerSize, CursorAffordance, Host, ListenerKind, PointerButton, PointerSample, SceneEvents,
};
pub use timing::FrameTiming;

use crate::assets::{AssetSource, LoadOutcome, PendingLoad};
use crate::config::ViewerConfig;
use crate::render::{
    clamp_pixel_ratio, pick_nearest, pointer_to_ndc, DragMode, FrameView, OrbitControls,
    PerspectiveCamera, PickHit, RenderBackend,
};
use crate::scene::{assign_sections, Mixer, SceneState, Section, SectionMesh};
use glam::{Vec2, Vec3};
use std::sync::Arc;
use std::time::Instant;

/// Hover tooltip as last seen by pointer-move. `x`/`y` are the raw screen
/// coordinates of the pointer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TooltipState {
    pub visible: bool,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not the pending request, or the controller is detached.
    Skipped,
    Ran,
}

struct Placement {
    scale: f32,
    position: Vec3,
}

pub struct SceneController {
    attached: bool,
    scene: SceneState,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: Option<Box<dyn RenderBackend>>,
    sections: Vec<Section>,
    section_meshes: Vec<SectionMesh>,
    mixer: Option<Mixer>,
    tooltip: TooltipState,
    events: Box<dyn SceneEvents>,
    pending_load: Option<PendingLoad>,
    asset_location: String,
    frame_loop: FrameLoop,
    timing: FrameTiming,
    listeners: Vec<ListenerKind>,
    container: ContainerSize,
    placement: Placement,
    tooltip_offset: f32,
    max_pixel_ratio: f32,
    clear_color: [f32; 4],
}

impl SceneController {
    /// Mount on `host` and start loading the configured asset in the background.
    pub fn attach(
        host: &mut dyn Host,
        config: &ViewerConfig,
        sections: Vec<Section>,
        source: Arc<dyn AssetSource>,
        events: Box<dyn SceneEvents>,
    ) -> Self {
        let load = PendingLoad::spawn(source, &config.asset.location);
        Self::attach_with_load(host, config, sections, load, events)
    }

    /// Mount on `host` with a load the caller already started.
    pub fn attach_with_load(
        host: &mut dyn Host,
        config: &ViewerConfig,
        sections: Vec<Section>,
        load: PendingLoad,
        events: Box<dyn SceneEvents>,
    ) -> Self {
        let container = host.container_size();
        let mut camera = PerspectiveCamera::from_config(&config.camera);
        let controls = OrbitControls::from_config(&config.camera);
        let max_pixel_ratio = config.render.max_pixel_ratio;

        if container.is_drawable() {
            camera.set_aspect(container.width, container.height);
        } else {
            log::warn!(
                "Container is {}x{}; sizing deferred until a resize delivers real dimensions",
                container.width,
                container.height
            );
        }

        let renderer = match host.create_surface() {
            Ok(mut renderer) => {
                if container.is_drawable() {
                    let ratio = clamp_pixel_ratio(host.device_pixel_ratio(), max_pixel_ratio);
                    renderer.resize(container.width, container.height, ratio);
                }
                Some(renderer)
            }
            Err(err) => {
                log::error!("Failed to create render surface, continuing without one: {err}");
                None
            }
        };

        let listeners = ListenerKind::ALL.to_vec();
        for kind in &listeners {
            host.add_listener(*kind);
        }
        host.set_cursor(CursorAffordance::Grab);

        let mut frame_loop = FrameLoop::new();
        frame_loop.schedule(host);

        if sections.is_empty() {
            log::warn!("No sections configured; the model will not be interactive");
        }
        log::info!(
            "Scene attached ({} sections), loading {}",
            sections.len(),
            load.location()
        );

        Self {
            attached: true,
            scene: SceneState::new(config.lights),
            camera,
            controls,
            renderer,
            sections,
            section_meshes: Vec::new(),
            mixer: None,
            tooltip: TooltipState::default(),
            events,
            asset_location: load.location().to_string(),
            pending_load: Some(load),
            frame_loop,
            timing: FrameTiming::new(),
            listeners,
            container: if container.is_drawable() {
                container
            } else {
                ContainerSize::default()
            },
            placement: Placement {
                scale: config.asset.scale,
                position: Vec3::from_array(config.asset.position),
            },
            tooltip_offset: config.overlay.tooltip_offset_px,
            max_pixel_ratio,
            clear_color: config.render.clear_color,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn section_meshes(&self) -> &[SectionMesh] {
        &self.section_meshes
    }

    pub fn has_mixer(&self) -> bool {
        self.mixer.is_some()
    }

    pub fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    /// Where the tooltip should be drawn: the pointer plus the fixed offset.
    pub fn tooltip_anchor(&self) -> Option<Vec2> {
        self.tooltip.visible.then(|| {
            Vec2::new(
                self.tooltip.x + self.tooltip_offset,
                self.tooltip.y + self.tooltip_offset,
            )
        })
    }

    pub fn frames_run(&self) -> u64 {
        self.frame_loop.iterations()
    }

    /// Apply a finished load. Returns true if the model went into the scene.
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> bool {
        if !self.attached {
            log::debug!("Discarding model load that finished after detach");
            return false;
        }
        if self.scene.has_model() {
            log::warn!("A model is already loaded; ignoring another load result");
            return false;
        }
        let mut model = match outcome {
            Ok(model) => model,
            Err(err) => {
                log::error!("Failed to load model from {}: {err}", self.asset_location);
                return false;
            }
        };
        model.set_placement(self.placement.scale, self.placement.position);
        let order = model.mesh_order();
        let section_meshes = assign_sections(&order, &self.sections);
        let mixer = Mixer::new(model.clips());
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(err) = renderer.upload_model(&model) {
                log::warn!("Failed to upload model to the renderer: {err}");
            }
        }
        if let Some(bounds) = model.bounds() {
            log::info!(
                "Model loaded: {} meshes, {} interactive, {} clips playing, center {:?}, extent {:?}",
                order.len(),
                section_meshes.len(),
                mixer.as_ref().map_or(0, Mixer::action_count),
                bounds.center(),
                bounds.extent()
            );
        }
        self.scene.insert_model(model);
        self.section_meshes = section_meshes;
        self.mixer = mixer;
        true
    }

    /// One render-loop iteration for `request`.
    pub fn tick(&mut self, host: &mut dyn Host, request: FrameRequest, now: Instant) -> TickOutcome {
        if !self.attached || !self.frame_loop.begin(request) {
            return TickOutcome::Skipped;
        }
        self.poll_load();

        let dt = self.timing.update(now);
        if let (Some(mixer), Some(model)) = (self.mixer.as_mut(), self.scene.model_mut()) {
            mixer.update(dt, model);
        }
        self.controls.update(&mut self.camera);
        self.render_frame();

        self.frame_loop.schedule(host);
        TickOutcome::Ran
    }

    fn poll_load(&mut self) {
        let outcome = self.pending_load.as_mut().and_then(PendingLoad::poll);
        if let Some(outcome) = outcome {
            self.pending_load = None;
            self.complete_load(outcome);
        }
    }

    fn render_frame(&mut self) {
        if !self.container.is_drawable() {
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let frame = FrameView {
            view_projection: self.camera.view_projection(),
            camera_position: self.camera.position,
            lights: &self.scene.lights,
            clear_color: self.clear_color,
            model: self.scene.model(),
        };
        if let Err(err) = renderer.render(&frame) {
            log::warn!("Frame render failed: {err}");
        }
    }

    fn hit_test(&self, host: &dyn Host, local: Vec2) -> Option<PickHit> {
        let model = self.scene.model()?;
        if self.section_meshes.is_empty() {
            return None;
        }
        let size = host.container_size();
        let ndc = pointer_to_ndc(local.x, local.y, size.width, size.height)?;
        let ray = self.camera.ray_through_ndc(ndc);
        pick_nearest(&ray, model, &self.section_meshes)
    }

    fn clear_hover(&mut self, pointer: Vec2) {
        if !self.tooltip.visible {
            return;
        }
        self.tooltip.visible = false;
        self.tooltip.text.clear();
        self.events.on_hover(None, pointer);
    }

    pub fn pointer_move(&mut self, host: &mut dyn Host, sample: PointerSample) {
        if !self.attached {
            return;
        }
        if self.controls.is_dragging() {
            self.controls
                .drag_to(sample.local, &self.camera, host.container_size().height);
        }
        match self.hit_test(host, sample.local) {
            Some(hit) => {
                let title = self.section_meshes[hit.entry].section.title.clone();
                self.tooltip = TooltipState {
                    visible: true,
                    text: title,
                    x: sample.client.x,
                    y: sample.client.y,
                };
                self.events.on_hover(Some(&self.tooltip.text), sample.client);
                host.set_cursor(CursorAffordance::Pointer);
            }
            None => {
                self.clear_hover(sample.client);
                let cursor = if self.controls.is_dragging() {
                    CursorAffordance::Grabbing
                } else {
                    CursorAffordance::Grab
                };
                host.set_cursor(cursor);
            }
        }
    }

    pub fn pointer_down(&mut self, host: &mut dyn Host, button: PointerButton, sample: PointerSample) {
        if !self.attached {
            return;
        }
        let mode = match button {
            PointerButton::Primary => DragMode::Rotate,
            PointerButton::Secondary | PointerButton::Auxiliary => DragMode::Pan,
        };
        self.controls.begin_drag(mode, sample.local);
        host.set_cursor(CursorAffordance::Grabbing);
    }

    pub fn pointer_up(&mut self, host: &mut dyn Host, _sample: PointerSample) {
        if !self.attached {
            return;
        }
        self.controls.end_drag();
        host.set_cursor(CursorAffordance::Grab);
    }

    pub fn pointer_leave(&mut self, _host: &mut dyn Host, sample: PointerSample) {
        if !self.attached {
            return;
        }
        self.clear_hover(sample.client);
    }

    /// Activate the section under the pointer, if any.
    pub fn click(&mut self, host: &mut dyn Host, sample: PointerSample) {
        if !self.attached {
            return;
        }
        if let Some(hit) = self.hit_test(host, sample.local) {
            let path = self.section_meshes[hit.entry].section.path.clone();
            log::debug!("Activated {path}");
            self.events.on_activate(&path);
        }
    }

    pub fn wheel(&mut self, _host: &mut dyn Host, delta_y: f32) {
        if !self.attached {
            return;
        }
        self.controls.wheel(delta_y);
    }

    /// Re-read the container size and resize camera and output buffer to match.
    pub fn resize(&mut self, host: &mut dyn Host) {
        if !self.attached {
            return;
        }
        let size = host.container_size();
        if !size.is_drawable() {
            log::debug!("Ignoring resize to {}x{}", size.width, size.height);
            return;
        }
        self.container = size;
        self.camera.set_aspect(size.width, size.height);
        let ratio = clamp_pixel_ratio(host.device_pixel_ratio(), self.max_pixel_ratio);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size.width, size.height, ratio);
        }
    }

    /// Tear down everything `attach` set up. Safe to call more than once.
    pub fn detach(&mut self, host: &mut dyn Host) {
        if !self.attached {
            log::debug!("Detach called on a detached scene");
            return;
        }
        self.attached = false;
        self.frame_loop.cancel(host);
        for kind in self.listeners.drain(..) {
            host.remove_listener(kind);
        }
        self.controls.dispose();
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
        host.remove_surface();
        if let Some(load) = self.pending_load.take() {
            load.cancel();
        }
        self.tooltip = TooltipState::default();
        log::info!("Scene detached after {} frames", self.frame_loop.iterations());
    }
}

impl Drop for SceneController {
    fn drop(&mut self) {
        if !self.attached {
            return;
        }
        log::warn!("Scene controller dropped while attached; host resources were not released");
        if let Some(load) = self.pending_load.take() {
            load.cancel();
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
    }
}
