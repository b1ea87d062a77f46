//! House View - interactive 3D house whose parts navigate to portfolio sections.
//!
//! - winit 0.30 window hosting a wgpu renderer
//! - glTF model fetched and parsed on a loader thread
//! - orbit camera, hover tooltip and click-to-navigate via CPU ray casting

mod app;
mod assets;
mod config;
mod controller;
mod render;
mod scene;
mod ui;

fn main() {
    app::run();
}
