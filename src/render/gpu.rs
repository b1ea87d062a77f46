//! wgpu backend: one lit pipeline for the model, with the egui overlay on top.

use super::{output_buffer_size, FrameView, OverlayQueue, RenderBackend, RenderError};
use crate::scene::Model;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    sky: [f32; 4],
    ground: [f32; 4],
    sun_color: [f32; 4],
    sun_dir: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    base_color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                },
                wgpu::VertexAttribute {
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                },
            ],
        }
    }
}

struct GpuMesh {
    primitive: usize,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    base_color: [f32; 4],
}

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    meshes: Vec<GpuMesh>,
    egui: EguiRenderer,
    overlay: OverlayQueue,
    premultiplied: bool,
    disposed: bool,
}

impl GpuRenderer {
    pub fn new(window: Arc<Window>, overlay: OverlayQueue) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::SurfaceCreateFailed(err.to_string()))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::AdapterUnavailable(err.to_string()))?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let device_desc = wgpu::DeviceDescriptor {
            label: Some("House Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&device_desc))
            .map_err(|err| RenderError::DeviceCreateFailed(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        // Prefer a compositor mode that honours the transparent clear.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| caps.alpha_modes.contains(mode))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("House Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("house.wgsl").into()),
        });
        let frame_layout = uniform_layout(&device, "Frame BGL", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let object_layout = uniform_layout(&device, "Object BGL", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BG"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("House Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("House Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        let egui = EguiRenderer::new(&device, format, RendererOptions::default());

        Ok(Self {
            surface,
            device,
            queue,
            premultiplied: alpha_mode == wgpu::CompositeAlphaMode::PreMultiplied,
            config,
            depth_view,
            pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            meshes: Vec::new(),
            egui,
            overlay,
            disposed: false,
        })
    }

    fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                Err(RenderError::FrameUnavailable(
                    "surface lost or outdated; reconfigured".to_string(),
                ))
            }
            Err(err) => Err(RenderError::FrameUnavailable(err.to_string())),
        }
    }

    fn write_uniforms(&self, frame: &FrameView<'_>) {
        let lights = frame.lights;
        let hemi = lights.hemisphere;
        let sun = lights.directional;
        let sun_dir = sun.to_light();
        let uniform = FrameUniform {
            view_proj: frame.view_projection.to_cols_array_2d(),
            camera_pos: frame.camera_position.extend(1.0).to_array(),
            sky: [hemi.sky_color[0], hemi.sky_color[1], hemi.sky_color[2], hemi.intensity],
            ground: [hemi.ground_color[0], hemi.ground_color[1], hemi.ground_color[2], 1.0],
            sun_color: [sun.color[0], sun.color[1], sun.color[2], sun.intensity],
            sun_dir: [sun_dir.x, sun_dir.y, sun_dir.z, 0.0],
        };
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniform));

        let Some(model) = frame.model else {
            return;
        };
        for mesh in &self.meshes {
            let world = model.primitive_world(mesh.primitive);
            let object = ObjectUniform {
                model: world.to_cols_array_2d(),
                normal: normal_matrix(world).to_cols_array_2d(),
                base_color: mesh.base_color,
            };
            self.queue
                .write_buffer(&mesh.uniform_buffer, 0, bytemuck::bytes_of(&object));
        }
    }

    fn clear_color(&self, rgba: [f32; 4]) -> wgpu::Color {
        let [r, g, b, a] = rgba.map(f64::from);
        if self.premultiplied {
            wgpu::Color { r: r * a, g: g * a, b: b * a, a }
        } else {
            wgpu::Color { r, g, b, a }
        }
    }

    fn paint_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(paint) = self.overlay.borrow_mut().take() else {
            return Vec::new();
        };
        for (id, delta) in &paint.textures_delta.set {
            self.egui.update_texture(&self.device, &self.queue, *id, delta);
        }
        let screen = ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: paint.pixels_per_point,
        };
        let extra = self
            .egui
            .update_buffers(&self.device, &self.queue, encoder, &paint.paint_jobs, &screen);
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let mut pass = pass.forget_lifetime();
            self.egui.render(&mut pass, &paint.paint_jobs, &screen);
        }
        for id in &paint.textures_delta.free {
            self.egui.free_texture(id);
        }
        extra
    }
}

impl RenderBackend for GpuRenderer {
    fn resize(&mut self, width: f32, height: f32, pixel_ratio: f32) {
        if self.disposed {
            return;
        }
        let (width, height) = output_buffer_size(width, height, pixel_ratio);
        if (width, height) == (self.config.width, self.config.height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
        log::debug!("Surface resized to {width}x{height}");
    }

    fn output_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn upload_model(&mut self, model: &Model) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.meshes.clear();
        for (id, primitive) in model.primitives().iter().enumerate() {
            if primitive.indices.is_empty() {
                continue;
            }
            let vertices: Vec<Vertex> = primitive
                .positions
                .iter()
                .zip(&primitive.normals)
                .map(|(p, n)| Vertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                })
                .collect();
            let vertex_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("House VB"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("House IB"),
                    contents: bytemuck::cast_slice(&primitive.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Object Uniform Buffer"),
                size: std::mem::size_of::<ObjectUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Object BG"),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            self.meshes.push(GpuMesh {
                primitive: id,
                vertex_buffer,
                index_buffer,
                index_count: primitive.indices.len() as u32,
                uniform_buffer,
                bind_group,
                base_color: primitive.base_color,
            });
        }
        log::info!("Uploaded {} meshes to the GPU", self.meshes.len());
        Ok(())
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        let surface_frame = self.acquire_frame()?;
        let view = surface_frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.write_uniforms(frame);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("House Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("House Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color(frame.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if frame.model.is_some() {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                for mesh in &self.meshes {
                    pass.set_bind_group(1, &mesh.bind_group, &[]);
                    pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }
        let mut command_buffers = self.paint_overlay(&mut encoder, &view);
        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        surface_frame.present();
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.meshes.clear();
        self.overlay.borrow_mut().take();
        log::info!("GPU renderer disposed");
    }
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Inverse-transpose, so non-uniform scale doesn't skew normals.
fn normal_matrix(world: Mat4) -> Mat4 {
    let inverse = world.inverse();
    if inverse.is_finite() {
        inverse.transpose()
    } else {
        Mat4::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_structs_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 144);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let world = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(world).transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!((n - Vec3::new(0.5, 1.0, 0.0)).length() < 1e-6);
        assert_eq!(normal_matrix(Mat4::ZERO), Mat4::IDENTITY);
    }
}
