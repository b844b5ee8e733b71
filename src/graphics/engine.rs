use anyhow::Result;
use glam::{Mat4, Vec2};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{ShaderManager, Vertex, VertexBuffer};
use crate::ui::{UiStatus, UserInterface};

/// Half-width of the core stroke in pixels (6 px line).
const CORE_HALF_WIDTH: f32 = 3.0;

/// Half-width of the glow ribbon behind each stroke.
const GLOW_HALF_WIDTH: f32 = 7.5;

/// Alpha multiplier for the glow pass.
const GLOW_ALPHA: f32 = 0.35;

/// One band's drawable wave for the current frame.
pub struct BandWave {
    pub points: Vec<Vec2>,
    pub color: [f32; 4],
    pub glow_color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

impl Uniforms {
    /// Pixel-space projection, origin top-left, y down.
    fn for_size(width: f32, height: f32) -> Self {
        let proj = Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0);
        Self {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}

pub struct GraphicsEngine<'a> {
    pub surface: wgpu::Surface<'a>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,

    pub shader_manager: ShaderManager,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    vertex_buffer: VertexBuffer,
    scratch: Vec<Vertex>,
    glow_enabled: bool,
}

impl<'a> GraphicsEngine<'a> {
    pub async fn new(window: &'a Window, glow_enabled: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find an appropriate adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniforms = Uniforms::for_size(size.width as f32, size.height as f32);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let mut shader_manager = ShaderManager::new();
        let wave_shader = include_str!("../../shaders/wave.wgsl");
        shader_manager.load_shader(&device, "wave", wave_shader)?;
        shader_manager.create_pipeline(
            &device,
            "wave",
            "wave",
            surface_format,
            &uniform_bind_group_layout,
        )?;

        let vertex_buffer = VertexBuffer::with_capacity(&device, 4096);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            shader_manager,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            scratch: Vec::new(),
            glow_enabled,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn render(
        &mut self,
        waves: &[BandWave],
        window: &Window,
        ui: &mut UserInterface,
        status: &UiStatus,
    ) -> Result<()> {
        let uniforms = Uniforms::for_size(self.config.width as f32, self.config.height as f32);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        // High band first so the bass waves end up drawn on top.
        self.scratch.clear();
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for wave in waves.iter().rev() {
            if self.glow_enabled {
                let mut glow = wave.glow_color;
                glow[3] *= GLOW_ALPHA;
                push_ribbon(
                    &mut self.scratch,
                    &mut ranges,
                    &wave.points,
                    GLOW_HALF_WIDTH,
                    glow,
                );
            }
            push_ribbon(
                &mut self.scratch,
                &mut ranges,
                &wave.points,
                CORE_HALF_WIDTH,
                wave.color,
            );
        }
        self.vertex_buffer
            .upload(&self.device, &self.queue, &self.scratch);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Wave Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.shader_manager.get_pipeline("wave") {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.buffer.slice(..));
                for &(start, count) in &ranges {
                    render_pass.draw(start..start + count, 0..1);
                }
            }
        }

        ui.render(
            &mut encoder,
            &view,
            &self.device,
            &self.queue,
            window,
            [self.config.width, self.config.height],
            status,
        )?;

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Expands a polyline into a triangle-strip ribbon of the given half-width
/// and records its vertex range for a separate draw call.
fn push_ribbon(
    scratch: &mut Vec<Vertex>,
    ranges: &mut Vec<(u32, u32)>,
    points: &[Vec2],
    half_width: f32,
    color: [f32; 4],
) {
    if points.len() < 2 {
        return;
    }

    let start = scratch.len() as u32;
    for (i, point) in points.iter().enumerate() {
        let prev = points[i.saturating_sub(1)];
        let next = points[(i + 1).min(points.len() - 1)];
        let direction = next - prev;
        let mut normal = Vec2::new(-direction.y, direction.x).normalize_or_zero();
        if normal == Vec2::ZERO {
            normal = Vec2::Y;
        }

        scratch.push(Vertex {
            position: (*point + normal * half_width).to_array(),
            color,
        });
        scratch.push(Vertex {
            position: (*point - normal * half_width).to_array(),
            color,
        });
    }
    ranges.push((start, scratch.len() as u32 - start));
}
