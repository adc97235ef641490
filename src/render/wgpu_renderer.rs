//! Windowed wgpu backend.
//!
//! Draws a scene graph in four groups: solids with depth testing, scene quads
//! (sprites, rings, glows) back to front, effects and the transition overlay on
//! top, and finally the cursor. Every quad shares one pipeline whose fragment
//! shader switches on a per-draw mode.
//!
//! | Mode | Drawn for | Params |
//! |------|-----------|--------|
//! | 0 | sprite | texture × tint |
//! | 1 | ring | `y` thickness, `z` opacity |
//! | 2 | glow | `y` intensity |
//! | 3 | fade overlay | color with opacity in alpha |
//! | 4 | glitch overlay | `y` intensity, `w` time, texture is the capture |

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{CaptureId, GpuContext, RenderError, RenderTarget, Renderer, Viewport};
use crate::camera::Camera;
use crate::color::Color;
use crate::geometry::{Model, ModelId};
use crate::graph::{
    Glow, OverlayMaterial, OverlayQuad, RenderOrder, Ring, Role, SceneGraph, Solid, Sprite,
    Visible,
};
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::picking::Collider;
use crate::texture::{GpuTexture, Texture, TextureId};

const MODE_SPRITE: f32 = 0.0;
const MODE_RING: f32 = 1.0;
const MODE_GLOW: f32 = 2.0;
const MODE_FADE: f32 = 3.0;
const MODE_GLITCH: f32 = 4.0;

/// Uniform parameters for a sprite draw. `y` is the texture's flip flag, so
/// the shader maps v the way [`Texture::image_v`] does for hit testing.
fn sprite_params(texture: &Texture, time: f32) -> [f32; 4] {
    let flip = if texture.flip_y { 1.0 } else { 0.0 };
    [MODE_SPRITE, flip, 0.0, time]
}

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    /// x: mode, y/z: mode parameters, w: time
    params: [f32; 4],
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Layer {
    Solid,
    Scene,
    Effect,
    Overlay,
    Cursor,
}

#[derive(Clone, Copy)]
enum Geometry {
    Quad,
    Cube,
    Model(ModelId),
}

enum Source {
    White,
    Texture(TextureId),
    Capture(CaptureId),
}

struct Prepared {
    layer: Layer,
    order: i32,
    depth: f32,
    geometry: Geometry,
    source: Source,
    uniforms: DrawUniforms,
}

/// Renderer for a winit window.
pub struct WgpuRenderer {
    window: Arc<Window>,
    gpu: GpuContext,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    mesh_pipeline: wgpu::RenderPipeline,
    quad_pipeline: wgpu::RenderPipeline,
    top_pipeline: wgpu::RenderPipeline,
    quad: Mesh,
    cube: Mesh,
    white: GpuTexture,
    capture_sampler: wgpu::Sampler,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    textures: HashMap<TextureId, GpuTexture>,
    meshes: HashMap<ModelId, Mesh>,
    captures: HashMap<CaptureId, RenderTarget>,
    next_capture: u64,
}

impl WgpuRenderer {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let gpu = GpuContext::new(Arc::clone(&window))?;
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            &gpu,
            &layout,
            &shader,
            PipelineKind {
                label: "Mesh Pipeline",
                fragment: "fs_mesh",
                cull: Some(wgpu::Face::Back),
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        );
        let quad_pipeline = create_pipeline(
            &gpu,
            &layout,
            &shader,
            PipelineKind {
                label: "Quad Pipeline",
                fragment: "fs_quad",
                cull: None,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
            },
        );
        let top_pipeline = create_pipeline(
            &gpu,
            &layout,
            &shader,
            PipelineKind {
                label: "Top Quad Pipeline",
                fragment: "fs_quad",
                cull: None,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::Always,
            },
        );

        let quad = Mesh::new(
            &gpu,
            &[
                Vertex3d::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex3d::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex3d::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
                Vertex3d::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            &[0, 1, 2, 2, 3, 0],
        );
        let cube_model = Model::cube();
        let cube = Mesh::new(&gpu, &cube_model.vertices, &cube_model.indices);

        let white = GpuTexture::from_rgba(&gpu, &[255, 255, 255, 255], 1, 1, "White");

        let capture_sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Capture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let depth_view = create_depth_view(&gpu);
        let depth_size = (gpu.width(), gpu.height());

        Ok(Self {
            window,
            gpu,
            uniform_layout,
            texture_layout,
            mesh_pipeline,
            quad_pipeline,
            top_pipeline,
            quad,
            cube,
            white,
            capture_sampler,
            depth_view,
            depth_size,
            textures: HashMap::new(),
            meshes: HashMap::new(),
            captures: HashMap::new(),
            next_capture: 1,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn ensure_depth_size(&mut self) {
        if self.depth_size != (self.gpu.width(), self.gpu.height()) {
            self.depth_view = create_depth_view(&self.gpu);
            self.depth_size = (self.gpu.width(), self.gpu.height());
        }
    }

    /// Collect draws for a graph, uploading any textures and meshes not yet on the GPU.
    fn prepare(&mut self, graph: &SceneGraph, camera: &Camera, time: f32) -> Vec<Prepared> {
        let aspect = self.gpu.viewport().aspect();
        let view = camera.view_matrix();
        let view_proj = (camera.projection_matrix(aspect) * view).to_cols_array_2d();
        let depth_of = |position: Vec3| -(view * position.extend(1.0)).z;

        let mut draws = Vec::new();
        let world = graph.world();

        for (_, (transform, visible, solid)) in
            world.query::<(&Transform, &Visible, &Solid)>().iter()
        {
            if !visible.0 {
                continue;
            }
            let (geometry, model) = match &solid.model {
                Some(model) => {
                    self.meshes.entry(model.id()).or_insert_with(|| {
                        Mesh::new(&self.gpu, &model.vertices, &model.indices)
                    });
                    (Geometry::Model(model.id()), transform.matrix())
                }
                None => {
                    let size = match solid.collider {
                        Collider::Box { half_extents } => half_extents * 2.0,
                        Collider::Sphere { radius } => Vec3::splat(radius * 2.0),
                    };
                    (Geometry::Cube, transform.matrix() * Mat4::from_scale(size))
                }
            };
            draws.push(Prepared {
                layer: Layer::Solid,
                order: 0,
                depth: depth_of(transform.position),
                geometry,
                source: Source::White,
                uniforms: DrawUniforms {
                    view_proj,
                    model: model.to_cols_array_2d(),
                    color: solid.color.to_array(),
                    params: [0.0, 0.0, 0.0, time],
                },
            });
        }

        let mut query = world.query::<(
            &Transform,
            &Visible,
            &Role,
            Option<&RenderOrder>,
            Option<&Sprite>,
            Option<&Ring>,
            Option<&Glow>,
            Option<&OverlayQuad>,
        )>();
        for (_, (transform, visible, role, order, sprite, ring, glow, overlay)) in query.iter() {
            if !visible.0 {
                continue;
            }

            let (size, color, params, source) = if let Some(overlay) = overlay {
                match overlay.material {
                    OverlayMaterial::Fade(fade) => (
                        overlay.size,
                        fade.color.with_alpha(fade.color.a * fade.opacity),
                        [MODE_FADE, 0.0, 0.0, time],
                        Source::White,
                    ),
                    OverlayMaterial::Glitch(glitch) => (
                        overlay.size,
                        Color::WHITE,
                        [MODE_GLITCH, glitch.intensity, 0.0, glitch.time],
                        glitch.source.map_or(Source::White, Source::Capture),
                    ),
                }
            } else if let Some(sprite) = sprite {
                let texture = &sprite.texture;
                self.textures
                    .entry(texture.id())
                    .or_insert_with(|| GpuTexture::upload(&self.gpu, texture));
                (
                    sprite.size,
                    sprite.tint,
                    sprite_params(texture, time),
                    Source::Texture(texture.id()),
                )
            } else if let Some(ring) = ring {
                (
                    Vec2::ONE,
                    ring.color,
                    [MODE_RING, ring.thickness, ring.opacity, time],
                    Source::White,
                )
            } else if let Some(glow) = glow {
                (
                    Vec2::ONE,
                    glow.color,
                    [MODE_GLOW, glow.intensity, 0.0, time],
                    Source::White,
                )
            } else {
                continue;
            };

            let layer = if overlay.is_some() {
                Layer::Overlay
            } else {
                match role {
                    Role::Cursor => Layer::Cursor,
                    Role::Effect | Role::Overlay => Layer::Effect,
                    _ => Layer::Scene,
                }
            };

            let model = transform.matrix() * Mat4::from_scale(size.extend(1.0));
            draws.push(Prepared {
                layer,
                order: order.map_or(0, |o| o.0),
                depth: depth_of(transform.position),
                geometry: Geometry::Quad,
                source,
                uniforms: DrawUniforms {
                    view_proj,
                    model: model.to_cols_array_2d(),
                    color: color.to_array(),
                    params,
                },
            });
        }

        // Layer first, then explicit order, then back to front.
        draws.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then(a.order.cmp(&b.order))
                .then(b.depth.total_cmp(&a.depth))
        });
        draws
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, draws: &[Prepared]) {
        let groups: Vec<(wgpu::BindGroup, wgpu::BindGroup)> = draws
            .iter()
            .map(|draw| (self.uniform_group(&draw.uniforms), self.texture_group(&draw.source)))
            .collect();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (draw, (uniforms, texture)) in draws.iter().zip(&groups) {
            let pipeline = match draw.layer {
                Layer::Solid => &self.mesh_pipeline,
                Layer::Scene => &self.quad_pipeline,
                Layer::Effect | Layer::Overlay | Layer::Cursor => &self.top_pipeline,
            };
            let mesh = match draw.geometry {
                Geometry::Quad => &self.quad,
                Geometry::Cube => &self.cube,
                Geometry::Model(id) => match self.meshes.get(&id) {
                    Some(mesh) => mesh,
                    None => continue,
                },
            };

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, uniforms, &[]);
            pass.set_bind_group(1, texture, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    fn uniform_group(&self, uniforms: &DrawUniforms) -> wgpu::BindGroup {
        let buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Draw Uniforms"),
                contents: bytemuck::cast_slice(&[*uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms Bind Group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn texture_group(&self, source: &Source) -> wgpu::BindGroup {
        let (view, sampler) = match source {
            Source::Texture(id) => self
                .textures
                .get(id)
                .map(|t| (&t.view, &t.sampler))
                .unwrap_or((&self.white.view, &self.white.sampler)),
            Source::Capture(id) => self
                .captures
                .get(id)
                .map(|t| (&t.view, &self.capture_sampler))
                .unwrap_or((&self.white.view, &self.white.sampler)),
            Source::White => (&self.white.view, &self.white.sampler),
        };
        self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

impl Renderer for WgpuRenderer {
    fn viewport(&self) -> Viewport {
        self.gpu.viewport()
    }

    fn resize(&mut self, viewport: Viewport) {
        self.gpu.resize(viewport.width, viewport.height);
    }

    fn create_capture(&mut self) -> Result<CaptureId, RenderError> {
        let id = CaptureId(self.next_capture);
        self.next_capture += 1;
        self.captures
            .insert(id, RenderTarget::new(&self.gpu, "Transition Capture"));
        log::debug!("created capture target {:?}", id);
        Ok(id)
    }

    fn capture(
        &mut self,
        graph: &SceneGraph,
        camera: &Camera,
        target: CaptureId,
    ) -> Result<(), RenderError> {
        self.ensure_depth_size();
        match self.captures.get_mut(&target) {
            Some(capture) => capture.ensure_size(&self.gpu, "Transition Capture"),
            None => return Err(RenderError::UnknownCapture(target)),
        }

        let draws = self.prepare(graph, camera, 0.0);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        let view = self
            .captures
            .get(&target)
            .map(|capture| &capture.view)
            .ok_or(RenderError::UnknownCapture(target))?;
        self.encode(&mut encoder, view, &draws);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn release_capture(&mut self, target: CaptureId) {
        if self.captures.remove(&target).is_some() {
            log::debug!("released capture target {:?}", target);
        }
    }

    fn render(
        &mut self,
        graph: &SceneGraph,
        camera: &Camera,
        time: f32,
    ) -> Result<(), RenderError> {
        self.ensure_depth_size();

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws = self.prepare(graph, camera, time);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.encode(&mut encoder, &view, &draws);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        self.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

struct PipelineKind {
    label: &'static str,
    fragment: &'static str,
    cull: Option<wgpu::Face>,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

fn create_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(kind.label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(kind.fragment),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: kind.cull,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: kind.depth_write,
                depth_compare: kind.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
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

const SCENE_SHADER: &str = r#"
struct Draw {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> draw: Draw;
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var samp: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = draw.view_proj * draw.model * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    out.normal = (draw.model * vec4<f32>(in.normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs_mesh(in: VertexOutput) -> @location(0) vec4<f32> {
    let light = normalize(vec3<f32>(0.4, 0.8, 0.6));
    let diffuse = max(dot(normalize(in.normal), light), 0.0);
    return vec4<f32>(draw.color.rgb * (0.3 + 0.7 * diffuse), draw.color.a);
}

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

@fragment
fn fs_quad(in: VertexOutput) -> @location(0) vec4<f32> {
    let mode = i32(draw.params.x);
    // Image rows run top to bottom; quad v runs bottom to top.
    let tex_uv = vec2<f32>(in.uv.x, 1.0 - in.uv.y);
    // Sprites carry their texture's flip flag in params.y.
    let sprite_uv = select(in.uv, tex_uv, draw.params.y > 0.5);
    let radius = length(in.uv * 2.0 - vec2<f32>(1.0));
    var result = vec4<f32>(0.0);

    switch mode {
        case 1: {
            let edge = max(fwidth(radius), 0.001);
            let inner_edge = 1.0 - draw.params.y;
            let outer = 1.0 - smoothstep(1.0 - edge, 1.0, radius);
            let inner = smoothstep(inner_edge - edge, inner_edge, radius);
            result = vec4<f32>(draw.color.rgb, draw.color.a * draw.params.z * outer * inner);
        }
        case 2: {
            let falloff = pow(max(1.0 - radius, 0.0), 2.0) * draw.params.y;
            result = vec4<f32>(draw.color.rgb, draw.color.a * clamp(falloff, 0.0, 1.0));
        }
        case 3: {
            result = draw.color;
        }
        case 4: {
            let intensity = draw.params.y;
            let t = draw.params.w;
            let band = floor(tex_uv.y * 24.0);
            let jitter = (hash(vec2<f32>(band, floor(t * 20.0))) - 0.5) * 0.12 * intensity;
            let split = 0.015 * intensity;
            let uv = vec2<f32>(fract(tex_uv.x + jitter), tex_uv.y);
            let red = textureSample(tex, samp, uv + vec2<f32>(split, 0.0)).r;
            let green = textureSample(tex, samp, uv).g;
            let blue = textureSample(tex, samp, uv - vec2<f32>(split, 0.0)).b;
            let noise = hash(tex_uv * 512.0 + vec2<f32>(t)) * 0.25 * intensity;
            let scanline = mix(1.0, 0.6, intensity * step(0.5, fract(tex_uv.y * 180.0)));
            result = vec4<f32>(vec3<f32>(red, green, blue) * scanline + vec3<f32>(noise), 1.0);
        }
        default: {
            result = textureSample(tex, samp, sprite_uv) * draw.color;
        }
    }

    return result;
}
"#;
