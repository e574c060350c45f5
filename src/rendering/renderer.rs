use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::{
    camera::Camera,
    geometry::GeometryId,
    light::Light,
    material::{Material, MaterialId},
    render::Renderer,
    rendering::{
        draw_binding::{MaterialLayouts, ObjectUniformState, ObjectUniforms},
        frame_uniform::{FrameUniform, FrameUniformState},
        mesh_buffers::MeshBuffers,
        pipelines::Pipelines,
        texture::{DepthTexture, GpuTexture},
    },
    scene_graph::Scene,
    texture::{TextureHandle, TextureId, TextureStore},
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

struct DrawCall {
    geometry: GeometryId,
    material: MaterialId,
    skybox: bool,
}

/// wgpu backend. Geometry, textures and material bind groups are uploaded on
/// first use and kept for the lifetime of the renderer.
pub struct GpuRenderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,

    textures: TextureStore,
    gpu_textures: HashMap<TextureId, GpuTexture>,
    white_texture: GpuTexture,
    mesh_buffers: HashMap<GeometryId, MeshBuffers>,
    material_bind_groups: HashMap<MaterialId, wgpu::BindGroup>,

    frame_uniform: FrameUniform,
    object_uniforms: ObjectUniforms,
    material_layouts: MaterialLayouts,
    pipelines: Pipelines,
}

impl GpuRenderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<GpuRenderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let surface_config = surface_config(&adapter, &surface, size);
        surface.configure(&device, &surface_config);

        let depth_texture = DepthTexture::new(&device, &surface_config, "Depth texture");

        let frame_uniform = FrameUniform::new(&device);
        let object_uniforms = ObjectUniforms::new(&device);
        let material_layouts = MaterialLayouts::new(&device);
        let pipelines = Pipelines::new(
            &device,
            surface_config.format,
            &frame_uniform,
            &object_uniforms,
            &material_layouts,
        );
        let white_texture = GpuTexture::white(&device, &queue);

        log::info!(
            "Renderer ready: {} ({:?}), surface {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_config.format
        );

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            surface_config,
            depth_texture,
            textures: TextureStore::new(),
            gpu_textures: HashMap::new(),
            white_texture,
            mesh_buffers: HashMap::new(),
            material_bind_groups: HashMap::new(),
            frame_uniform,
            object_uniforms,
            material_layouts,
            pipelines,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_texture.resize(&self.device, &self.surface_config);
        }
    }

    fn prepare_resources(&mut self, scene: &Scene) -> anyhow::Result<()> {
        for (geometry_id, geometry) in scene.geometries() {
            self.mesh_buffers
                .entry(geometry_id)
                .or_insert_with(|| MeshBuffers::new(&self.device, geometry));
        }

        for (material_id, material) in scene.materials.materials() {
            if self.material_bind_groups.contains_key(&material_id) {
                continue;
            }

            let texture = match material.map() {
                Some(texture_id) => {
                    if !self.gpu_textures.contains_key(&texture_id) {
                        let asset = self
                            .textures
                            .get(texture_id)
                            .with_context(|| format!("Unknown texture {texture_id:?}"))?;
                        let texture = GpuTexture::from_asset(&self.device, &self.queue, asset);
                        self.gpu_textures.insert(texture_id, texture);
                    }
                    &self.gpu_textures[&texture_id]
                }
                None => &self.white_texture,
            };

            let bind_group = self.material_layouts.bind_group(&self.device, texture);
            self.material_bind_groups.insert(material_id, bind_group);
        }

        Ok(())
    }

    fn update_frame_uniform(&self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        let light = scene.lights().first().copied().unwrap_or_else(Light::default);

        self.frame_uniform.update(
            &self.queue,
            FrameUniformState::new(
                camera.view_matrix(scene)?,
                camera.projection_matrix(),
                camera.world_position(scene)?,
                &light,
            ),
        );

        Ok(())
    }

    /// Flattens the draw list into one call per primitive, writing the
    /// per-draw uniforms as it goes.
    fn collect_draw_calls(&mut self, scene: &Scene) -> anyhow::Result<(Vec<DrawCall>, Vec<u32>)> {
        let mut calls = Vec::new();
        let mut states = Vec::new();

        for item in scene.draw_list()? {
            let mesh = scene
                .mesh(item.mesh_id)
                .with_context(|| format!("Unknown mesh {:?}", item.mesh_id))?;

            for primitive in &mesh.primitives {
                let material = scene
                    .materials
                    .get(primitive.material)
                    .with_context(|| format!("Unknown material in mesh {}", mesh.name))?;

                states.push(ObjectUniformState::new(item.world_matrix, material));
                calls.push(DrawCall {
                    geometry: primitive.geometry,
                    material: primitive.material,
                    skybox: matches!(material, Material::CubeMap { .. }),
                });
            }
        }

        let offsets = self.object_uniforms.upload(&self.device, &self.queue, &states);
        Ok((calls, offsets))
    }
}

impl Renderer for GpuRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        self.prepare_resources(scene)?;
        self.update_frame_uniform(scene, camera)?;
        let (calls, offsets) = self.collect_draw_calls(scene)?;

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring and skipping frame");
                self.resize(self.size);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
                return Ok(());
            }
            Err(other) => {
                return Err(other).context("Failed to acquire the next surface texture");
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.frame_uniform.bind_group, &[]);

            for (call, offset) in calls.iter().zip(offsets) {
                let buffers = &self.mesh_buffers[&call.geometry];
                let pipeline = if call.skybox {
                    &self.pipelines.skybox
                } else {
                    &self.pipelines.surface
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, self.object_uniforms.bind_group(), &[offset]);
                render_pass.set_bind_group(2, &self.material_bind_groups[&call.material], &[]);
                render_pass.set_vertex_buffer(0, buffers.vertices.slice(..));
                render_pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..buffers.num_indices, 0, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }

    fn load_texture(&mut self, path: &Path) -> TextureHandle {
        self.textures.load_texture(path)
    }

    fn load_cube_map(&mut self, faces: &[PathBuf; 6]) -> TextureHandle {
        self.textures.load_cube_map(faces)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.resize(PhysicalSize::new(width, height));
    }
}

fn surface_config(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    size: PhysicalSize<u32>,
) -> wgpu::SurfaceConfiguration {
    let surface_caps = surface.get_capabilities(adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);

    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: surface_caps.present_modes[0],
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}
