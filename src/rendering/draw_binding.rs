use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::material::{Material, SurfaceParameters};
use crate::rendering::texture::GpuTexture;

/// Per-draw model matrix and material parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniformState {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    pub color: Vec4,
    pub ambient: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
    pub lit: u32,
    _padding: [f32; 2],
}

impl ObjectUniformState {
    pub fn new(model: Mat4, material: &Material) -> Self {
        let default_surface = SurfaceParameters::default();
        let surface = match material {
            Material::Basic(surface) | Material::Phong(surface) => surface,
            Material::CubeMap { .. } => &default_surface,
        };

        Self {
            model,
            normal_matrix: model.inverse().transpose(),
            color: surface.color,
            ambient: surface.ambient,
            specular: surface.specular,
            shininess: surface.shininess,
            lit: material.is_lit() as u32,
            _padding: [0.0; 2],
        }
    }
}

const OBJECT_UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniformState>() as u64;

/// One uniform buffer holding a slot per draw, addressed with dynamic offsets.
pub struct ObjectUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl ObjectUniforms {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object uniform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(OBJECT_UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = OBJECT_UNIFORM_SIZE.div_ceil(alignment) * alignment;

        let (buffer, bind_group) =
            Self::allocate(device, &bind_group_layout, stride, Self::INITIAL_CAPACITY);

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            stride,
            capacity: Self::INITIAL_CAPACITY,
            staging: Vec::new(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object uniform buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(OBJECT_UNIFORM_SIZE),
                }),
            }],
        });

        (buffer, bind_group)
    }

    /// Writes one slot per state, growing the buffer if needed. Returns the
    /// dynamic offset of each slot.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        states: &[ObjectUniformState],
    ) -> Vec<u32> {
        if states.len() > self.capacity {
            let capacity = states.len().next_power_of_two();
            let (buffer, bind_group) =
                Self::allocate(device, &self.bind_group_layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        self.staging.clear();
        self.staging.resize(self.stride as usize * states.len(), 0);

        let mut offsets = Vec::with_capacity(states.len());
        for (slot, state) in states.iter().enumerate() {
            let start = slot * self.stride as usize;
            self.staging[start..start + OBJECT_UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(state));
            offsets.push(start as u32);
        }

        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.staging);
        }

        offsets
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Texture and sampler layouts for the two material kinds.
pub struct MaterialLayouts {
    pub flat: wgpu::BindGroupLayout,
    pub cube: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl MaterialLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            flat: Self::layout(device, "Flat material", wgpu::TextureViewDimension::D2),
            cube: Self::layout(device, "Cube material", wgpu::TextureViewDimension::Cube),
            sampler,
        }
    }

    fn layout(
        device: &wgpu::Device,
        label: &str,
        view_dimension: wgpu::TextureViewDimension,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension,
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
        })
    }

    pub fn bind_group(&self, device: &wgpu::Device, texture: &GpuTexture) -> wgpu::BindGroup {
        let layout = match texture.dimension {
            wgpu::TextureViewDimension::Cube => &self.cube,
            _ => &self.flat,
        };

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}
