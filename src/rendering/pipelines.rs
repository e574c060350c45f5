use wgpu::{
    DepthBiasState, MultisampleState, PipelineCompilationOptions, ShaderSource, StencilState,
};

use crate::rendering::{
    draw_binding::{MaterialLayouts, ObjectUniforms},
    frame_uniform::FrameUniform,
    mesh_buffers::{PRIMITIVE_STATE, VERTEX_BUFFER_LAYOUT},
    texture::DepthTexture,
};

struct ShaderDefinition {
    name: &'static str,
    source: &'static str,
}

const PHONG_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Phong shader",
    source: include_str!("shaders/phong.wgsl"),
};

const SKYBOX_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Skybox shader",
    source: include_str!("shaders/skybox.wgsl"),
};

pub struct Pipelines {
    /// Basic and Phong materials; the shader branches on the lit flag.
    pub surface: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        frame_uniform: &FrameUniform,
        object_uniforms: &ObjectUniforms,
        material_layouts: &MaterialLayouts,
    ) -> Self {
        let surface_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface pipeline layout"),
            bind_group_layouts: &[
                &frame_uniform.bind_group_layout,
                &object_uniforms.bind_group_layout,
                &material_layouts.flat,
            ],
            push_constant_ranges: &[],
        });

        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox pipeline layout"),
            bind_group_layouts: &[
                &frame_uniform.bind_group_layout,
                &object_uniforms.bind_group_layout,
                &material_layouts.cube,
            ],
            push_constant_ranges: &[],
        });

        let surface = create_pipeline(
            device,
            &PHONG_SHADER,
            &surface_layout,
            color_format,
            PRIMITIVE_STATE,
            wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            },
        );

        // The skybox is seen from inside and never occludes anything.
        let skybox = create_pipeline(
            device,
            &SKYBOX_SHADER,
            &skybox_layout,
            color_format,
            wgpu::PrimitiveState {
                cull_mode: None,
                ..PRIMITIVE_STATE
            },
            wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            },
        );

        Self { surface, skybox }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    shader_def: &ShaderDefinition,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    primitive: wgpu::PrimitiveState,
    depth_stencil: wgpu::DepthStencilState,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader_def.name),
        source: ShaderSource::Wgsl(shader_def.source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(shader_def.name),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VERTEX_BUFFER_LAYOUT],
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive,
        depth_stencil: Some(depth_stencil),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
