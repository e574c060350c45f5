pub mod draw_binding;
pub mod frame_uniform;
pub mod mesh_buffers;
pub mod pipelines;
pub mod renderer;
pub mod texture;

pub use renderer::GpuRenderer;
