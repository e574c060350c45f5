use std::path::{Path, PathBuf};

use crate::camera::Camera;
use crate::scene_graph::Scene;
use crate::texture::TextureHandle;

pub use crate::scene_graph::DrawItem;

/// Backend that draws a scene. The core never looks inside textures or
/// GPU state; it only hands over the scene and the camera each frame.
pub trait Renderer {
    /// Draws every mesh reachable from the scene root with the world matrices
    /// of the last `Scene::update`.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()>;

    /// Never fails; a missing or unreadable file yields a fallback handle.
    fn load_texture(&mut self, path: &Path) -> TextureHandle;

    /// Faces in +X, -X, +Y, -Y, +Z, -Z order.
    fn load_cube_map(&mut self, faces: &[PathBuf; 6]) -> TextureHandle;

    fn set_size(&mut self, width: u32, height: u32);
}
