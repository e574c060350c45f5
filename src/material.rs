use glam::Vec4;
use id_arena::{Arena, Id};

use crate::texture::TextureId;

pub type MaterialId = Id<Material>;

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceParameters {
    pub color: Vec4,
    pub ambient: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
    pub map: Option<TextureId>,
}

impl Default for SurfaceParameters {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            ambient: Vec4::new(0.5, 0.5, 0.5, 1.0),
            specular: Vec4::ONE,
            shininess: 32.0,
            map: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Texture times colour, no lighting.
    Basic(SurfaceParameters),
    /// Ambient + diffuse + specular from the scene light.
    Phong(SurfaceParameters),
    /// Cube texture sampled by direction; used for the skybox.
    CubeMap { map: TextureId },
}

impl Material {
    pub fn is_lit(&self) -> bool {
        matches!(self, Material::Phong(_))
    }

    pub fn map(&self) -> Option<TextureId> {
        match self {
            Material::Basic(surface) | Material::Phong(surface) => surface.map,
            Material::CubeMap { map } => Some(*map),
        }
    }
}

pub struct MaterialManager {
    materials: Arena<Material>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.alloc(material)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.len() == 0
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}
