use glam::{Vec3, Vec4};

/// Point light colours consumed by lit materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
        }
    }
}
