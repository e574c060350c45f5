use glam::{Mat4, Quat, Vec3};
use std::cell::Cell;

/// Local translation, rotation and scale of a scene node.
///
/// The composed local matrix is cached and rebuilt lazily after any mutation.
#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,

    local_matrix: Cell<Mat4>,
    local_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: Cell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
        }
    }

    /// Translation ∘ rotation ∘ scale.
    pub fn local_matrix(&self) -> Mat4 {
        if self.local_dirty.get() {
            let matrix =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation);

            self.local_matrix.set(matrix);
            self.local_dirty.set(false);
        }

        self.local_matrix.get()
    }

    fn invalidate_local(&self) {
        self.local_dirty.set(true);
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    pub fn apply_translation(&mut self, delta: Vec3) {
        self.translation += delta;
        self.invalidate_local();
    }

    /// Replaces the rotation. The quaternion is normalized on the way in.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.invalidate_local();
    }

    /// Composes `angle` radians about the local `axis` onto the current rotation.
    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        let delta = Quat::from_axis_angle(axis.normalize(), angle);
        self.rotation = (self.rotation * delta).normalize();
        self.invalidate_local();
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.rotate(Vec3::X, angle);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.rotate(Vec3::Y, angle);
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.rotate(Vec3::Z, angle);
    }

    /// Zero or negative components are accepted and yield degenerate or mirrored geometry.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}
