use std::cell::Cell;

use glam::{Mat4, Quat, Vec3};

use crate::error::Result;
use crate::scene_graph::{NodeId, Scene};

/// Perspective camera carried by a scene node. The node supplies position and
/// orientation; the camera supplies the projection.
#[derive(Debug)]
pub struct Camera {
    node_id: NodeId,
    fovy_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,

    projection_matrix: Cell<Mat4>,
    projection_dirty: Cell<bool>,
}

impl Camera {
    pub fn new(
        scene: &mut Scene,
        parent: NodeId,
        fovy_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        let node_id = scene.create_node("Camera", Some(parent))?;

        Ok(Self {
            node_id,
            fovy_degrees,
            aspect,
            near,
            far,
            projection_matrix: Cell::new(Mat4::IDENTITY),
            projection_dirty: Cell::new(true),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn set_fovy(&mut self, fovy_degrees: f32) {
        self.fovy_degrees = fovy_degrees;
        self.projection_dirty.set(true);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_dirty.set(true);
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.projection_dirty.set(true);
    }

    pub fn update_projection_matrix(&self) {
        let projection = Mat4::perspective_rh(
            self.fovy_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );

        self.projection_matrix.set(projection);
        self.projection_dirty.set(false);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        if self.projection_dirty.get() {
            self.update_projection_matrix();
        }

        self.projection_matrix.get()
    }

    /// Inverse of the camera node's world matrix as of the last scene update.
    pub fn view_matrix(&self, scene: &Scene) -> Result<Mat4> {
        Ok(scene.node(self.node_id)?.world_matrix().inverse())
    }

    pub fn world_position(&self, scene: &Scene) -> Result<Vec3> {
        Ok(scene.node(self.node_id)?.world_translation())
    }

    /// Local orientation of the camera node.
    pub fn orientation(&self, scene: &Scene) -> Result<Quat> {
        Ok(scene.node(self.node_id)?.rotation())
    }

    /// Rotates a camera-local vector into the camera's parent space.
    pub fn direction(&self, scene: &Scene, local: Vec3) -> Result<Vec3> {
        Ok(self.orientation(scene)? * local)
    }
}
