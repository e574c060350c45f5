use glam::{Mat4, Quat, Vec3};
use id_arena::Id;

use crate::scene_graph::mesh::MeshId;
use crate::scene_graph::transform::Transform;

pub type NodeId = Id<Node>;

pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub(crate) mesh_id: Option<MeshId>,
    pub(crate) parent_id: Option<NodeId>,
    pub(crate) child_ids: Vec<NodeId>,
    pub(crate) world_matrix: Mat4,
    // Stamp of the last `Scene::update` that visited this node.
    pub(crate) visited: u64,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh_id: None,
            parent_id: None,
            child_ids: Vec::new(),
            world_matrix: Mat4::IDENTITY,
            visited: 0,
        }
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    /// Children in insertion order.
    pub fn child_ids(&self) -> &[NodeId] {
        &self.child_ids
    }

    pub fn mesh_id(&self) -> Option<MeshId> {
        self.mesh_id
    }

    /// World matrix as of the last `Scene::update`.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn world_translation(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.transform.local_matrix()
    }

    pub fn set_translation(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.transform.set_translation(Vec3::new(x, y, z));
        self
    }

    pub fn apply_translation(&mut self, delta: Vec3) -> &mut Self {
        self.transform.apply_translation(delta);
        self
    }

    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.transform.set_scale(Vec3::new(x, y, z));
        self
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.transform.set_rotation(rotation);
        self
    }

    pub fn rotate(&mut self, axis: Vec3, angle: f32) -> &mut Self {
        self.transform.rotate(axis, angle);
        self
    }

    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        self.transform.rotate_x(angle);
        self
    }

    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        self.transform.rotate_y(angle);
        self
    }

    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        self.transform.rotate_z(angle);
        self
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation()
    }

    pub fn translation(&self) -> Vec3 {
        self.transform.translation()
    }
}
