use id_arena::Id;

use crate::geometry::GeometryId;
use crate::material::MaterialId;
use crate::scene_graph::node::NodeId;

pub type MeshId = Id<Mesh>;

/// Geometry drawn with a material. Geometry is shared, so copying a
/// primitive never duplicates vertex data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Primitive {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

impl Primitive {
    pub fn new(geometry: GeometryId, material: MaterialId) -> Self {
        Self { geometry, material }
    }

    /// Same geometry as `base`, drawn with `material`.
    pub fn from_base(base: &Primitive, material: MaterialId) -> Self {
        Self {
            geometry: base.geometry,
            material,
        }
    }
}

pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
    pub(crate) node_id: NodeId,
}

impl Mesh {
    /// The node whose world matrix places this mesh.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
}
