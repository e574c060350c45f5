pub mod mesh;
pub mod node;
pub mod scene;
pub mod transform;

pub use mesh::{Mesh, MeshId, Primitive};
pub use node::{Node, NodeId};
pub use scene::{DrawItem, Scene};
pub use transform::Transform;
