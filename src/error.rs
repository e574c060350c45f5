//! Structural errors of the scene graph.

use thiserror::Error;

use crate::scene_graph::{MeshId, NodeId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneGraphError {
    #[error("node {0:?} does not belong to this scene")]
    UnknownNode(NodeId),

    #[error("mesh {0:?} does not belong to this scene")]
    UnknownMesh(MeshId),

    #[error("node {0:?} cannot be its own parent")]
    SelfParent(NodeId),

    #[error("the scene root cannot be re-parented")]
    RootReparent,

    #[error("adding {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("node {0:?} already carries a mesh")]
    MeshSlotTaken(NodeId),

    /// A node was reached twice during a single traversal.
    #[error("scene graph is corrupt: node {0:?} reached twice in one traversal")]
    CorruptGraph(NodeId),
}

pub type Result<T> = std::result::Result<T, SceneGraphError>;
