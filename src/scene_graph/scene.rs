use glam::Mat4;
use id_arena::Arena;

use crate::error::{Result, SceneGraphError};
use crate::geometry::{Geometry, GeometryId};
use crate::light::Light;
use crate::material::{Material, MaterialId, MaterialManager};
use crate::scene_graph::mesh::{Mesh, MeshId, Primitive};
use crate::scene_graph::node::{Node, NodeId};

/// A mesh reachable from the scene root, positioned by its node's world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node_id: NodeId,
    pub mesh_id: MeshId,
    pub world_matrix: Mat4,
}

pub struct Scene {
    nodes: Arena<Node>,
    meshes: Arena<Mesh>,
    geometries: Arena<Geometry>,
    pub materials: MaterialManager,
    lights: Vec<Light>,
    root: NodeId,
    update_stamp: u64,
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new("Scene"));

        Self {
            nodes,
            meshes: Arena::new(),
            geometries: Arena::new(),
            materials: MaterialManager::new(),
            lights: Vec::new(),
            root,
            update_stamp: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Creates a node, attached to `parent` right away if one is given.
    pub fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId> {
        if let Some(parent_id) = parent {
            self.node(parent_id)?;
        }

        let node_id = self.nodes.alloc(Node::new(name));

        if let Some(parent_id) = parent {
            self.link(parent_id, node_id);
        }

        Ok(node_id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(SceneGraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneGraphError::UnknownNode(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first. Adding a node to its current parent is a no-op.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if parent == child {
            return Err(SceneGraphError::SelfParent(child));
        }

        let current_parent = self.node(child)?.parent_id;
        self.node(parent)?;

        if child == self.root {
            return Err(SceneGraphError::RootReparent);
        }

        if self.is_ancestor(child, parent) {
            return Err(SceneGraphError::Cycle { parent, child });
        }

        if current_parent == Some(parent) {
            return Ok(());
        }

        self.unlink(child);
        self.link(parent, child);

        Ok(())
    }

    /// Turns `child` into a detached root. Its local transform is untouched.
    pub fn detach(&mut self, child: NodeId) -> Result<()> {
        self.node(child)?;
        self.unlink(child);
        Ok(())
    }

    /// Whether `ancestor` appears on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|node| node.parent_id);

        // The chain can never be longer than the node count in a sound graph.
        for _ in 0..self.nodes.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.nodes.get(id).and_then(|node| node.parent_id),
                None => return false,
            }
        }

        false
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent_id = Some(parent);
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.child_ids.push(child);
        }
    }

    /// Pushes a child id without any of the checks `add` makes.
    #[cfg(test)]
    pub(crate) fn force_link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.child_ids.push(child);
        }
    }

    fn unlink(&mut self, child: NodeId) {
        let old_parent = self
            .nodes
            .get_mut(child)
            .and_then(|node| node.parent_id.take());

        if let Some(old_parent_id) = old_parent {
            if let Some(old_parent) = self.nodes.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child);
            }
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.alloc(geometry)
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &Geometry)> {
        self.geometries.iter()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add_material(material)
    }

    pub fn create_sphere(
        &mut self,
        material: MaterialId,
        width_segments: u32,
        height_segments: u32,
    ) -> Primitive {
        let geometry = self.add_geometry(Geometry::sphere(width_segments, height_segments));
        Primitive::new(geometry, material)
    }

    pub fn create_cube(&mut self, material: MaterialId, inverted: bool) -> Primitive {
        let geometry = self.add_geometry(Geometry::cube(inverted));
        Primitive::new(geometry, material)
    }

    /// Creates a node under `parent` that carries a new mesh.
    pub fn add_mesh(
        &mut self,
        name: &str,
        parent: NodeId,
        primitives: Vec<Primitive>,
    ) -> Result<NodeId> {
        let node_id = self.create_node(name, Some(parent))?;
        let mesh_id = self.meshes.alloc(Mesh {
            name: name.to_string(),
            primitives,
            node_id,
        });
        self.node_mut(node_id)?.mesh_id = Some(mesh_id);

        Ok(node_id)
    }

    /// Moves a mesh onto `node`, releasing the node it was attached to.
    pub fn attach_mesh(&mut self, mesh_id: MeshId, node_id: NodeId) -> Result<()> {
        let old_node_id = self
            .meshes
            .get(mesh_id)
            .ok_or(SceneGraphError::UnknownMesh(mesh_id))?
            .node_id;

        match self.node(node_id)?.mesh_id {
            Some(existing) if existing == mesh_id => return Ok(()),
            Some(_) => return Err(SceneGraphError::MeshSlotTaken(node_id)),
            None => {}
        }

        self.node_mut(old_node_id)?.mesh_id = None;
        self.node_mut(node_id)?.mesh_id = Some(mesh_id);
        if let Some(mesh) = self.meshes.get_mut(mesh_id) {
            mesh.node_id = node_id;
        }

        Ok(())
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter()
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Recomputes every world matrix top-down: the scene root first, then any
    /// detached roots. Each node is visited exactly once.
    pub fn update(&mut self) -> Result<()> {
        self.update_stamp += 1;
        let stamp = self.update_stamp;

        self.update_subtree(self.root, stamp)?;

        let detached_roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, node)| node.parent_id.is_none() && *id != self.root)
            .map(|(id, _)| id)
            .collect();

        for root_id in detached_roots {
            self.update_subtree(root_id, stamp)?;
        }

        Ok(())
    }

    fn update_subtree(&mut self, start: NodeId, stamp: u64) -> Result<()> {
        let mut stack = vec![(start, Mat4::IDENTITY)];

        while let Some((node_id, parent_world_matrix)) = stack.pop() {
            let node = self.node_mut(node_id)?;
            if node.visited == stamp {
                return Err(SceneGraphError::CorruptGraph(node_id));
            }
            node.visited = stamp;

            let world_matrix = parent_world_matrix * node.transform.local_matrix();
            node.world_matrix = world_matrix;

            // Reversed so children pop in insertion order.
            stack.extend(
                node.child_ids
                    .iter()
                    .rev()
                    .map(|&child_id| (child_id, world_matrix)),
            );
        }

        Ok(())
    }

    /// Nodes reachable from the root in depth-first, insertion order.
    pub fn traverse(&self) -> Result<Vec<NodeId>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];

        while let Some(node_id) = stack.pop() {
            let node = self.node(node_id)?;
            if std::mem::replace(&mut seen[node_id.index()], true) {
                return Err(SceneGraphError::CorruptGraph(node_id));
            }

            order.push(node_id);
            stack.extend(node.child_ids.iter().rev().copied());
        }

        Ok(order)
    }

    /// Meshes reachable from the root, in traversal order, with the world
    /// matrices of the last `update`.
    pub fn draw_list(&self) -> Result<Vec<DrawItem>> {
        let mut items = Vec::new();

        for node_id in self.traverse()? {
            let node = self.node(node_id)?;
            if let Some(mesh_id) = node.mesh_id {
                items.push(DrawItem {
                    node_id,
                    mesh_id,
                    world_matrix: node.world_matrix,
                });
            }
        }

        Ok(items)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::{Quat, Vec3};

    use super::*;
    use crate::material::SurfaceParameters;

    fn assert_world_invariant(scene: &Scene) {
        for (id, node) in scene.nodes.iter() {
            let expected = match node.parent_id {
                Some(parent_id) => {
                    scene.node(parent_id).unwrap().world_matrix() * node.local_matrix()
                }
                None => node.local_matrix(),
            };
            assert!(
                node.world_matrix().abs_diff_eq(expected, 1e-4),
                "world matrix of {:?} ({}) is stale",
                id,
                node.name
            );
        }
    }

    #[test]
    fn orbit_node_carries_body_around() {
        let mut scene = Scene::new();
        let orbit = scene.create_node("orbit", Some(scene.root())).unwrap();
        let body = scene.create_node("body", Some(orbit)).unwrap();
        scene.node_mut(body).unwrap().set_translation(10.0, 0.0, 0.0);

        scene.update().unwrap();
        assert!(scene
            .node(body)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));

        scene.node_mut(orbit).unwrap().rotate_y(FRAC_PI_2);
        scene.update().unwrap();
        assert!(scene
            .node(body)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(0.0, 0.0, -10.0), 1e-5));
    }

    #[test]
    fn world_matrix_is_parent_world_times_local() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.node_mut(root).unwrap().set_translation(0.0, 1.0, 0.0);

        let a = scene.create_node("a", Some(root)).unwrap();
        let b = scene.create_node("b", Some(a)).unwrap();
        let c = scene.create_node("c", Some(b)).unwrap();
        let loose = scene.create_node("loose", None).unwrap();

        scene
            .node_mut(a)
            .unwrap()
            .set_translation(2.0, 0.0, 0.0)
            .rotate_z(0.4);
        scene.node_mut(b).unwrap().set_scale(2.0, 0.5, 1.0).rotate_x(1.1);
        scene.node_mut(c).unwrap().set_translation(0.0, 0.0, 3.0);
        scene.node_mut(loose).unwrap().set_translation(7.0, 7.0, 7.0);

        scene.update().unwrap();
        assert_world_invariant(&scene);
        assert_eq!(
            scene.node(loose).unwrap().world_matrix(),
            scene.node(loose).unwrap().local_matrix()
        );
    }

    #[test]
    fn reparenting_keeps_local_and_moves_world() {
        let mut scene = Scene::new();
        let root = scene.root();
        let left = scene.create_node("left", Some(root)).unwrap();
        let right = scene.create_node("right", Some(root)).unwrap();
        let child = scene.create_node("child", Some(left)).unwrap();
        let grandchild = scene.create_node("grandchild", Some(child)).unwrap();

        scene.node_mut(left).unwrap().set_translation(-5.0, 0.0, 0.0);
        scene.node_mut(right).unwrap().set_translation(5.0, 0.0, 0.0);
        scene.node_mut(child).unwrap().set_translation(0.0, 1.0, 0.0);
        scene.node_mut(grandchild).unwrap().set_translation(0.0, 0.0, 1.0);
        scene.update().unwrap();

        let child_local = scene.node(child).unwrap().local_matrix();
        let grandchild_local = scene.node(grandchild).unwrap().local_matrix();

        scene.add(right, child).unwrap();
        scene.update().unwrap();

        assert_eq!(scene.node(child).unwrap().local_matrix(), child_local);
        assert_eq!(scene.node(grandchild).unwrap().local_matrix(), grandchild_local);
        assert!(scene.node(left).unwrap().child_ids().is_empty());
        assert_eq!(scene.node(right).unwrap().child_ids(), &[child]);
        assert!(scene
            .node(grandchild)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(5.0, 1.0, 1.0), 1e-5));
        assert_world_invariant(&scene);
    }

    #[test]
    fn adding_an_ancestor_is_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", Some(scene.root())).unwrap();
        let b = scene.create_node("b", Some(a)).unwrap();
        let c = scene.create_node("c", Some(b)).unwrap();

        assert_eq!(
            scene.add(c, a),
            Err(SceneGraphError::Cycle {
                parent: c,
                child: a
            })
        );
        assert_eq!(
            scene.add(b, a),
            Err(SceneGraphError::Cycle {
                parent: b,
                child: a
            })
        );
        assert_eq!(scene.add(a, a), Err(SceneGraphError::SelfParent(a)));
        assert_eq!(scene.add(c, scene.root()), Err(SceneGraphError::RootReparent));

        // The graph is untouched by rejected operations.
        assert_eq!(scene.node(a).unwrap().parent_id(), Some(scene.root()));
        assert_eq!(scene.node(a).unwrap().child_ids(), &[b]);
        assert!(scene.node(c).unwrap().child_ids().is_empty());
    }

    #[test]
    fn nodes_from_another_scene_are_unknown() {
        let mut scene = Scene::new();
        let mut other = Scene::new();
        let foreign = other.create_node("foreign", None).unwrap();

        assert_eq!(
            scene.create_node("orphan", Some(foreign)),
            Err(SceneGraphError::UnknownNode(foreign))
        );
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn a_node_has_a_single_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let first = scene.create_node("first", Some(root)).unwrap();
        let second = scene.create_node("second", Some(root)).unwrap();
        let child = scene.create_node("child", Some(first)).unwrap();

        scene.add(second, child).unwrap();
        scene.add(second, child).unwrap();

        assert!(scene.node(first).unwrap().child_ids().is_empty());
        assert_eq!(scene.node(second).unwrap().child_ids(), &[child]);
        assert_eq!(scene.node(child).unwrap().parent_id(), Some(second));
    }

    #[test]
    fn detached_subtree_is_not_drawn_but_stays_updated() {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::Phong(SurfaceParameters::default()));
        let primitive = scene.create_sphere(material, 8, 8);

        let holder = scene.create_node("holder", Some(scene.root())).unwrap();
        let ball = scene.add_mesh("ball", holder, vec![primitive]).unwrap();
        scene.node_mut(holder).unwrap().set_translation(1.0, 0.0, 0.0);
        scene.update().unwrap();
        assert_eq!(scene.draw_list().unwrap().len(), 1);

        scene.detach(holder).unwrap();
        scene.update().unwrap();
        assert!(scene.draw_list().unwrap().is_empty());
        assert!(scene
            .node(ball)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn traversal_follows_insertion_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node("a", Some(root)).unwrap();
        let a1 = scene.create_node("a1", Some(a)).unwrap();
        let b = scene.create_node("b", Some(root)).unwrap();
        let a2 = scene.create_node("a2", Some(a)).unwrap();
        let b1 = scene.create_node("b1", Some(b)).unwrap();

        assert_eq!(scene.traverse().unwrap(), vec![root, a, a1, a2, b, b1]);

        // Re-parenting appends at the end of the new parent's list.
        scene.add(b, a1).unwrap();
        assert_eq!(scene.traverse().unwrap(), vec![root, a, a2, b, b1, a1]);
    }

    #[test]
    fn draw_list_uses_world_matrices_in_order() {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::Phong(SurfaceParameters::default()));
        let base = scene.create_sphere(material, 8, 8);
        let other_material = scene.add_material(Material::Basic(SurfaceParameters::default()));
        let copy = Primitive::from_base(&base, other_material);

        let root = scene.root();
        let first = scene.add_mesh("first", root, vec![base]).unwrap();
        let second = scene.add_mesh("second", first, vec![copy]).unwrap();
        scene.node_mut(first).unwrap().set_scale(2.0, 2.0, 2.0);
        scene.node_mut(second).unwrap().set_translation(1.0, 0.0, 0.0);
        scene.update().unwrap();

        let items = scene.draw_list().unwrap();
        assert_eq!(
            items.iter().map(|item| item.node_id).collect::<Vec<_>>(),
            vec![first, second]
        );
        assert!(items[1]
            .world_matrix
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));

        let first_mesh = scene.mesh(items[0].mesh_id).unwrap();
        let second_mesh = scene.mesh(items[1].mesh_id).unwrap();
        assert_eq!(first_mesh.primitives[0].geometry, second_mesh.primitives[0].geometry);
        assert_ne!(first_mesh.primitives[0].material, second_mesh.primitives[0].material);
        assert_eq!(scene.geometries().count(), 1);
    }

    #[test]
    fn mesh_moves_between_nodes() {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::Phong(SurfaceParameters::default()));
        let primitive = scene.create_cube(material, false);
        let root = scene.root();
        let carrier = scene.add_mesh("carrier", root, vec![primitive]).unwrap();
        let target = scene.create_node("target", Some(root)).unwrap();
        let mesh_id = scene.node(carrier).unwrap().mesh_id().unwrap();

        scene.attach_mesh(mesh_id, target).unwrap();

        assert_eq!(scene.node(carrier).unwrap().mesh_id(), None);
        assert_eq!(scene.node(target).unwrap().mesh_id(), Some(mesh_id));
        assert_eq!(scene.mesh(mesh_id).unwrap().node_id(), target);
        assert_eq!(scene.attach_mesh(mesh_id, target), Ok(()));

        let other = scene.add_mesh("other", root, vec![primitive]).unwrap();
        let other_mesh = scene.node(other).unwrap().mesh_id().unwrap();
        assert_eq!(
            scene.attach_mesh(other_mesh, target),
            Err(SceneGraphError::MeshSlotTaken(target))
        );
    }

    #[test]
    fn corrupt_graph_fails_instead_of_looping() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", Some(scene.root())).unwrap();
        let b = scene.create_node("b", Some(a)).unwrap();

        scene.force_link(b, a);

        assert_eq!(scene.update(), Err(SceneGraphError::CorruptGraph(a)));
        assert_eq!(scene.traverse(), Err(SceneGraphError::CorruptGraph(a)));
    }

    #[test]
    fn incremental_spin_accumulates() {
        let mut scene = Scene::new();
        let spinner = scene.create_node("spinner", Some(scene.root())).unwrap();

        for _ in 0..90 {
            scene.node_mut(spinner).unwrap().rotate_y(FRAC_PI_2 / 90.0);
        }
        scene.update().unwrap();

        assert!(scene
            .node(spinner)
            .unwrap()
            .rotation()
            .abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), 1e-5));
    }
}
