//! The solar system scene: a sun, its planets, a moon, and a player rig that
//! carries the camera and the skybox.
//!
//! Every orbiting body gets three nodes: an orbit node attached to whatever it
//! circles, a centre node translated out along +X, and a mesh node that holds
//! the scale and spins in place. Rotating the orbit node moves the centre
//! around the parent; rotating the mesh node spins the body without touching
//! anything attached to its centre.
//!
//! Jupiter keeps its stock layout by default: the distance sits on the orbit
//! node, so rotating that node turns Jupiter in place instead of carrying it
//! around the sun.

use std::path::{Path, PathBuf};

use anyhow::Context;
use glam::{Vec3, Vec4};

use crate::camera::Camera;
use crate::controller::LookMoveController;
use crate::input::{LookDelta, MoveFlags};
use crate::light::Light;
use crate::material::{Material, SurfaceParameters};
use crate::render::Renderer;
use crate::scene_graph::{NodeId, Primitive, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    /// Relative to the resources directory.
    pub texture: PathBuf,
    /// Name of the body this one circles. `None` circles the sun.
    pub orbits: Option<String>,
    pub distance: f32,
    pub scale: Vec3,
    pub orbit_multiplier: f32,
    pub spin_multiplier: f32,
    pub ambient: f32,
    /// Put the distance on the orbit node instead of the centre node. The
    /// body then turns in place rather than circling its parent.
    pub translate_orbit_node: bool,
}

impl BodyConfig {
    pub fn new(name: &str, texture: &str, distance: f32, scale: f32) -> Self {
        Self {
            name: name.to_string(),
            texture: PathBuf::from(texture),
            orbits: None,
            distance,
            scale: Vec3::splat(scale),
            orbit_multiplier: 1.0,
            spin_multiplier: 1.0,
            ambient: 0.5,
            translate_orbit_node: false,
        }
    }

    pub fn orbits(mut self, parent: &str) -> Self {
        self.orbits = Some(parent.to_string());
        self
    }

    pub fn rates(mut self, orbit_multiplier: f32, spin_multiplier: f32) -> Self {
        self.orbit_multiplier = orbit_multiplier;
        self.spin_multiplier = spin_multiplier;
        self
    }

    pub fn ambient(mut self, ambient: f32) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn translate_orbit_node(mut self, translate_orbit_node: bool) -> Self {
        self.translate_orbit_node = translate_orbit_node;
        self
    }

    pub fn scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vec3::new(x, y, z);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub offset: Vec3,
    pub fovy_degrees: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarSystemConfig {
    pub resources_dir: PathBuf,
    pub sun_texture: PathBuf,
    pub sun_spin_multiplier: f32,
    pub sphere_segments: (u32, u32),
    pub bodies: Vec<BodyConfig>,
    pub light: Light,
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub skybox_faces: [PathBuf; 6],
    pub skybox_scale: f32,
    pub camera: CameraConfig,
}

impl SolarSystemConfig {
    pub fn with_resources_dir(mut self, resources_dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = resources_dir.into();
        self
    }

    /// Moves every body's distance onto its centre node so all of them
    /// circle their parent.
    pub fn with_all_bodies_orbiting(mut self) -> Self {
        for body in &mut self.bodies {
            body.translate_orbit_node = false;
        }
        self
    }

    fn resource(&self, relative: &Path) -> PathBuf {
        self.resources_dir.join(relative)
    }
}

impl Default for SolarSystemConfig {
    fn default() -> Self {
        let skybox_faces = ["right", "left", "top", "bottom", "front", "back"]
            .map(|face| PathBuf::from(format!("skybox/{face}.png")));

        Self {
            resources_dir: PathBuf::from("resources"),
            sun_texture: PathBuf::from("sun.jpg"),
            sun_spin_multiplier: 25.0,
            sphere_segments: (32, 32),
            bodies: vec![
                BodyConfig::new("Mercury", "mercury_daymap.jpg", 1.45, 0.031).rates(3.0, 88.0),
                BodyConfig::new("Earth", "earth_daymap.jpg", 11.45, 0.091).rates(1.0, 365.0),
                BodyConfig::new("Moon", "moon.jpg", 1.45, 0.051)
                    .orbits("Earth")
                    .rates(12.0, 12.0)
                    .ambient(0.3),
                BodyConfig::new("Mars", "mars.jpg", 14.45, 0.140)
                    .scale(0.140, 0.140, 0.141)
                    .rates(0.5, 365.0),
                BodyConfig::new("Jupiter", "jupiter.jpg", 77.8, 0.439)
                    .rates(1.0, 4330.0)
                    .translate_orbit_node(true),
            ],
            light: Light::default(),
            skybox_faces,
            skybox_scale: 1500.0,
            camera: CameraConfig {
                offset: Vec3::new(0.0, 0.0, 5.0),
                fovy_degrees: 70.0,
                near: 0.1,
                far: 5000.0,
            },
        }
    }
}

/// Nodes of one celestial body. The sun has no orbit node.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub orbit_node: Option<NodeId>,
    pub center_node: NodeId,
    pub mesh_node: NodeId,
    pub orbit_multiplier: f32,
    pub spin_multiplier: f32,
}

pub struct SolarSystem {
    scene: Scene,
    camera: Camera,
    player: NodeId,
    skybox: NodeId,
    bodies: Vec<Body>,
}

impl SolarSystem {
    pub fn build(
        config: &SolarSystemConfig,
        aspect: f32,
        renderer: &mut dyn Renderer,
    ) -> anyhow::Result<Self> {
        let mut scene = Scene::new();
        scene.add_light(config.light);
        let root = scene.root();

        let sun_texture = renderer.load_texture(&config.resource(&config.sun_texture));
        let sun_material = scene.add_material(Material::Basic(SurfaceParameters {
            map: Some(sun_texture.id),
            ..SurfaceParameters::default()
        }));
        let (width_segments, height_segments) = config.sphere_segments;
        let sun_primitive = scene.create_sphere(sun_material, width_segments, height_segments);
        let sun_node = scene.add_mesh("Sun", root, vec![sun_primitive])?;

        let mut bodies = vec![Body {
            name: "Sun".to_string(),
            orbit_node: None,
            center_node: sun_node,
            mesh_node: sun_node,
            orbit_multiplier: 0.0,
            spin_multiplier: config.sun_spin_multiplier,
        }];

        for body_config in &config.bodies {
            let parent = match &body_config.orbits {
                None => root,
                Some(parent_name) => {
                    bodies
                        .iter()
                        .find(|body| &body.name == parent_name)
                        .with_context(|| {
                            format!(
                                "{} orbits {parent_name}, which is not defined before it",
                                body_config.name
                            )
                        })?
                        .center_node
                }
            };

            let body = add_body(&mut scene, renderer, config, body_config, &sun_primitive, parent)
                .with_context(|| format!("Failed to add {}", body_config.name))?;
            bodies.push(body);
        }

        // The player goes last so the skybox and camera follow the bodies in
        // draw order.
        let player = scene.create_node("Player", Some(root))?;

        let faces = config.skybox_faces.clone().map(|face| config.resource(&face));
        let cube_map = renderer.load_cube_map(&faces);
        let skybox_material = scene.add_material(Material::CubeMap { map: cube_map.id });
        let skybox_primitive = scene.create_cube(skybox_material, true);
        let skybox = scene.add_mesh("Skybox", player, vec![skybox_primitive])?;
        let scale = config.skybox_scale;
        scene.node_mut(skybox)?.set_scale(scale, scale, scale);

        let camera = Camera::new(
            &mut scene,
            player,
            config.camera.fovy_degrees,
            aspect,
            config.camera.near,
            config.camera.far,
        )?;
        let offset = config.camera.offset;
        scene
            .node_mut(camera.node_id())?
            .set_translation(offset.x, offset.y, offset.z);
        camera.update_projection_matrix();

        scene.update()?;

        log::info!(
            "Solar system ready: {} bodies, {} nodes, {} meshes",
            bodies.len(),
            scene.node_count(),
            scene.meshes().count()
        );

        Ok(Self {
            scene,
            camera,
            player,
            skybox,
            bodies,
        })
    }

    /// Advances every orbit and spin by `factor` radians times the body's
    /// multiplier.
    pub fn animate(&mut self, factor: f32) -> anyhow::Result<()> {
        for body in &self.bodies {
            if let Some(orbit_node) = body.orbit_node {
                self.scene
                    .node_mut(orbit_node)?
                    .rotate_y(factor * body.orbit_multiplier);
            }

            self.scene
                .node_mut(body.mesh_node)?
                .rotate_y(factor * body.spin_multiplier);
        }

        Ok(())
    }

    /// Runs the look/move controller against the camera and player rig.
    pub fn control(
        &mut self,
        controller: &mut LookMoveController,
        look: LookDelta,
        movement: MoveFlags,
        correction: f32,
    ) -> anyhow::Result<Vec3> {
        let translation = controller.update(
            &mut self.scene,
            &self.camera,
            self.player,
            look,
            movement,
            correction,
        )?;

        Ok(translation)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn player(&self) -> NodeId {
        self.player
    }

    pub fn skybox(&self) -> NodeId {
        self.skybox
    }

    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|body| body.name == name)
    }
}

fn add_body(
    scene: &mut Scene,
    renderer: &mut dyn Renderer,
    config: &SolarSystemConfig,
    body: &BodyConfig,
    base: &Primitive,
    parent: NodeId,
) -> anyhow::Result<Body> {
    let texture = renderer.load_texture(&config.resource(&body.texture));
    let material = scene.add_material(Material::Phong(SurfaceParameters {
        ambient: Vec4::new(body.ambient, body.ambient, body.ambient, 1.0),
        map: Some(texture.id),
        ..SurfaceParameters::default()
    }));

    let orbit_node = scene.create_node(&format!("{} orbit", body.name), Some(parent))?;
    let center_node = scene.create_node(&format!("{} center", body.name), Some(orbit_node))?;
    let offset_node = if body.translate_orbit_node {
        orbit_node
    } else {
        center_node
    };
    scene
        .node_mut(offset_node)?
        .set_translation(body.distance, 0.0, 0.0);

    let mesh_node = scene.add_mesh(
        &body.name,
        center_node,
        vec![Primitive::from_base(base, material)],
    )?;
    scene
        .node_mut(mesh_node)?
        .set_scale(body.scale.x, body.scale.y, body.scale.z);

    Ok(Body {
        name: body.name.clone(),
        orbit_node: Some(orbit_node),
        center_node,
        mesh_node,
        orbit_multiplier: body.orbit_multiplier,
        spin_multiplier: body.spin_multiplier,
    })
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::Quat;

    use super::*;
    use crate::texture::{TextureHandle, TextureStore};

    #[derive(Default)]
    struct OfflineRenderer {
        textures: TextureStore,
        loads: Vec<PathBuf>,
    }

    impl Renderer for OfflineRenderer {
        fn render(&mut self, _scene: &Scene, _camera: &Camera) -> anyhow::Result<()> {
            Ok(())
        }

        fn load_texture(&mut self, path: &Path) -> TextureHandle {
            self.loads.push(path.to_path_buf());
            self.textures.load_texture(path)
        }

        fn load_cube_map(&mut self, faces: &[PathBuf; 6]) -> TextureHandle {
            self.loads.extend(faces.iter().cloned());
            self.textures.load_cube_map(faces)
        }

        fn set_size(&mut self, _width: u32, _height: u32) {}
    }

    fn build() -> (SolarSystem, OfflineRenderer) {
        let mut renderer = OfflineRenderer::default();
        let config = SolarSystemConfig::default().with_resources_dir("does/not/exist");
        let system = SolarSystem::build(&config, 16.0 / 9.0, &mut renderer).unwrap();
        (system, renderer)
    }

    #[test]
    fn missing_resources_fall_back_without_failing() {
        let (_system, renderer) = build();

        assert_eq!(renderer.loads.len(), 6 + 6);
        assert!(renderer
            .loads
            .iter()
            .all(|path| path.starts_with("does/not/exist")));
        assert_eq!(renderer.textures.len(), 7);
    }

    #[test]
    fn bodies_start_at_their_distance() {
        let (system, _) = build();
        let scene = system.scene();

        for (name, x) in [
            ("Sun", 0.0),
            ("Mercury", 1.45),
            ("Earth", 11.45),
            ("Mars", 14.45),
            ("Jupiter", 77.8),
        ] {
            let body = system.body(name).unwrap();
            let position = scene.node(body.mesh_node).unwrap().world_translation();
            assert!(
                position.abs_diff_eq(Vec3::new(x, 0.0, 0.0), 1e-4),
                "{name} at {position}"
            );
        }

        let moon = system.body("Moon").unwrap();
        assert!(scene
            .node(moon.mesh_node)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(12.9, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn moon_orbits_earth_center() {
        let (system, _) = build();
        let scene = system.scene();

        let earth = system.body("Earth").unwrap();
        let moon = system.body("Moon").unwrap();
        let moon_orbit = moon.orbit_node.unwrap();

        assert_eq!(
            scene.node(moon_orbit).unwrap().parent_id(),
            Some(earth.center_node)
        );
        // Earth's spin does not carry the moon.
        assert!(!scene.is_ancestor(earth.mesh_node, moon.mesh_node));
    }

    #[test]
    fn animate_turns_orbits_and_spins() {
        let (mut system, _) = build();
        system.animate(FRAC_PI_2).unwrap();
        system.scene_mut().update().unwrap();

        let scene = system.scene();
        let earth = system.body("Earth").unwrap();
        assert!(scene
            .node(earth.mesh_node)
            .unwrap()
            .world_translation()
            .abs_diff_eq(Vec3::new(0.0, 0.0, -11.45), 1e-4));

        let mars = system.body("Mars").unwrap();
        let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.5);
        assert!(scene
            .node(mars.orbit_node.unwrap())
            .unwrap()
            .rotation()
            .abs_diff_eq(expected, 1e-6));

        let sun = system.body("Sun").unwrap();
        let expected = Quat::from_rotation_y(FRAC_PI_2 * 25.0);
        assert!(scene
            .node(sun.mesh_node)
            .unwrap()
            .rotation()
            .abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn jupiter_turns_in_place_by_default() {
        let (mut system, _) = build();
        system.animate(FRAC_PI_2).unwrap();
        system.scene_mut().update().unwrap();

        let jupiter = system.body("Jupiter").unwrap();
        let position = system
            .scene()
            .node(jupiter.center_node)
            .unwrap()
            .world_translation();
        assert!(
            position.abs_diff_eq(Vec3::new(77.8, 0.0, 0.0), 1e-3),
            "Jupiter at {position}"
        );
    }

    #[test]
    fn jupiter_circles_the_sun_when_all_bodies_orbit() {
        let mut renderer = OfflineRenderer::default();
        let config = SolarSystemConfig::default()
            .with_resources_dir("does/not/exist")
            .with_all_bodies_orbiting();
        let mut system = SolarSystem::build(&config, 16.0 / 9.0, &mut renderer).unwrap();
        system.animate(FRAC_PI_2).unwrap();
        system.scene_mut().update().unwrap();

        let jupiter = system.body("Jupiter").unwrap();
        let position = system
            .scene()
            .node(jupiter.center_node)
            .unwrap()
            .world_translation();
        assert!(
            position.abs_diff_eq(Vec3::new(0.0, 0.0, -77.8), 1e-3),
            "Jupiter at {position}"
        );
    }

    #[test]
    fn planets_share_sun_geometry() {
        let (system, _) = build();
        let scene = system.scene();
        let draw_list = scene.draw_list().unwrap();

        // Sun, five bodies, skybox.
        assert_eq!(draw_list.len(), 7);
        assert_eq!(draw_list.last().unwrap().node_id, system.skybox());

        let sun_geometry = scene
            .mesh(draw_list[0].mesh_id)
            .unwrap()
            .primitives[0]
            .geometry;
        for item in &draw_list[..6] {
            let primitive = scene.mesh(item.mesh_id).unwrap().primitives[0];
            assert_eq!(primitive.geometry, sun_geometry);
        }
        assert_eq!(scene.geometries().count(), 2);
    }

    #[test]
    fn camera_and_skybox_hang_off_player() {
        let (system, _) = build();
        let scene = system.scene();

        assert_eq!(
            scene.node(system.camera().node_id()).unwrap().parent_id(),
            Some(system.player())
        );
        assert_eq!(
            scene.node(system.skybox()).unwrap().parent_id(),
            Some(system.player())
        );
        assert!(system
            .camera()
            .world_position(scene)
            .unwrap()
            .abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));
        let root = scene.node(scene.root()).unwrap();
        assert_eq!(root.child_ids().last(), Some(&system.player()));
    }
}
