use anyhow::Context;

use crate::controller::LookMoveController;
use crate::input::InputState;
use crate::render::Renderer;
use crate::solar_system::SolarSystem;

/// Duration of one tick at the 60 Hz reference rate, in milliseconds.
pub const TICK_RATE_MS: f64 = 1000.0 / 60.0;

/// Host capability that arranges for the next frame callback.
pub trait FrameScheduler {
    fn schedule_next_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub delta_ms: f64,
    /// Elapsed time relative to one reference tick.
    pub correction: f32,
}

/// Per-frame driver. Takes timestamps from the caller, so it can be run
/// against a display callback or against synthetic time.
#[derive(Debug)]
pub struct FrameLoop {
    then: f64,
    controller: LookMoveController,
}

impl FrameLoop {
    /// `start` is the timestamp the first frame's delta is measured from.
    pub fn new(start: f64, controller: LookMoveController) -> Self {
        Self {
            then: start,
            controller,
        }
    }

    pub fn controller(&self) -> &LookMoveController {
        &self.controller
    }

    pub fn tick(
        &mut self,
        now: f64,
        system: &mut SolarSystem,
        input: &InputState,
        renderer: &mut dyn Renderer,
        scheduler: &mut dyn FrameScheduler,
    ) -> anyhow::Result<FrameTiming> {
        let delta_ms = (now - self.then).max(0.0);
        self.then = now;
        let correction = (delta_ms / TICK_RATE_MS) as f32;

        // Draining resets the accumulators; motion arriving from here on
        // belongs to the next frame.
        let look = input.take_look();
        system.control(&mut self.controller, look, input.movement(), correction)?;

        system.animate(input.time_scale() * correction)?;

        system
            .scene_mut()
            .update()
            .context("Failed to update the scene graph")?;

        renderer.render(system.scene(), system.camera())?;

        scheduler.schedule_next_frame();

        log::trace!("Frame took {delta_ms:.2} ms (correction {correction:.3})");

        Ok(FrameTiming {
            delta_ms,
            correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use glam::Vec3;

    use super::*;
    use crate::camera::Camera;
    use crate::controller::DampingMode;
    use crate::error::SceneGraphError;
    use crate::input::Key;
    use crate::scene_graph::Scene;
    use crate::solar_system::SolarSystemConfig;
    use crate::texture::{TextureHandle, TextureStore};

    #[derive(Default)]
    struct CountingRenderer {
        textures: TextureStore,
        frames: usize,
        fail: bool,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, _scene: &Scene, _camera: &Camera) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("device lost");
            }
            self.frames += 1;
            Ok(())
        }

        fn load_texture(&mut self, path: &Path) -> TextureHandle {
            self.textures.load_texture(path)
        }

        fn load_cube_map(&mut self, faces: &[PathBuf; 6]) -> TextureHandle {
            self.textures.load_cube_map(faces)
        }

        fn set_size(&mut self, _width: u32, _height: u32) {}
    }

    #[derive(Default)]
    struct CountingScheduler {
        scheduled: usize,
    }

    impl FrameScheduler for CountingScheduler {
        fn schedule_next_frame(&mut self) {
            self.scheduled += 1;
        }
    }

    fn setup() -> (FrameLoop, SolarSystem, CountingRenderer) {
        let mut renderer = CountingRenderer::default();
        let config = SolarSystemConfig::default().with_resources_dir("missing");
        let system = SolarSystem::build(&config, 1.0, &mut renderer).unwrap();
        let frame_loop = FrameLoop::new(0.0, LookMoveController::new(DampingMode::PerFrame));
        (frame_loop, system, renderer)
    }

    #[test]
    fn correction_is_relative_to_reference_tick() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();

        let timing = frame_loop
            .tick(TICK_RATE_MS, &mut system, &input, &mut renderer, &mut scheduler)
            .unwrap();
        assert!((timing.correction - 1.0).abs() < 1e-6);

        let timing = frame_loop
            .tick(
                TICK_RATE_MS * 3.0,
                &mut system,
                &input,
                &mut renderer,
                &mut scheduler,
            )
            .unwrap();
        assert!((timing.delta_ms - 2.0 * TICK_RATE_MS).abs() < 1e-9);
        assert!((timing.correction - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reschedules_once_per_frame() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();

        for frame in 1..=5 {
            frame_loop
                .tick(
                    frame as f64 * TICK_RATE_MS,
                    &mut system,
                    &input,
                    &mut renderer,
                    &mut scheduler,
                )
                .unwrap();
        }

        assert_eq!(scheduler.scheduled, 5);
        assert_eq!(renderer.frames, 5);
    }

    #[test]
    fn failed_render_is_not_rescheduled() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();
        renderer.fail = true;

        let result = frame_loop.tick(
            TICK_RATE_MS,
            &mut system,
            &input,
            &mut renderer,
            &mut scheduler,
        );

        assert!(result.is_err());
        assert_eq!(scheduler.scheduled, 0);
    }

    #[test]
    fn failed_scene_update_skips_render_and_reschedule() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();

        let earth = system.body("Earth").unwrap().clone();
        let orbit = earth.orbit_node.unwrap();
        system.scene_mut().force_link(earth.center_node, orbit);

        let error = frame_loop
            .tick(
                TICK_RATE_MS,
                &mut system,
                &input,
                &mut renderer,
                &mut scheduler,
            )
            .unwrap_err();

        assert_eq!(
            error.downcast_ref::<SceneGraphError>(),
            Some(&SceneGraphError::CorruptGraph(orbit))
        );
        assert_eq!(renderer.frames, 0);
        assert_eq!(scheduler.scheduled, 0);
    }

    #[test]
    fn look_is_consumed_once() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();

        input.pointer_moved(-100.0, 0.0);
        frame_loop
            .tick(TICK_RATE_MS, &mut system, &input, &mut renderer, &mut scheduler)
            .unwrap();
        assert_eq!(input.pending_look(), Default::default());

        frame_loop
            .tick(
                2.0 * TICK_RATE_MS,
                &mut system,
                &input,
                &mut renderer,
                &mut scheduler,
            )
            .unwrap();
        assert!((frame_loop.controller().yaw() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn orbit_advances_by_time_scale_and_correction() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::new(0.5);
        let mut scheduler = CountingScheduler::default();

        frame_loop
            .tick(
                2.0 * TICK_RATE_MS,
                &mut system,
                &input,
                &mut renderer,
                &mut scheduler,
            )
            .unwrap();

        // Earth orbits at multiplier 1: 0.5 * 2 = 1 radian.
        let earth = system.body("Earth").unwrap();
        let position = system
            .scene()
            .node(earth.center_node)
            .unwrap()
            .world_translation();
        let expected = Vec3::new(1f32.cos(), 0.0, -1f32.sin()) * 11.45;
        assert!(position.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn held_key_moves_player() {
        let (mut frame_loop, mut system, mut renderer) = setup();
        let input = InputState::default();
        let mut scheduler = CountingScheduler::default();

        input.key_changed(Key::KeyW, true);
        frame_loop
            .tick(TICK_RATE_MS, &mut system, &input, &mut renderer, &mut scheduler)
            .unwrap();

        let player = system.scene().node(system.player()).unwrap();
        assert!(player
            .translation()
            .abs_diff_eq(Vec3::new(0.0, 0.0, -0.05), 1e-6));
    }
}
