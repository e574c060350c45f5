use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use crate::camera::Camera;
use crate::error::Result;
use crate::input::{LookDelta, MoveFlags};
use crate::scene_graph::{NodeId, Scene};

/// Velocity gained per reference tick while a direction key is held.
pub const MOVE_SPEED: f32 = 0.05;
/// Fraction of the velocity kept from one frame to the next.
pub const VELOCITY_DAMPING: f32 = 0.75;
pub const PITCH_LIMIT: f32 = FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DampingMode {
    /// Multiply by the damping factor once per frame, whatever its length.
    #[default]
    PerFrame,
    /// Raise the damping factor to the frame's time correction.
    FrameRateIndependent,
}

/// First-person look and move controls.
///
/// Look input turns the camera node; movement translates a separate player
/// node so that anything attached to the player follows the camera's position
/// but never its rotation.
#[derive(Debug, Clone)]
pub struct LookMoveController {
    velocity: Vec3,
    yaw: f32,
    pitch: f32,
    speed: f32,
    damping: DampingMode,
}

impl LookMoveController {
    pub fn new(damping: DampingMode) -> Self {
        Self {
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            speed: MOVE_SPEED,
            damping,
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Turns the camera by the accumulated deltas: yaw about the world up
    /// axis, pitch about the camera's right axis, pitch clamped to ±90°.
    pub fn look(&mut self, scene: &mut Scene, camera: &Camera, delta: LookDelta) -> Result<()> {
        self.yaw += delta.yaw;
        self.pitch = (self.pitch + delta.pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
        scene.node_mut(camera.node_id())?.set_rotation(rotation);

        Ok(())
    }

    /// Damps the camera-local velocity and adds the held directions.
    pub fn accelerate(&mut self, movement: MoveFlags, correction: f32) {
        let damping = match self.damping {
            DampingMode::PerFrame => VELOCITY_DAMPING,
            DampingMode::FrameRateIndependent => VELOCITY_DAMPING.powf(correction),
        };
        self.velocity *= damping;

        let speed = self.speed * correction;
        if movement.left {
            self.velocity.x -= speed;
        }
        if movement.right {
            self.velocity.x += speed;
        }
        if movement.forward {
            self.velocity.z -= speed;
        }
        if movement.backward {
            self.velocity.z += speed;
        }
    }

    /// One frame of control. Returns the translation applied to the player.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        player: NodeId,
        look: LookDelta,
        movement: MoveFlags,
        correction: f32,
    ) -> Result<Vec3> {
        self.accelerate(movement, correction);
        self.look(scene, camera, look)?;

        let translation = camera.direction(scene, self.velocity)?;
        scene.node_mut(player)?.apply_translation(translation);

        Ok(translation)
    }
}

impl Default for LookMoveController {
    fn default() -> Self {
        Self::new(DampingMode::default())
    }
}
