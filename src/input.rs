//! Input accumulators shared between event handlers and the frame loop.
//!
//! Handlers only ever add to or flip the state here; the frame loop drains
//! the look deltas once per frame. Everything is atomic, so the state can be
//! shared with handlers running on another thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Physical keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    ArrowUp,
    ArrowDown,
    Escape,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LookDelta {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveFlags {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

pub const DEFAULT_POINTER_SENSITIVITY: f32 = 0.001;

pub const TIME_SCALE_MIN: f32 = 0.000001;
pub const TIME_SCALE_MAX: f32 = 10.0;
const TIME_SCALE_UP: f32 = 1.05;
const TIME_SCALE_DOWN: f32 = 0.95;

#[derive(Debug)]
pub struct InputState {
    yaw: AtomicU32,
    pitch: AtomicU32,
    forward: AtomicBool,
    backward: AtomicBool,
    left: AtomicBool,
    right: AtomicBool,
    time_scale: AtomicU32,
    pointer_sensitivity: f32,
}

impl InputState {
    pub fn new(initial_time_scale: f32) -> Self {
        Self {
            yaw: AtomicU32::new(0f32.to_bits()),
            pitch: AtomicU32::new(0f32.to_bits()),
            forward: AtomicBool::new(false),
            backward: AtomicBool::new(false),
            left: AtomicBool::new(false),
            right: AtomicBool::new(false),
            time_scale: AtomicU32::new(initial_time_scale.to_bits()),
            pointer_sensitivity: DEFAULT_POINTER_SENSITIVITY,
        }
    }

    pub fn with_pointer_sensitivity(mut self, sensitivity: f32) -> Self {
        self.pointer_sensitivity = sensitivity;
        self
    }

    /// Pointer motion in pixels while the pointer is locked. Moving right
    /// yields negative yaw, moving down yields negative pitch.
    pub fn pointer_moved(&self, dx: f32, dy: f32) {
        update_f32(&self.yaw, |yaw| yaw - dx * self.pointer_sensitivity);
        update_f32(&self.pitch, |pitch| pitch - dy * self.pointer_sensitivity);
    }

    pub fn key_changed(&self, key: Key, pressed: bool) {
        match key {
            Key::KeyW => self.forward.store(pressed, Ordering::Release),
            Key::KeyS => self.backward.store(pressed, Ordering::Release),
            Key::KeyA => self.left.store(pressed, Ordering::Release),
            Key::KeyD => self.right.store(pressed, Ordering::Release),
            Key::ArrowUp if pressed => {
                let time_scale = self.speed_up();
                log::debug!("Simulation rate increased to {time_scale}");
            }
            Key::ArrowDown if pressed => {
                let time_scale = self.slow_down();
                log::debug!("Simulation rate decreased to {time_scale}");
            }
            Key::ArrowUp | Key::ArrowDown | Key::Escape => {}
        }
    }

    /// Returns the look deltas accumulated since the previous call and resets
    /// them in the same atomic step.
    pub fn take_look(&self) -> LookDelta {
        LookDelta {
            yaw: f32::from_bits(self.yaw.swap(0f32.to_bits(), Ordering::AcqRel)),
            pitch: f32::from_bits(self.pitch.swap(0f32.to_bits(), Ordering::AcqRel)),
        }
    }

    pub fn pending_look(&self) -> LookDelta {
        LookDelta {
            yaw: f32::from_bits(self.yaw.load(Ordering::Acquire)),
            pitch: f32::from_bits(self.pitch.load(Ordering::Acquire)),
        }
    }

    pub fn movement(&self) -> MoveFlags {
        MoveFlags {
            forward: self.forward.load(Ordering::Acquire),
            backward: self.backward.load(Ordering::Acquire),
            left: self.left.load(Ordering::Acquire),
            right: self.right.load(Ordering::Acquire),
        }
    }

    /// Releases every held key, e.g. when the window loses focus.
    pub fn release_all(&self) {
        for flag in [&self.forward, &self.backward, &self.left, &self.right] {
            flag.store(false, Ordering::Release);
        }
    }

    pub fn time_scale(&self) -> f32 {
        f32::from_bits(self.time_scale.load(Ordering::Acquire))
    }

    pub fn speed_up(&self) -> f32 {
        update_f32(&self.time_scale, |time| (time * TIME_SCALE_UP).min(TIME_SCALE_MAX))
    }

    pub fn slow_down(&self) -> f32 {
        update_f32(&self.time_scale, |time| {
            (time * TIME_SCALE_DOWN).max(TIME_SCALE_MIN)
        })
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(0.001)
    }
}

fn update_f32(atomic: &AtomicU32, f: impl Fn(f32) -> f32) -> f32 {
    let mut current = atomic.load(Ordering::Acquire);
    loop {
        let next = f(f32::from_bits(current));
        match atomic.compare_exchange_weak(
            current,
            next.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return next,
            Err(actual) => current = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_deltas_accumulate_until_taken() {
        let input = InputState::default();
        input.pointer_moved(10.0, -4.0);
        input.pointer_moved(5.0, 2.0);

        let look = input.take_look();
        assert!((look.yaw - -0.015).abs() < 1e-6);
        assert!((look.pitch - 0.002).abs() < 1e-6);

        assert_eq!(input.take_look(), LookDelta::default());
    }

    #[test]
    fn concurrent_handlers_lose_no_motion() {
        let input = InputState::default();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        input.pointer_moved(-1000.0, 0.0);
                    }
                });
            }
        });

        assert_eq!(input.take_look().yaw, 1000.0);
    }

    #[test]
    fn movement_flags_follow_key_state() {
        let input = InputState::default();
        input.key_changed(Key::KeyW, true);
        input.key_changed(Key::KeyD, true);
        input.key_changed(Key::KeyW, false);

        assert_eq!(
            input.movement(),
            MoveFlags {
                right: true,
                ..MoveFlags::default()
            }
        );

        input.release_all();
        assert_eq!(input.movement(), MoveFlags::default());
    }

    #[test]
    fn speed_up_multiplies_and_clamps() {
        let input = InputState::new(0.001);
        input.key_changed(Key::ArrowUp, true);
        assert!((input.time_scale() - 0.00105).abs() < 1e-9);

        // Key release does not change the rate.
        input.key_changed(Key::ArrowUp, false);
        assert!((input.time_scale() - 0.00105).abs() < 1e-9);

        for _ in 0..500 {
            input.key_changed(Key::ArrowUp, true);
        }
        assert_eq!(input.time_scale(), TIME_SCALE_MAX);
    }

    #[test]
    fn slow_down_clamps_at_minimum() {
        let input = InputState::new(0.001);
        for _ in 0..1000 {
            input.key_changed(Key::ArrowDown, true);
        }
        assert_eq!(input.time_scale(), TIME_SCALE_MIN);
    }
}
