use std::path::PathBuf;

use clap::Parser;

use crate::controller::DampingMode;
use crate::input::DEFAULT_POINTER_SENSITIVITY;
use crate::solar_system::SolarSystemConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "orrery")]
#[command(about = "Real-time solar system", long_about = None)]
pub struct Settings {
    /// Directory holding the planet textures and the skybox/ faces
    #[arg(long, default_value = "resources")]
    pub resources: PathBuf,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 70.0)]
    pub fov: f32,

    /// How velocity damping reacts to frame length
    #[arg(long, value_enum, default_value_t = DampingMode::PerFrame)]
    pub damping: DampingMode,

    /// Initial simulation rate
    #[arg(long, default_value_t = 0.001)]
    pub time_scale: f32,

    /// Look rotation in radians per pixel of pointer motion
    #[arg(long, default_value_t = DEFAULT_POINTER_SENSITIVITY)]
    pub sensitivity: f32,

    /// Carry Jupiter around the sun like the other planets
    #[arg(long)]
    pub all_bodies_orbit: bool,
}

impl Settings {
    pub fn solar_system(&self) -> SolarSystemConfig {
        let mut config = SolarSystemConfig::default().with_resources_dir(&self.resources);
        config.camera.fovy_degrees = self.fov;
        if self.all_bodies_orbit {
            config = config.with_all_bodies_orbiting();
        }
        config
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::parse_from(["orrery"])
    }
}
