pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod input;
pub mod light;
pub mod material;
pub mod render;
pub mod rendering;
pub mod scene_graph;
pub mod solar_system;
pub mod texture;
pub mod window;
