use anyhow::Result;
use clap::Parser;

use orrery::{config::Settings, window};

fn main() -> Result<()> {
    pretty_env_logger::init();

    let settings = Settings::parse();
    pollster::block_on(window::run(settings))?;

    Ok(())
}
