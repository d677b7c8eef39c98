use std::env;

use simplelog::{ConfigBuilder, SharedLogger};

use crate::prelude::*;

pub const LOG_ENV_VAR: &str = "PROCTREE_LOG";

/// Log level requested through `PROCTREE_LOG`, `warn` when unset or invalid
pub fn log_level_from_env() -> log::LevelFilter {
    env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|log_level| log_level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn)
}

/// Terminal logger writing to stderr only, stdout is reserved for the rendered tree.
pub fn get_logger() -> Box<dyn SharedLogger> {
    let config = ConfigBuilder::new()
        .set_time_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Debug)
        .build();

    simplelog::TermLogger::new(
        log_level_from_env(),
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
}

pub fn init_logger() -> Result<()> {
    simplelog::CombinedLogger::init(vec![get_logger()])?;
    Ok(())
}
