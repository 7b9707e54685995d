use crate::cli::GaleScenarioCli;
use clap::Parser;

/// Initialise the CLI and logging for the gale runner.
pub fn init() -> GaleScenarioCli {
    env_logger::init();

    GaleScenarioCli::parse()
}
