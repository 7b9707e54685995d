use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None)]
pub struct GaleScenarioCli {
    /// Base URL of the service under test, for example `http://localhost:3030`
    #[clap(short, long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// A TOML run configuration. Values given on the command line take precedence over the file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// How long to run for, for example `2m` or `90s`.
    ///
    /// Replaces the duration of a constant arrival rate scenario, or the maximum duration of a
    /// shared iterations scenario.
    #[clap(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Timeout for each HTTP call. Defaults to 60s.
    #[clap(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Email to register and log in with. A throwaway account is generated if not set.
    #[clap(long, env = "GALE_EMAIL")]
    pub email: Option<String>,

    /// Password to register and log in with
    #[clap(long, env = "GALE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// How per-operation results are reported when the run finishes
    #[clap(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Identifies this run in logs and reports. Generated if not set.
    #[clap(long)]
    pub run_id: Option<String>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Print a summary table of every operation at the end of the run
    #[default]
    InMemory,
    /// Don't report operations
    Noop,
}
