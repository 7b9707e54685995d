mod cli;
mod config;
mod context;
mod definition;
mod executor;
mod init;
mod iteration;
mod monitor;
mod progress;
mod report;
mod run;
mod scheduler;
mod shutdown;
mod step;
mod types;

pub mod prelude {
    pub use crate::cli::{GaleScenarioCli, ReporterOpt};
    pub use crate::config::{Credentials, ExecutorConfig, RunConfig, ThresholdConfig};
    pub use crate::context::UserValuesConstraint;
    pub use crate::context::{IterationContext, RunnerContext};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::iteration::run_iteration;
    pub use crate::report::RunReport;
    pub use crate::run::run;
    pub use crate::scheduler::ScheduleSummary;
    pub use crate::step::{Step, TemplateResult};
    pub use crate::types::GaleResult;

    pub use gale_core::prelude::{required, ShutdownSignalError, TemplateResolutionError};
    pub use gale_http_client::prelude::{HttpResponse, Method};
    pub use gale_instruments::Threshold;
}
