mod common;
mod context;
mod runner_context;
mod templates;

pub mod prelude {
    /// Setup hooks and response helpers for activities scenarios.
    pub use crate::common::*;

    pub use crate::context::{ActivitiesContext, ActivityOutputs};
    pub use crate::runner_context::ActivitiesRunnerContext;

    /// Path, body and header templates for the activities service.
    pub use crate::templates::*;

    /// Re-export of the `gale_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use gale_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use gale_http_client::prelude::*;
}
