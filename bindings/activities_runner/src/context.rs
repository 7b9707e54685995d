use gale_runner::prelude::{IterationContext, UserValuesConstraint};

use crate::runner_context::ActivitiesRunnerContext;

/// Outputs captured by earlier steps of an iteration.
#[derive(Default, Debug)]
pub struct ActivityOutputs {
    /// Id of the activity this iteration is working on, as returned by the service.
    pub activity_id: Option<String>,
}

impl UserValuesConstraint for ActivityOutputs {}

pub type ActivitiesContext = IterationContext<ActivitiesRunnerContext, ActivityOutputs>;
