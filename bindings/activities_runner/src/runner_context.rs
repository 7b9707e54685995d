use gale_runner::prelude::UserValuesConstraint;

/// Values produced by [crate::common::register_and_login] and shared by every iteration.
#[derive(Default, Debug)]
pub struct ActivitiesRunnerContext {
    pub(crate) email: Option<String>,
    pub(crate) token: Option<String>,
}

impl UserValuesConstraint for ActivitiesRunnerContext {}

impl ActivitiesRunnerContext {
    /// The account the run is logged in as.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Sent verbatim in the `Authorization` header.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
