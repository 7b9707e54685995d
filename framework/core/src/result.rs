use std::time::Duration;

use crate::error::{RequestError, TemplateResolutionError};

/// A single named boolean assertion evaluated against one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    Request(RequestError),
    Template(TemplateResolutionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub step_id: String,
    /// Absent when the request never produced a response, or was never sent.
    pub status: Option<u16>,
    pub latency: Duration,
    pub checks: Vec<CheckResult>,
    pub failure: Option<StepFailure>,
}

impl StepResult {
    /// Record a step whose templates could not be resolved. No request was sent for it.
    pub fn template_failure(step_id: impl Into<String>, error: TemplateResolutionError) -> Self {
        Self {
            step_id: step_id.into(),
            status: None,
            latency: Duration::ZERO,
            checks: Vec::new(),
            failure: Some(StepFailure::Template(error)),
        }
    }

    /// Whether an HTTP request was actually issued for this step.
    pub fn sent_request(&self) -> bool {
        !matches!(self.failure, Some(StepFailure::Template(_)))
    }

    pub fn request_error(&self) -> Option<&RequestError> {
        match &self.failure {
            Some(StepFailure::Request(e)) => Some(e),
            _ => None,
        }
    }
}

/// Everything observed during one run of a scenario's step sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    /// Scenario wide iteration index.
    pub iteration: u64,
    pub worker_id: String,
    pub steps: Vec<StepResult>,
    pub duration: Duration,
}

impl IterationResult {
    /// The template error that ended this iteration early, if any.
    pub fn interrupted_by(&self) -> Option<&TemplateResolutionError> {
        self.steps.iter().find_map(|s| match &s.failure {
            Some(StepFailure::Template(e)) => Some(e),
            _ => None,
        })
    }

    pub fn checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.steps.iter().flat_map(|s| s.checks.iter())
    }

    pub fn requests(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.sent_request())
    }
}
