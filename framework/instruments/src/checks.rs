use std::panic::{catch_unwind, AssertUnwindSafe};

use gale_core::prelude::CheckResult;

/// Applies named predicates to a response and keeps the pass/fail sample for each.
///
/// The samples travel with the step's result to the [crate::ThresholdAggregator], which folds them
/// into the `checks` rate.
#[derive(Debug, Default)]
pub struct CheckEvaluator {
    results: Vec<CheckResult>,
}

impl CheckEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `predicate` against `subject` and record the outcome under `name`.
    ///
    /// A predicate that panics is recorded as a failed check.
    pub fn evaluate<T: ?Sized>(
        &mut self,
        name: &str,
        subject: &T,
        predicate: impl FnOnce(&T) -> bool,
    ) -> bool {
        let passed = match catch_unwind(AssertUnwindSafe(|| predicate(subject))) {
            Ok(passed) => passed,
            Err(_) => {
                log::warn!("Check [{name}] panicked, recording it as failed");
                false
            }
        };

        self.results.push(CheckResult {
            name: name.to_string(),
            passed,
        });

        passed
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }
}
