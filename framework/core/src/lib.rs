mod error;
mod result;
mod shutdown;

pub mod prelude {
    pub use crate::error::{required, RequestError, TemplateResolutionError};
    pub use crate::result::{CheckResult, IterationResult, StepFailure, StepResult};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
