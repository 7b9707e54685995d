mod client;
mod types;

pub mod prelude {
    pub use crate::client::HttpClientInstrumented;
    pub use crate::types::{HttpRequest, HttpResponse};

    // Re-exported so that scenarios don't need a direct dependency on reqwest.
    pub use reqwest::header::{HeaderName, HeaderValue};
    pub use reqwest::Method;
}
