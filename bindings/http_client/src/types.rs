use std::time::Duration;

use anyhow::Context;
use gale_core::prelude::RequestError;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

/// A fully resolved request, ready to send.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Used to tag the latency sample, normally the step id.
    pub operation_id: String,
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    /// When absent, any 2xx status is accepted.
    pub expected_status: Option<u16>,
}

impl HttpRequest {
    pub fn new(operation_id: impl Into<String>, method: Method, url: Url) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            url,
            body: None,
            headers: Vec::new(),
            expected_status: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }
}

/// What came back from a request. Always produced, even when the request failed.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Absent on network errors.
    pub status: Option<u16>,
    pub latency: Duration,
    pub body: Option<String>,
    pub error: Option<RequestError>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let body = self.body.as_deref().context("Response has no body")?;
        serde_json::from_str(body).context("Response body is not the expected JSON")
    }
}
