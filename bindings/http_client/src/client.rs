use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use gale_core::prelude::{RequestError, TemplateResolutionError};
use gale_instruments::{report_operation, OperationRecord, Reporter};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::types::{HttpRequest, HttpResponse};

/// Wraps a [reqwest::Client] so that every call is timed, classified and reported.
///
/// One client is shared by all workers of a run.
#[derive(Debug, Clone)]
pub struct HttpClientInstrumented {
    client: reqwest::Client,
    base_url: String,
    reporter: Arc<Reporter>,
}

impl HttpClientInstrumented {
    pub fn new(base_url: &str, timeout: Duration, reporter: Arc<Reporter>) -> anyhow::Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            reporter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `path` to the base URL, keeping any path prefix the base URL has.
    pub fn url_for(&self, path: &str) -> Result<Url, TemplateResolutionError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| TemplateResolutionError::InvalidUrl {
            url,
            reason: e.to_string(),
        })
    }

    /// Send the request and wait for the full response body.
    ///
    /// Never fails: transport problems are reported as [RequestError::Network] with no status, and
    /// a status other than the expected one as [RequestError::HttpStatus].
    pub async fn execute(&self, request: HttpRequest) -> HttpResponse {
        let mut operation_record = OperationRecord::new(request.operation_id.clone());

        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let started = Instant::now();
        let outcome = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;
        let latency = started.elapsed();

        let response = match outcome {
            Ok((status, body)) => {
                let accepted = match request.expected_status {
                    Some(expected) => status == expected,
                    None => (200..300).contains(&status),
                };
                operation_record.add_attr("status", status);

                HttpResponse {
                    status: Some(status),
                    latency,
                    body: Some(body),
                    error: (!accepted).then_some(RequestError::HttpStatus { status }),
                }
            }
            Err(e) => {
                log::debug!("Request [{}] failed without a response: {e:?}", operation_record.operation_id());
                HttpResponse {
                    status: None,
                    latency,
                    body: None,
                    error: Some(RequestError::network(describe_transport_error(&e))),
                }
            }
        };

        report_operation(&self.reporter, operation_record, response.error.is_some());

        response
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else if e.is_builder() {
        "request"
    } else {
        "transport"
    };

    format!("{kind}: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_instruments::ReportConfig;

    fn client(base_url: &str) -> HttpClientInstrumented {
        HttpClientInstrumented::new(
            base_url,
            Duration::from_secs(1),
            Arc::new(ReportConfig::default().init()),
        )
        .unwrap()
    }

    #[test]
    fn joins_paths_onto_base_url() {
        let client = client("http://localhost:3030/");
        assert_eq!(
            client.url_for("/activities/4").unwrap().as_str(),
            "http://localhost:3030/activities/4"
        );
        assert_eq!(
            client
                .url_for("activities?limit=100000&offset=0")
                .unwrap()
                .as_str(),
            "http://localhost:3030/activities?limit=100000&offset=0"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let client = client("http://localhost:3030/api");
        assert_eq!(
            client.url_for("/login").unwrap().as_str(),
            "http://localhost:3030/api/login"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpClientInstrumented::new(
            "not a url",
            Duration::from_secs(1),
            Arc::new(ReportConfig::default().init())
        )
        .is_err());
    }
}
