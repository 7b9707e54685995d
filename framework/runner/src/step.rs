use std::fmt::{Debug, Formatter};

use gale_core::prelude::TemplateResolutionError;
use gale_http_client::prelude::{
    HeaderName, HeaderValue, HttpClientInstrumented, HttpRequest, HttpResponse, Method,
};

use crate::context::{IterationContext, UserValuesConstraint};

pub type TemplateResult<T> = Result<T, TemplateResolutionError>;

pub type PathTemplate<RV, V> = fn(&IterationContext<RV, V>) -> TemplateResult<String>;
pub type BodyTemplate<RV, V> = fn(&IterationContext<RV, V>) -> TemplateResult<serde_json::Value>;
pub type HeaderTemplate<RV, V> = fn(&IterationContext<RV, V>) -> TemplateResult<String>;
pub type ResponseCheck = fn(&HttpResponse) -> bool;
/// Store something from a response for later steps of the same iteration.
pub type Capture<RV, V> = fn(&mut IterationContext<RV, V>, &HttpResponse) -> anyhow::Result<()>;

/// One HTTP call within a scenario iteration.
///
/// Templates are plain functions over the [IterationContext], so a step can only read what the
/// setup hook and earlier steps have stored there.
pub struct Step<RV: UserValuesConstraint, V: UserValuesConstraint> {
    id: String,
    method: Method,
    path: PathTemplate<RV, V>,
    body: Option<BodyTemplate<RV, V>>,
    headers: Vec<(String, HeaderTemplate<RV, V>)>,
    expected_status: u16,
    checks: Vec<(String, ResponseCheck)>,
    capture: Option<Capture<RV, V>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> Step<RV, V> {
    /// A step expecting a `200` response, change that with [Step::expect_status].
    pub fn new(id: &str, method: Method, path: PathTemplate<RV, V>) -> Self {
        Self {
            id: id.to_string(),
            method,
            path,
            body: None,
            headers: Vec::new(),
            expected_status: 200,
            checks: Vec::new(),
            capture: None,
        }
    }

    pub fn get(id: &str, path: PathTemplate<RV, V>) -> Self {
        Self::new(id, Method::GET, path)
    }

    pub fn post(id: &str, path: PathTemplate<RV, V>) -> Self {
        Self::new(id, Method::POST, path)
    }

    pub fn put(id: &str, path: PathTemplate<RV, V>) -> Self {
        Self::new(id, Method::PUT, path)
    }

    pub fn delete(id: &str, path: PathTemplate<RV, V>) -> Self {
        Self::new(id, Method::DELETE, path)
    }

    pub fn with_body(mut self, body: BodyTemplate<RV, V>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: &str, value: HeaderTemplate<RV, V>) -> Self {
        self.headers.push((name.to_string(), value));
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Add a named check on top of the `status was <code>` check every step gets.
    pub fn with_check(mut self, name: &str, check: ResponseCheck) -> Self {
        self.checks.push((name.to_string(), check));
        self
    }

    /// Runs only when the response has a body.
    pub fn capture(mut self, capture: Capture<RV, V>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }

    pub(crate) fn status_check_name(&self) -> String {
        format!("status was {}", self.expected_status)
    }

    pub(crate) fn checks(&self) -> &[(String, ResponseCheck)] {
        &self.checks
    }

    pub(crate) fn capture_fn(&self) -> Option<Capture<RV, V>> {
        self.capture
    }

    /// Turn the templates into a request. Templates are resolved in order: path, body, headers.
    ///
    /// Header values that could not be sent, such as ones containing a newline, are rejected here
    /// so that they never reach the network.
    pub(crate) fn resolve(
        &self,
        ctx: &IterationContext<RV, V>,
        client: &HttpClientInstrumented,
    ) -> TemplateResult<HttpRequest> {
        let path = (self.path)(ctx)?;
        let mut request = HttpRequest::new(self.id.clone(), self.method.clone(), client.url_for(&path)?)
            .expect_status(self.expected_status);

        if let Some(body) = self.body {
            request = request.with_body(body(ctx)?);
        }
        for (name, value) in &self.headers {
            let value = value(ctx)?;
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(&value).is_err()
            {
                return Err(TemplateResolutionError::invalid(format!(
                    "header `{name}` of step [{}] is not a valid HTTP header",
                    self.id
                )));
            }
            request = request.with_header(name.clone(), value);
        }

        Ok(request)
    }
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> Debug for Step<RV, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("expected_status", &self.expected_status)
            .field(
                "checks",
                &self.checks.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
