use anyhow::Context;
use gale_http_client::prelude::{HttpRequest, HttpResponse, Method};
use gale_runner::prelude::{Credentials, GaleResult, HookResult, RunnerContext};
use serde::Deserialize;

use crate::context::ActivitiesContext;
use crate::runner_context::ActivitiesRunnerContext;

const GENERATED_ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Registers an account and logs in with it, storing the token in [ActivitiesRunnerContext].
///
/// Uses the credentials given to the run, or a freshly generated account if there are none.
/// Registration is allowed to fail, because the account may already exist, but the login must
/// succeed for the run to start.
///
/// ```rust,no_run
/// use activities_gale_runner::prelude::*;
///
/// fn setup(ctx: &mut RunnerContext<ActivitiesRunnerContext>) -> HookResult {
///     register_and_login(ctx)?;
///     Ok(())
/// }
/// ```
pub fn register_and_login(ctx: &mut RunnerContext<ActivitiesRunnerContext>) -> HookResult {
    let credentials = ctx
        .credentials()
        .cloned()
        .unwrap_or_else(generate_credentials);
    let email = credentials.email.clone();
    let client = ctx.http_client().clone();

    let token = ctx
        .executor()
        .execute_in_place_or_stop(async move {
            let body = serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
            });

            log::debug!("Registering {}", credentials.email);
            let registration = client
                .execute(
                    HttpRequest::new("registration", Method::POST, client.url_for("/registration")?)
                        .with_body(body.clone())
                        .expect_status(200),
                )
                .await;
            if let Some(e) = &registration.error {
                log::warn!(
                    "Registration of {} was not accepted, trying to log in anyway: {e}",
                    credentials.email
                );
            }

            let login = client
                .execute(
                    HttpRequest::new("login", Method::POST, client.url_for("/login")?)
                        .with_body(body)
                        .expect_status(200),
                )
                .await;
            if let Some(e) = login.error {
                anyhow::bail!("Login failed for {}: {e}", credentials.email);
            }

            parse_token(login.body.as_deref().unwrap_or_default())
        })
        .context("Failed to log in to the activities service")?;

    log::info!("Logged in as {email}");
    let values = ctx.get_mut();
    values.email = Some(email);
    values.token = Some(token);

    Ok(())
}

/// A throwaway account that the service will accept.
pub fn generate_credentials() -> Credentials {
    Credentials {
        email: format!(
            "gale_{}@scheduler.iv",
            nanoid::nanoid!(12, &GENERATED_ID_ALPHABET)
        ),
        password: nanoid::nanoid!(24),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoginResponse {
    Token(String),
    Object { token: String },
}

/// Read the token from a login response, either a bare JSON string or `{"token": "..."}`.
pub fn parse_token(body: &str) -> GaleResult<String> {
    let response: LoginResponse =
        serde_json::from_str(body).context("Login response does not contain a token")?;

    let token = match response {
        LoginResponse::Token(token) => token,
        LoginResponse::Object { token } => token,
    };
    anyhow::ensure!(!token.is_empty(), "Login response contained an empty token");

    Ok(token)
}

/// The id of the last activity in a JSON list of activities.
///
/// Ids may be numbers or strings depending on the service version, both are returned as text.
pub fn last_activity_id(body: &str) -> GaleResult<String> {
    let activities: Vec<serde_json::Value> =
        serde_json::from_str(body).context("Expected a JSON list of activities")?;

    let last = activities.last().context("No activities in the list")?;
    match &last["id"] {
        serde_json::Value::Number(id) => Ok(id.to_string()),
        serde_json::Value::String(id) => Ok(id.clone()),
        other => anyhow::bail!("Activity has no usable id: {other}"),
    }
}

/// Capture the id of the most recently added activity from a list response.
pub fn capture_last_activity_id(
    ctx: &mut ActivitiesContext,
    response: &HttpResponse,
) -> anyhow::Result<()> {
    let id = last_activity_id(response.body.as_deref().unwrap_or_default())?;
    ctx.get_mut().activity_id = Some(id);

    Ok(())
}
