#![allow(dead_code)]

use gale_runner::prelude::{
    required, GaleScenarioCli, HttpResponse, IterationContext, ReporterOpt,
    ScenarioDefinitionBuilder, TemplateResult, UserValuesConstraint,
};
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

#[derive(Default, Debug)]
pub struct SetupValues {
    pub token: Option<String>,
}

impl UserValuesConstraint for SetupValues {}

#[derive(Default, Debug)]
pub struct Outputs {
    pub id: Option<u64>,
}

impl UserValuesConstraint for Outputs {}

pub type Ctx = IterationContext<SetupValues, Outputs>;

pub fn cli(base_url: &str) -> GaleScenarioCli {
    GaleScenarioCli {
        base_url: Some(base_url.to_string()),
        config: None,
        duration: None,
        timeout: None,
        email: None,
        password: None,
        reporter: ReporterOpt::Noop,
        run_id: Some("test-run".to_string()),
        no_progress: true,
    }
}

pub fn scenario(name: &str, base_url: &str) -> ScenarioDefinitionBuilder<SetupValues, Outputs> {
    ScenarioDefinitionBuilder::new(name, cli(base_url))
}

/// Start a stub server that keeps serving after `block_on` returns.
pub fn mock_server(runtime: &Runtime, mocks: Vec<Mock>) -> MockServer {
    runtime.block_on(async {
        let server = MockServer::start().await;
        for mock in mocks {
            mock.mount(&server).await;
        }
        server
    })
}

pub fn activities_path(_: &Ctx) -> TemplateResult<String> {
    Ok("/activities".to_string())
}

pub fn activity_path(ctx: &Ctx) -> TemplateResult<String> {
    Ok(format!("/activities/{}", required(ctx.get().id, "id")?))
}

pub fn new_activity_body(ctx: &Ctx) -> TemplateResult<serde_json::Value> {
    Ok(serde_json::json!({
        "title": ctx.runner_context().scenario_name(),
        "content": ctx.runner_context().started_at().to_rfc3339(),
        "time": ctx.worker_iteration(),
    }))
}

pub fn token_header(ctx: &Ctx) -> TemplateResult<String> {
    required(ctx.setup().token.clone(), "token")
}

pub fn capture_id(ctx: &mut Ctx, response: &HttpResponse) -> anyhow::Result<()> {
    let value: serde_json::Value = response.json()?;
    ctx.get_mut().id = value["id"].as_u64();
    Ok(())
}
