mod common;

use std::time::Duration;

use common::*;
use gale_runner::prelude::{
    run, ExecutorConfig, HookResult, HttpResponse, RunnerContext, Step, TemplateResult, Threshold,
};
use pretty_assertions::assert_eq;
use tokio::runtime::Runtime;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn once() -> ExecutorConfig {
    ExecutorConfig::shared_iterations(1, 1, None, Duration::from_secs(10))
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut RunnerContext<SetupValues>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    let scenario = scenario("propagate_error_in_setup_hook", "http://localhost:3030")
        .with_default_executor(once())
        .use_setup(setup)
        .with_step(Step::get("list_activities", activities_path));

    let result = run(scenario);

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "Error in setup hook");
}

#[test]
fn passing_step_records_passing_status_check() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(method("POST"))
            .and(path("/activities"))
            .and(body_json(serde_json::json!({
                "title": "passing_step_records_passing_status_check",
                "content": serde_json::Value::Null,
                "time": 0,
            })))
            .respond_with(ResponseTemplate::new(200))],
    );

    // The start time can't be known up front, so only match on the fields that can.
    fn body(ctx: &Ctx) -> gale_runner::prelude::TemplateResult<serde_json::Value> {
        Ok(serde_json::json!({
            "title": ctx.runner_context().scenario_name(),
            "content": serde_json::Value::Null,
            "time": ctx.worker_iteration(),
        }))
    }

    let scenario = scenario("passing_step_records_passing_status_check", &server.uri())
        .with_default_executor(once())
        .with_step(Step::post("add_activity", activities_path).with_body(body));

    let report = run(scenario).unwrap();

    let status_checks = &report.metrics.checks_by_name["status was 200"];
    assert_eq!((status_checks.hits, status_checks.total), (1, 1));
    assert_eq!(report.metrics.http_requests, 1);
    assert_eq!(report.metrics.http_failures, 0);
    assert!(report.is_complete());
}

#[test]
fn failing_step_is_recorded_and_iteration_continues() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![
            Mock::given(method("POST"))
                .and(path("/activities"))
                .respond_with(ResponseTemplate::new(500)),
            Mock::given(method("GET"))
                .and(path("/activities"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1),
        ],
    );

    let scenario = scenario("failing_step_is_recorded_and_iteration_continues", &server.uri())
        .with_default_executor(once())
        .with_default_threshold(Threshold::new("checks", "rate>0.99").unwrap())
        .with_step(Step::post("add_activity", activities_path).with_body(new_activity_body))
        .with_step(Step::get("list_activities", activities_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.http_requests, 2);
    assert_eq!(report.metrics.http_status_errors, 1);
    assert_eq!(report.metrics.network_errors, 0);
    assert_eq!((report.metrics.checks.hits, report.metrics.checks.total), (1, 2));
    assert_eq!(report.metrics.interrupted_iterations, 0);
    assert!(!report.passed());
    // Not an abort threshold, so the run was not cut short.
    assert_eq!(report.aborted_by, None);

    runtime.block_on(server.verify());
}

#[test]
fn captured_output_feeds_later_steps() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![
            Mock::given(method("POST"))
                .and(path("/activities"))
                .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 42 }))),
            Mock::given(method("DELETE"))
                .and(path("/activities/42"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1),
        ],
    );

    let scenario = scenario("captured_output_feeds_later_steps", &server.uri())
        .with_default_executor(once())
        .with_step(
            Step::post("add_activity", activities_path)
                .with_body(new_activity_body)
                .expect_status(201)
                .capture(capture_id),
        )
        .with_step(Step::delete("delete_activity", activity_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.http_failures, 0);
    assert!(report.passed());
    runtime.block_on(server.verify());
}

#[test]
fn missing_output_stops_the_iteration() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("Activity added"))
            .expect(2)],
    );

    // The body is not JSON, so the capture fails and `id` is never set.
    let scenario = scenario("missing_output_stops_the_iteration", &server.uri())
        .with_default_executor(ExecutorConfig::shared_iterations(
            2,
            1,
            None,
            Duration::from_secs(10),
        ))
        .with_step(
            Step::post("add_activity", activities_path)
                .with_body(new_activity_body)
                .capture(capture_id),
        )
        .with_step(Step::put("update_activity", activity_path))
        .with_step(Step::delete("delete_activity", activity_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.iterations, 2);
    assert_eq!(report.metrics.interrupted_iterations, 2);
    // Only the first step of each iteration sent a request.
    assert_eq!(report.metrics.http_requests, 2);
    assert_eq!(report.schedule.finished, 2);
    runtime.block_on(server.verify());
}

#[test]
fn setup_values_reach_templates() {
    fn setup(ctx: &mut RunnerContext<SetupValues>) -> HookResult {
        ctx.get_mut().token = Some("token-123".to_string());
        Ok(())
    }

    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(method("GET"))
            .and(header("Authorization", "token-123"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)],
    );

    let scenario = scenario("setup_values_reach_templates", &server.uri())
        .with_default_executor(ExecutorConfig::shared_iterations(
            3,
            1,
            None,
            Duration::from_secs(10),
        ))
        .use_setup(setup)
        .with_step(Step::get("list_activities", activities_path).with_header("Authorization", token_header));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.http_failures, 0);
    runtime.block_on(server.verify());
}

#[test]
fn custom_checks_are_recorded_by_name() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any()).respond_with(ResponseTemplate::new(200).set_body_string("[]"))],
    );

    let scenario = scenario("custom_checks_are_recorded_by_name", &server.uri())
        .with_default_executor(once())
        .with_step(
            Step::get("list_activities", activities_path)
                .with_check("body is a list", |r| r.body.as_deref() == Some("[]"))
                .with_check("body is not empty", |r| {
                    r.body.as_deref().map(|b| b != "[]").unwrap_or(false)
                })
                .with_check("predicate panics", |_| panic!("broken check")),
        );

    let report = run(scenario).unwrap();

    let by_name = &report.metrics.checks_by_name;
    assert_eq!(by_name["body is a list"].hits, 1);
    assert_eq!(by_name["body is not empty"].hits, 0);
    assert_eq!(by_name["predicate panics"].hits, 0);
    assert_eq!(by_name["predicate panics"].total, 1);
    assert_eq!(report.metrics.checks.total, 4);
}

#[test]
fn unreachable_service_is_a_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let scenario = scenario(
        "unreachable_service_is_a_network_error",
        &format!("http://127.0.0.1:{port}"),
    )
    .with_default_executor(once())
    .with_step(Step::get("list_activities", activities_path))
    .with_step(Step::get("list_activities_again", activities_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.network_errors, 2);
    assert_eq!(report.metrics.http_requests, 2);
    assert_eq!(report.metrics.http_req_duration_p99_ms, None);
    assert_eq!(report.schedule.finished, 1);
}

fn panicking_capture(ctx: &mut Ctx, response: &HttpResponse) -> anyhow::Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(response.body.as_deref().unwrap_or_default()).unwrap();
    ctx.get_mut().id = value["id"].as_u64();
    Ok(())
}

fn panicking_path(_: &Ctx) -> TemplateResult<String> {
    panic!("path template is broken")
}

#[test]
fn panicking_capture_does_not_stop_the_run() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any()).respond_with(ResponseTemplate::new(200).set_body_string("Activity added"))],
    );

    let scenario = scenario("panicking_capture_does_not_stop_the_run", &server.uri())
        .with_default_executor(ExecutorConfig::shared_iterations(
            5,
            1,
            None,
            Duration::from_secs(10),
        ))
        .with_step(
            Step::post("add_activity", activities_path)
                .with_body(new_activity_body)
                .capture(panicking_capture),
        )
        .with_step(Step::delete("delete_activity", activity_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.schedule.finished, 5);
    assert_eq!(report.metrics.iterations, 5);
    // Nothing was captured, so every iteration stops at the step that needs the id.
    assert_eq!(report.metrics.interrupted_iterations, 5);
    assert_eq!(report.metrics.http_requests, 5);
    assert!(report.is_complete());
}

#[test]
fn panicking_capture_keeps_arrival_rate_workers_alive() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any()).respond_with(ResponseTemplate::new(200).set_body_string("Activity added"))],
    );

    let scenario = scenario(
        "panicking_capture_keeps_arrival_rate_workers_alive",
        &server.uri(),
    )
    .with_default_executor(ExecutorConfig::constant_arrival_rate(
        10,
        Duration::from_secs(1),
        Duration::from_secs(1),
        2,
    ))
    .with_step(
        Step::post("add_activity", activities_path)
            .with_body(new_activity_body)
            .capture(panicking_capture),
    );

    let report = run(scenario).unwrap();

    assert!(
        report.schedule.finished >= 9,
        "finished {} iterations",
        report.schedule.finished
    );
    assert_eq!(report.schedule.dropped, 0);
    assert_eq!(report.schedule.started, report.schedule.finished);
    assert_eq!(report.metrics.iterations, report.schedule.finished);
}

#[test]
fn panicking_template_is_a_template_failure() {
    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0)],
    );

    let scenario = scenario("panicking_template_is_a_template_failure", &server.uri())
        .with_default_executor(ExecutorConfig::shared_iterations(
            3,
            1,
            None,
            Duration::from_secs(10),
        ))
        .with_step(Step::get("list_activities", panicking_path))
        .with_step(Step::get("list_activities_again", activities_path));

    let report = run(scenario).unwrap();

    assert_eq!(report.schedule.finished, 3);
    assert_eq!(report.metrics.iterations, 3);
    assert_eq!(report.metrics.interrupted_iterations, 3);
    assert_eq!(report.metrics.http_requests, 0);
    runtime.block_on(server.verify());
}

#[test]
fn invalid_header_value_is_a_template_failure() {
    fn broken_token(_: &Ctx) -> TemplateResult<String> {
        Ok("token\nwith a newline".to_string())
    }

    let runtime = Runtime::new().unwrap();
    let server = mock_server(
        &runtime,
        vec![Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0)],
    );

    let scenario = scenario("invalid_header_value_is_a_template_failure", &server.uri())
        .with_default_executor(once())
        .with_step(Step::get("list_activities", activities_path).with_header("Authorization", broken_token));

    let report = run(scenario).unwrap();

    assert_eq!(report.metrics.interrupted_iterations, 1);
    assert_eq!(report.metrics.http_requests, 0);
    assert_eq!(report.metrics.network_errors, 0);
    assert_eq!(report.metrics.http_failures, 0);
    runtime.block_on(server.verify());
}
