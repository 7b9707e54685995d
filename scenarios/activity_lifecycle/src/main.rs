use std::time::Duration;

use activities_gale_runner::prelude::*;

fn setup(ctx: &mut RunnerContext<ActivitiesRunnerContext>) -> HookResult {
    register_and_login(ctx)?;

    if let Some(email) = ctx.get().email() {
        log::info!("Activities will be created by {email}");
    }

    Ok(())
}

fn main() -> GaleResult<()> {
    let builder = ScenarioDefinitionBuilder::<ActivitiesRunnerContext, ActivityOutputs>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .with_default_executor(ExecutorConfig::shared_iterations(
        30,
        1,
        Some(Duration::from_secs(1)),
        Duration::from_secs(120),
    ))
    .with_default_threshold(Threshold::new("checks", "rate>0.99")?)
    .with_default_threshold(Threshold::new("http_req_failed", "rate<0.01")?)
    .use_setup(setup)
    .with_step(
        Step::post("create_activity", activity_path)
            .with_header("Authorization", auth_header)
            .with_body(new_activity_body)
            .expect_status(201),
    )
    .with_step(
        Step::get("find_activity", activity_path)
            .with_header("Authorization", auth_header)
            .capture(capture_last_activity_id),
    )
    .with_step(
        Step::put("update_activity", captured_activity_path)
            .with_header("Authorization", auth_header)
            .with_body(updated_captured_activity_body)
            .expect_status(201),
    )
    .with_step(
        Step::delete("delete_activity", captured_activity_path)
            .with_header("Authorization", auth_header),
    );

    let report = run(builder)?;
    if !report.passed() {
        log::error!("Thresholds failed for {}", report.scenario_name);
        std::process::exit(99);
    }

    Ok(())
}
