use std::time::Duration;

use activities_gale_runner::prelude::*;

fn setup(ctx: &mut RunnerContext<ActivitiesRunnerContext>) -> HookResult {
    register_and_login(ctx)?;
    Ok(())
}

fn main() -> GaleResult<()> {
    let builder = ScenarioDefinitionBuilder::<ActivitiesRunnerContext, ActivityOutputs>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .with_default_executor(ExecutorConfig::constant_arrival_rate(
        30,
        Duration::from_secs(60),
        Duration::from_secs(120),
        1,
    ))
    .with_default_threshold(
        Threshold::new("checks", "rate>0.99")?.abort_on_fail(Duration::from_secs(5)),
    )
    .with_default_threshold(
        Threshold::new("http_req_failed", "rate<0.01")?.abort_on_fail(Duration::from_secs(5)),
    )
    .use_setup(setup)
    .with_step(
        Step::get("list_activities", activities_page_path)
            .with_header("Authorization", auth_header),
    )
    .with_step(
        Step::post("add_activity", activities_path)
            .with_header("Authorization", auth_header)
            .with_body(new_activity_body),
    )
    .with_step(
        Step::delete("delete_activity", activity_by_iteration_path)
            .with_header("Authorization", auth_header),
    );

    let report = run(builder)?;
    if !report.passed() {
        log::error!("Thresholds failed for {}", report.scenario_name);
        std::process::exit(99);
    }

    Ok(())
}
