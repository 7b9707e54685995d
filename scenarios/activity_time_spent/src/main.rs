use std::time::Duration;

use activities_gale_runner::prelude::*;

fn setup(ctx: &mut RunnerContext<ActivitiesRunnerContext>) -> HookResult {
    register_and_login(ctx)?;
    Ok(())
}

fn main() -> GaleResult<()> {
    let abort_delay = Duration::from_secs(10);

    let builder = ScenarioDefinitionBuilder::<ActivitiesRunnerContext, ActivityOutputs>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .with_default_executor(ExecutorConfig::constant_arrival_rate(
        30,
        Duration::from_secs(60),
        Duration::from_secs(120),
        1,
    ))
    .with_default_threshold(Threshold::new("checks", "rate>0.99")?.abort_on_fail(abort_delay))
    .with_default_threshold(
        Threshold::new("http_req_duration", "p(99) < 100")?.abort_on_fail(abort_delay),
    )
    .with_default_threshold(
        Threshold::new("http_req_failed", "rate<0.01")?.abort_on_fail(abort_delay),
    )
    .use_setup(setup)
    .with_step(
        Step::post("add_activity", activities_path)
            .with_header("Authorization", auth_header)
            .with_body(new_activity_body),
    )
    .with_step(
        Step::post("add_time_spent", time_spent_path)
            .with_header("Authorization", auth_header)
            .with_body(time_spent_body),
    )
    .with_step(
        Step::put("update_activity", activity_by_iteration_path)
            .with_header("Authorization", auth_header)
            .with_body(updated_activity_body),
    );

    let report = run(builder)?;
    if !report.passed() {
        log::error!("Thresholds failed for {}", report.scenario_name);
        std::process::exit(99);
    }

    Ok(())
}
