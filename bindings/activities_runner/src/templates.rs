use gale_runner::prelude::{required, TemplateResult};

use crate::context::ActivitiesContext;

/// Activities are numbered from one, and each worker adds one per iteration.
fn own_activity_id(ctx: &ActivitiesContext) -> u64 {
    ctx.worker_iteration() + 1
}

pub fn activities_path(_: &ActivitiesContext) -> TemplateResult<String> {
    Ok("/activities".to_string())
}

/// All activities in one page.
pub fn activities_page_path(_: &ActivitiesContext) -> TemplateResult<String> {
    Ok("/activities?limit=100000&offset=0".to_string())
}

pub fn activity_by_iteration_path(ctx: &ActivitiesContext) -> TemplateResult<String> {
    Ok(format!("/activities/{}", own_activity_id(ctx)))
}

pub fn time_spent_path(_: &ActivitiesContext) -> TemplateResult<String> {
    Ok("/time_spent".to_string())
}

/// The authenticated activity collection.
pub fn activity_path(_: &ActivitiesContext) -> TemplateResult<String> {
    Ok("/activity".to_string())
}

/// The activity captured by an earlier step, see [crate::common::capture_last_activity_id].
pub fn captured_activity_path(ctx: &ActivitiesContext) -> TemplateResult<String> {
    let id = required(ctx.get().activity_id.as_deref(), "activity_id")?;
    Ok(format!("/activity/{id}"))
}

pub fn auth_header(ctx: &ActivitiesContext) -> TemplateResult<String> {
    Ok(required(ctx.setup().token(), "token")?.to_string())
}

pub fn new_activity_body(ctx: &ActivitiesContext) -> TemplateResult<serde_json::Value> {
    Ok(serde_json::json!({
        "title": ctx.runner_context().scenario_name(),
        "content": ctx.runner_context().started_at().to_rfc3339(),
        "time": ctx.worker_iteration(),
    }))
}

pub fn time_spent_body(ctx: &ActivitiesContext) -> TemplateResult<serde_json::Value> {
    Ok(serde_json::json!({
        "time": ctx.worker_iteration(),
        "activity_id": own_activity_id(ctx),
    }))
}

pub fn updated_activity_body(ctx: &ActivitiesContext) -> TemplateResult<serde_json::Value> {
    Ok(serde_json::json!({
        "id": own_activity_id(ctx),
        "title": "updated",
        "content": ctx.runner_context().started_at().to_rfc3339(),
        "time": ctx.worker_iteration(),
    }))
}

/// Body for `PUT /activity/{id}`, the id itself travels in the path.
pub fn updated_captured_activity_body(ctx: &ActivitiesContext) -> TemplateResult<serde_json::Value> {
    Ok(serde_json::json!({
        "title": "updated",
        "content": format!("updated by {}", ctx.worker_id()),
        "time": ctx.worker_iteration() + 1,
    }))
}
