//! 外勤场景：工单派工（work-order-dispatch）
//!
//! 资源匹配阶段调用独立的加权匹配算法（routing 模块）；候选资源清单与可选的
//! 约束覆盖随条目快照携带（availableResources / routingConstraints 字段），
//! 阶段本身保持纯函数。

use serde_json::json;

use crate::pipeline::aggregate::{find_code, find_step};
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation, Verdict};
use crate::pipeline::runner::{Pipeline, StageDef, StageOutput};
use crate::pipeline::step::StepRecord;
use crate::routing::{optimize_route, GeoPoint, RouteConstraints, RouteJob, RouteResource};

pub const CODE_NO_RESOURCES: &str = "NO-RESOURCES";
pub const CODE_INCOMPLETE: &str = "WO-INCOMPLETE";

pub fn pipeline() -> Pipeline {
    Pipeline {
        id: "work-order-dispatch",
        stages: vec![
            StageDef {
                title: "Work Order Triage",
                subsystem: "triage",
                agent: "Dispatch Agent",
                eval: triage,
            },
            StageDef {
                title: "Resource Matching",
                subsystem: "routing",
                agent: "Routing Agent",
                eval: resource_matching,
            },
            StageDef {
                title: "Schedule Projection",
                subsystem: "scheduling",
                agent: "Dispatch Agent",
                eval: schedule_projection,
            },
        ],
        decide,
    }
}

fn triage(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let priority = item.str_field("priority").unwrap_or("normal");
    let has_jobs = item.has_field("jobs") || item.has_field("location");
    if !has_jobs {
        return Ok(StageOutput::warning(
            "Work order carries no job location; nothing to dispatch.",
            json!({ "priority": priority }),
            Some(CODE_INCOMPLETE),
        ));
    }
    Ok(StageOutput::success(
        format!("Work order triaged at {priority} priority."),
        json!({ "priority": priority }),
    )
    .with_confidence(0.9))
}

/// 从条目快照还原待派工单列表：jobs 数组优先，否则把条目自身当作单个工单
fn jobs_from_item(item: &Item) -> Result<Vec<RouteJob>, String> {
    if let Some(jobs) = item.fields.get("jobs") {
        return serde_json::from_value(jobs.clone()).map_err(|e| format!("bad jobs payload: {e}"));
    }
    let location: GeoPoint = match item.fields.get("location") {
        Some(loc) => serde_json::from_value(loc.clone())
            .map_err(|e| format!("bad location payload: {e}"))?,
        None => return Ok(Vec::new()),
    };
    let required_skills = item
        .fields
        .get("requiredSkills")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    Ok(vec![RouteJob {
        id: item.id.clone(),
        required_skills,
        location,
        duration_mins: item.num_field("durationMins").unwrap_or(60.0) as u32,
    }])
}

fn resource_matching(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let resources: Vec<RouteResource> = match item.fields.get("availableResources") {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| format!("bad availableResources payload: {e}"))?,
        None => Vec::new(),
    };
    if resources.is_empty() {
        return Ok(StageOutput::warning(
            "No field resources are available for matching.",
            json!({ "resources": 0 }),
            Some(CODE_NO_RESOURCES),
        ));
    }

    let jobs = jobs_from_item(item)?;
    let constraints: RouteConstraints = item
        .fields
        .get("routingConstraints")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let plan = optimize_route(&jobs, &resources, &constraints);
    let narrative = format!(
        "Matched {} of {} job(s); {:.1} km total travel.",
        plan.assignments.len(),
        jobs.len(),
        plan.total_distance_km,
    );
    let plan_value = serde_json::to_value(&plan).map_err(|e| e.to_string())?;
    Ok(StageOutput::success(narrative, json!({ "plan": plan_value })).with_confidence(0.85))
}

fn schedule_projection(_item: &Item, prior: &[StepRecord]) -> Result<StageOutput, String> {
    let matching = match find_step(prior, "Resource Matching") {
        Some(s) if s.code().is_none() => s,
        _ => {
            return Ok(StageOutput::warning(
                "No schedule to project without a resource match.",
                json!({ "projected": false }),
                None,
            ));
        }
    };

    let plan = &matching.outcome.detail()["plan"];
    let total_mins = plan["total_duration_mins"].as_u64().unwrap_or(0);
    let unassigned = plan["unassigned"].as_array().map(Vec::len).unwrap_or(0);
    Ok(StageOutput::success(
        format!("Projected crew time {total_mins} minutes; {unassigned} job(s) awaiting staff."),
        json!({ "total_duration_mins": total_mins, "unassigned": unassigned }),
    )
    .with_confidence(0.8))
}

fn decide(steps: &[StepRecord]) -> Recommendation {
    if let Some(flag) =
        find_code(steps, CODE_NO_RESOURCES).or_else(|| find_code(steps, CODE_INCOMPLETE))
    {
        return Recommendation {
            verdict: Verdict::Review,
            reason: flag.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("escalate_staffing", "Escalate to staffing")],
            confidence: 0.7,
        };
    }

    let matching = find_step(steps, "Resource Matching");
    let fully_assigned = matching
        .map(|s| {
            s.outcome.detail()["plan"]["unassigned"]
                .as_array()
                .map(|u| u.is_empty())
                .unwrap_or(false)
        })
        .unwrap_or(false);
    let reason = matching
        .map(|s| s.narrative.clone())
        .unwrap_or_else(|| "Dispatch plan ready.".to_string());

    if fully_assigned {
        Recommendation {
            verdict: Verdict::Process,
            reason,
            references: Vec::new(),
            actions: vec![Action::new("dispatch_crew", "Dispatch assigned crew")],
            confidence: 0.85,
        }
    } else {
        Recommendation {
            verdict: Verdict::Review,
            reason,
            references: Vec::new(),
            actions: vec![
                Action::new("dispatch_crew", "Dispatch assigned crew"),
                Action::new("escalate_staffing", "Escalate unassigned jobs"),
            ],
            confidence: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn work_order() -> Item {
        Item::new("WO-7", "work_order")
            .with_field("priority", "high")
            .with_field("requiredSkills", json!(["hvac"]))
            .with_field("location", json!({ "lat": 30.27, "lng": -97.74 }))
            .with_field("durationMins", 90)
            .with_field(
                "availableResources",
                json!([
                    { "id": "R-1", "name": "Crew 1", "skills": ["hvac"],
                      "location": { "lat": 30.3, "lng": -97.7 }, "available": true, "active_jobs": 0 }
                ]),
            )
    }

    #[test]
    fn test_full_assignment_processes() {
        let run = pipeline().run(&work_order(), &mut |_| {});
        let rec = run.recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Process);
        assert_eq!(rec.actions[0].action_type, "dispatch_crew");

        let matching = find_step(&run.steps, "Resource Matching").unwrap();
        assert_eq!(matching.agent, "Routing Agent");
        assert!(matching.outcome.detail()["plan"]["assignments"].is_array());
    }

    #[test]
    fn test_no_resources_goes_to_review() {
        let mut item = work_order();
        item.fields.remove("availableResources");
        let rec = pipeline().run(&item, &mut |_| {}).recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Review);
    }
}
