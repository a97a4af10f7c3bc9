//! 理赔场景：定制器具制作期与授权额度审查（build-limit-review）
//!
//! 五个阶段严格串行：收件审查 → 服务方资格 → 额度检查 → 州辖区审查 → 拒付判定。
//! 拒付判定阶段依赖额度检查阶段的告警结果（超窗才触发 N26），
//! 是「后续阶段消费先前结果」契约的典型用例。

use serde_json::json;

use crate::pipeline::aggregate::{find_code, find_step, flagged_references, mean_confidence};
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation, Verdict};
use crate::pipeline::runner::{Pipeline, StageDef, StageOutput};
use crate::pipeline::step::{Reference, StepRecord, StepStatus};

/// 制作期超出授权窗口的拒付代码
pub const DENIAL_EXCEEDS_BUILD: &str = "N26";
/// 材料不全
pub const CODE_DOC_MISSING: &str = "DOC-MISSING";
/// 服务方不符合资格
pub const CODE_PROVIDER_INELIGIBLE: &str = "P-INEL";
/// 服务方资格未核验
pub const CODE_PROVIDER_UNVERIFIED: &str = "P-UNVERIFIED";

pub fn pipeline() -> Pipeline {
    Pipeline {
        id: "build-limit-review",
        stages: vec![
            StageDef {
                title: "Intake Review",
                subsystem: "intake",
                agent: "Analysis Agent",
                eval: intake_review,
            },
            StageDef {
                title: "Provider Eligibility",
                subsystem: "eligibility",
                agent: "Analysis Agent",
                eval: provider_eligibility,
            },
            StageDef {
                title: "Limit Check",
                subsystem: "limits",
                agent: "Risk Assessor",
                eval: limit_check,
            },
            StageDef {
                title: "Jurisdiction Review",
                subsystem: "jurisdiction",
                agent: "Reference Matcher",
                eval: jurisdiction_review,
            },
            StageDef {
                title: "Denial Determination",
                subsystem: "adjudication",
                agent: "Risk Assessor",
                eval: denial_determination,
            },
        ],
        decide,
    }
}

fn intake_review(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let build = item.num_field("buildDays");
    let authorized = item.num_field("authorizedDays");

    match (build, authorized) {
        (Some(b), Some(a)) => Ok(StageOutput::success(
            format!(
                "Custom build claim received: {b} day fabrication window reported, \
                 plan authorizes {a} days."
            ),
            json!({ "build_days": b, "authorized_days": a }),
        )
        .with_confidence(0.95)),
        _ => {
            let mut missing = Vec::new();
            if build.is_none() {
                missing.push("buildDays");
            }
            if authorized.is_none() {
                missing.push("authorizedDays");
            }
            Ok(StageOutput::warning(
                format!("Claim is missing required fields: {}.", missing.join(", ")),
                json!({ "missing": missing }),
                Some(CODE_DOC_MISSING),
            )
            .with_confidence(0.9))
        }
    }
}

fn provider_eligibility(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    match item.bool_field("providerEligible") {
        Some(true) => Ok(StageOutput::success(
            "Servicing provider is credentialed and eligible for this benefit.",
            json!({ "provider_eligible": true }),
        )
        .with_confidence(0.9)),
        Some(false) => Ok(StageOutput::warning(
            "Servicing provider is not eligible for this benefit.",
            json!({ "provider_eligible": false }),
            Some(CODE_PROVIDER_INELIGIBLE),
        )
        .with_confidence(0.85)),
        None => Ok(StageOutput::warning(
            "Provider eligibility could not be verified from the claim record.",
            json!({ "provider_eligible": serde_json::Value::Null }),
            Some(CODE_PROVIDER_UNVERIFIED),
        )
        .with_confidence(0.6)),
    }
}

fn limit_check(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let (build, authorized) = match (item.num_field("buildDays"), item.num_field("authorizedDays")) {
        (Some(b), Some(a)) => (b, a),
        _ => {
            return Ok(StageOutput::warning(
                "Build window cannot be verified without authorization data.",
                json!({ "skipped": true }),
                None,
            ));
        }
    };

    if build > authorized {
        let excess = build - authorized;
        Ok(StageOutput::warning(
            format!(
                "Build period of {build} days exceeds the {authorized} days \
                 authorized by the plan ({excess} days over)."
            ),
            json!({
                "build_days": build,
                "authorized_days": authorized,
                "excess_days": excess,
            }),
            None,
        )
        .with_confidence(0.9)
        .with_reference(Reference::new("plan-doc-p9", "policy_document", "Page 9")))
    } else {
        Ok(StageOutput::success(
            format!("Build period of {build} days is within the {authorized} days authorized."),
            json!({ "build_days": build, "authorized_days": authorized }),
        )
        .with_confidence(0.92))
    }
}

fn jurisdiction_review(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    match item.str_field("state") {
        Some(state) => Ok(StageOutput::success(
            format!(
                "Claim is governed by {state} plan rules; no state mandate \
                 extends the authorized build window."
            ),
            json!({ "state": state }),
        )
        .with_confidence(0.85)),
        None => Ok(StageOutput::success(
            "No state jurisdiction on file; default plan rules apply.",
            json!({ "state": serde_json::Value::Null }),
        )
        .with_confidence(0.8)),
    }
}

/// 仅当额度检查阶段标记超窗时才给出拒付代码
fn denial_determination(_item: &Item, prior: &[StepRecord]) -> Result<StageOutput, String> {
    let limit = find_step(prior, "Limit Check");
    let breached = limit
        .map(|s| s.status() == StepStatus::Warning && s.outcome.detail().get("excess_days").is_some())
        .unwrap_or(false);

    if breached {
        Ok(StageOutput::warning(
            format!(
                "Denial code {DENIAL_EXCEEDS_BUILD} applies: the fabrication period \
                 exceeds the build window authorized by the plan."
            ),
            json!({ "denial_code": DENIAL_EXCEEDS_BUILD }),
            Some(DENIAL_EXCEEDS_BUILD),
        )
        .with_confidence(0.92))
    } else if limit.map(|s| s.status() == StepStatus::Warning).unwrap_or(false) {
        Ok(StageOutput::warning(
            "No determination possible until the authorization data is complete.",
            json!({ "denial_code": serde_json::Value::Null }),
            None,
        )
        .with_confidence(0.6))
    } else {
        Ok(StageOutput::success(
            "No denial condition present; the claim qualifies for payment.",
            json!({ "denial_code": serde_json::Value::Null }),
        )
        .with_confidence(0.9))
    }
}

fn decide(steps: &[StepRecord]) -> Recommendation {
    if let Some(denial) = find_code(steps, DENIAL_EXCEEDS_BUILD) {
        return Recommendation {
            verdict: Verdict::Deny,
            reason: denial.narrative.clone(),
            references: flagged_references(steps),
            actions: vec![
                Action::new("generate_denial_letter", "Generate denial letter"),
                Action::new("notify_provider", "Notify servicing provider"),
            ],
            confidence: 0.92,
        };
    }

    if let Some(missing) = find_code(steps, CODE_DOC_MISSING) {
        return Recommendation {
            verdict: Verdict::RequestInfo,
            reason: missing.narrative.clone(),
            references: flagged_references(steps),
            actions: vec![Action::new("request_documents", "Request missing documents")],
            confidence: 0.7,
        };
    }

    if let Some(flag) = find_code(steps, CODE_PROVIDER_INELIGIBLE)
        .or_else(|| find_code(steps, CODE_PROVIDER_UNVERIFIED))
    {
        return Recommendation {
            verdict: Verdict::Review,
            reason: flag.narrative.clone(),
            references: flagged_references(steps),
            actions: vec![Action::new("verify_provider", "Verify provider credentials")],
            confidence: 0.65,
        };
    }

    let reason = find_step(steps, "Limit Check")
        .map(|s| s.narrative.clone())
        .unwrap_or_else(|| "All checks passed.".to_string());
    Recommendation {
        verdict: Verdict::Approve,
        reason,
        references: Vec::new(),
        actions: vec![Action::new("process_payment", "Process payment")],
        confidence: mean_confidence(steps).map(|c| c.min(0.9)).unwrap_or(0.9),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denial_item() -> Item {
        Item::new("CLM-1001", "claim")
            .with_field("buildDays", 12)
            .with_field("authorizedDays", 10)
            .with_field("state", "Texas")
            .with_field("providerEligible", true)
    }

    fn clean_item() -> Item {
        Item::new("CLM-1002", "claim")
            .with_field("buildDays", 8)
            .with_field("authorizedDays", 10)
            .with_field("providerEligible", true)
    }

    #[test]
    fn test_exceeded_build_window_denies_with_n26() {
        let p = pipeline();
        let run = p.run(&denial_item(), &mut |_| {});

        let limit = find_step(&run.steps, "Limit Check").unwrap();
        assert_eq!(limit.status(), StepStatus::Warning);
        assert_eq!(limit.references[0].label, "Page 9");

        let rec = run.recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Deny);
        assert!(rec.reason.contains("N26"));
        let labels: Vec<&str> = rec.references.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Page 9"]);
        assert!(find_code(&run.steps, DENIAL_EXCEEDS_BUILD).is_some());
    }

    #[test]
    fn test_within_window_approves_without_denial_code() {
        let p = pipeline();
        let run = p.run(&clean_item(), &mut |_| {});

        let rec = run.recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Approve);
        assert!(run.steps.iter().all(|s| s.code() != Some(DENIAL_EXCEEDS_BUILD)));
    }

    #[test]
    fn test_step_indices_cover_all_stages() {
        let p = pipeline();
        let run = p.run(&denial_item(), &mut |_| {});
        let indices: Vec<usize> = run.steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, (0..p.stages.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_confidences_stay_in_unit_interval() {
        let p = pipeline();
        for item in [denial_item(), clean_item(), Item::new("CLM-X", "claim")] {
            let run = p.run(&item, &mut |_| {});
            for step in &run.steps {
                if let Some(c) = step.confidence {
                    assert!((0.0..=1.0).contains(&c), "confidence {c} out of range");
                }
            }
            if let Some(rec) = run.recommendation {
                assert!((0.0..=1.0).contains(&rec.confidence));
            }
        }
    }

    #[test]
    fn test_missing_fields_request_info() {
        let p = pipeline();
        let item = Item::new("CLM-1003", "claim").with_field("providerEligible", true);
        let run = p.run(&item, &mut |_| {});
        let rec = run.recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::RequestInfo);
    }

    #[test]
    fn test_decide_is_idempotent() {
        let p = pipeline();
        let run = p.run(&denial_item(), &mut |_| {});
        assert_eq!(p.finalize(&run.steps), p.finalize(&run.steps));
    }
}
