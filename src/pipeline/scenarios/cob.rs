//! 理赔场景：多重保障的权责协调（COB）
//!
//! 三个显式标签变体（cob-primacy / coordination-of-benefits / dual-coverage）
//! 都别名到这一条流水线。

use serde_json::json;

use crate::pipeline::aggregate::{find_code, find_step};
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation, Verdict};
use crate::pipeline::runner::{Pipeline, StageDef, StageOutput};
use crate::pipeline::step::{StepRecord, StepStatus};

/// 主次责任无法判定
pub const CODE_PRIMACY_UNKNOWN: &str = "COB-UNK";

pub fn pipeline() -> Pipeline {
    Pipeline {
        id: "cob",
        stages: vec![
            StageDef {
                title: "Coverage Inventory",
                subsystem: "coverage",
                agent: "Analysis Agent",
                eval: coverage_inventory,
            },
            StageDef {
                title: "Primacy Determination",
                subsystem: "coordination",
                agent: "COB Agent",
                eval: primacy_determination,
            },
            StageDef {
                title: "Payable Balance",
                subsystem: "coordination",
                agent: "COB Agent",
                eval: payable_balance,
            },
        ],
        decide,
    }
}

fn coverage_inventory(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    match item.str_field("otherCoverage") {
        Some(other) => Ok(StageOutput::success(
            format!("Member plan plus secondary coverage on file with {other}."),
            json!({ "other_coverage": other }),
        )
        .with_confidence(0.9)),
        None => Ok(StageOutput::success(
            "Member plan is the only coverage on file.",
            json!({ "other_coverage": serde_json::Value::Null }),
        )
        .with_confidence(0.85)),
    }
}

fn primacy_determination(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    match item.str_field("primacyHint") {
        Some("member-primary") => Ok(StageOutput::success(
            "Member plan pays primary; the other payer coordinates as secondary.",
            json!({ "primary": "member-plan" }),
        )
        .with_confidence(0.8)),
        Some("other-primary") => Ok(StageOutput::success(
            "The other payer is primary; member plan coordinates as secondary.",
            json!({ "primary": "other-payer" }),
        )
        .with_confidence(0.8)),
        _ if item.has_field("otherCoverage") => Ok(StageOutput::warning(
            "Primacy cannot be determined from the claim record; an explanation \
             of benefits from the other payer is required.",
            json!({ "primary": serde_json::Value::Null }),
            Some(CODE_PRIMACY_UNKNOWN),
        )
        .with_confidence(0.55)),
        _ => Ok(StageOutput::success(
            "Member plan is sole coverage and pays primary.",
            json!({ "primary": "member-plan" }),
        )
        .with_confidence(0.9)),
    }
}

fn payable_balance(item: &Item, prior: &[StepRecord]) -> Result<StageOutput, String> {
    let primacy_open = find_step(prior, "Primacy Determination")
        .map(|s| s.status() == StepStatus::Warning)
        .unwrap_or(true);
    if primacy_open {
        return Ok(StageOutput::warning(
            "Balance cannot be computed until primacy is established.",
            json!({ "payable": serde_json::Value::Null }),
            None,
        ));
    }

    let amount = item.num_field("claimAmount").unwrap_or(0.0);
    let other_paid = item.num_field("otherPayerPaid").unwrap_or(0.0);
    let payable = (amount - other_paid).max(0.0);
    Ok(StageOutput::success(
        format!("Payable balance after coordination: {payable:.2} of {amount:.2} billed."),
        json!({ "claim_amount": amount, "other_payer_paid": other_paid, "payable": payable }),
    )
    .with_confidence(0.85))
}

fn decide(steps: &[StepRecord]) -> Recommendation {
    if let Some(unknown) = find_code(steps, CODE_PRIMACY_UNKNOWN) {
        return Recommendation {
            verdict: Verdict::RequestInfo,
            reason: unknown.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("request_eob", "Request EOB from other payer")],
            confidence: 0.7,
        };
    }

    let reason = find_step(steps, "Payable Balance")
        .map(|s| s.narrative.clone())
        .unwrap_or_else(|| "Coordination complete.".to_string());
    Recommendation {
        verdict: Verdict::Process,
        reason,
        references: Vec::new(),
        actions: vec![Action::new(
            "process_coordinated_payment",
            "Process coordinated payment",
        )],
        confidence: 0.85,
    }
}
