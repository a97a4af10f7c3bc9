//! 信贷场景：贷款申请初审（loan-underwrite）

use serde_json::json;

use crate::pipeline::aggregate::{find_code, find_step};
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation, Verdict};
use crate::pipeline::runner::{Pipeline, StageDef, StageOutput};
use crate::pipeline::step::StepRecord;

pub const CODE_DOC_MISSING: &str = "DOC-MISSING";
pub const CODE_CREDIT_REVIEW: &str = "CR-REVIEW";
pub const CODE_CREDIT_DECLINE: &str = "CR-DECLINE";
pub const CODE_DTI_HIGH: &str = "DTI-HIGH";

/// 审慎线与拒绝线（FICO）
const CREDIT_PRIME: f64 = 680.0;
const CREDIT_FLOOR: f64 = 620.0;
/// 负债收入比上限
const DTI_LIMIT: f64 = 0.43;

pub fn pipeline() -> Pipeline {
    Pipeline {
        id: "loan-underwrite",
        stages: vec![
            StageDef {
                title: "Application Completeness",
                subsystem: "intake",
                agent: "Analysis Agent",
                eval: application_completeness,
            },
            StageDef {
                title: "Credit Assessment",
                subsystem: "credit",
                agent: "Risk Assessor",
                eval: credit_assessment,
            },
            StageDef {
                title: "Debt-to-Income",
                subsystem: "credit",
                agent: "Risk Assessor",
                eval: debt_to_income,
            },
            StageDef {
                title: "Conditions Review",
                subsystem: "underwriting",
                agent: "Underwriting Agent",
                eval: conditions_review,
            },
        ],
        decide,
    }
}

fn application_completeness(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let missing: Vec<&str> = ["loanAmount", "creditScore", "monthlyIncome"]
        .into_iter()
        .filter(|f| !item.has_field(f))
        .collect();

    if missing.is_empty() {
        Ok(StageOutput::success(
            format!(
                "Application for {:.2} is complete.",
                item.num_field("loanAmount").unwrap_or(0.0)
            ),
            json!({ "loan_amount": item.num_field("loanAmount") }),
        )
        .with_confidence(0.95))
    } else {
        Ok(StageOutput::warning(
            format!("Application is missing: {}.", missing.join(", ")),
            json!({ "missing": missing }),
            Some(CODE_DOC_MISSING),
        )
        .with_confidence(0.9))
    }
}

fn credit_assessment(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let score = match item.num_field("creditScore") {
        Some(s) => s,
        None => {
            return Ok(StageOutput::warning(
                "Credit assessment skipped: no credit score on file.",
                json!({ "skipped": true }),
                None,
            ));
        }
    };

    if score >= CREDIT_PRIME {
        Ok(StageOutput::success(
            format!("Credit score {score:.0} meets the prime threshold."),
            json!({ "credit_score": score, "tier": "prime" }),
        )
        .with_confidence(0.9))
    } else if score >= CREDIT_FLOOR {
        Ok(StageOutput::warning(
            format!("Credit score {score:.0} falls in the manual review band."),
            json!({ "credit_score": score, "tier": "near-prime" }),
            Some(CODE_CREDIT_REVIEW),
        )
        .with_confidence(0.85))
    } else {
        Ok(StageOutput::warning(
            format!("Credit score {score:.0} is below the lending floor."),
            json!({ "credit_score": score, "tier": "subprime" }),
            Some(CODE_CREDIT_DECLINE),
        )
        .with_confidence(0.9))
    }
}

fn debt_to_income(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let (debt, income) = match (item.num_field("monthlyDebt"), item.num_field("monthlyIncome")) {
        (Some(d), Some(i)) if i > 0.0 => (d, i),
        _ => {
            return Ok(StageOutput::warning(
                "Debt-to-income skipped: income or debt figures unavailable.",
                json!({ "skipped": true }),
                None,
            ));
        }
    };

    let ratio = debt / income;
    if ratio > DTI_LIMIT {
        Ok(StageOutput::warning(
            format!("Debt-to-income ratio {ratio:.2} exceeds the {DTI_LIMIT:.2} limit."),
            json!({ "dti": ratio }),
            Some(CODE_DTI_HIGH),
        )
        .with_confidence(0.85))
    } else {
        Ok(StageOutput::success(
            format!("Debt-to-income ratio {ratio:.2} is within limits."),
            json!({ "dti": ratio }),
        )
        .with_confidence(0.88))
    }
}

/// 汇总此前各阶段抛出的条件代码
fn conditions_review(_item: &Item, prior: &[StepRecord]) -> Result<StageOutput, String> {
    let codes: Vec<String> = prior
        .iter()
        .filter_map(|s| s.code().map(String::from))
        .collect();
    let narrative = if codes.is_empty() {
        "No outstanding underwriting conditions.".to_string()
    } else {
        format!("Outstanding conditions: {}.", codes.join(", "))
    };
    Ok(StageOutput::success(narrative, json!({ "codes": codes })).with_confidence(0.8))
}

fn decide(steps: &[StepRecord]) -> Recommendation {
    if let Some(decline) = find_code(steps, CODE_CREDIT_DECLINE) {
        return Recommendation {
            verdict: Verdict::Deny,
            reason: decline.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("send_adverse_action", "Send adverse action notice")],
            confidence: 0.9,
        };
    }
    if let Some(missing) = find_code(steps, CODE_DOC_MISSING) {
        return Recommendation {
            verdict: Verdict::RequestInfo,
            reason: missing.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("request_documents", "Request missing documents")],
            confidence: 0.7,
        };
    }
    if let Some(flag) =
        find_code(steps, CODE_CREDIT_REVIEW).or_else(|| find_code(steps, CODE_DTI_HIGH))
    {
        return Recommendation {
            verdict: Verdict::Review,
            reason: flag.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("assign_underwriter", "Assign to underwriter")],
            confidence: 0.75,
        };
    }

    let reason = find_step(steps, "Credit Assessment")
        .map(|s| s.narrative.clone())
        .unwrap_or_else(|| "Application meets lending criteria.".to_string());
    Recommendation {
        verdict: Verdict::Approve,
        reason,
        references: Vec::new(),
        actions: vec![Action::new("prepare_closing_docs", "Prepare closing documents")],
        confidence: 0.88,
    }
}
