//! 申诉场景：对既有拒付决定的复核（appeal-review)

use serde_json::json;

use crate::pipeline::aggregate::{find_code, find_step};
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation, Verdict};
use crate::pipeline::runner::{Pipeline, StageDef, StageOutput};
use crate::pipeline::step::{Reference, StepRecord, StepStatus};

pub const CODE_APPEAL_LATE: &str = "AP-LATE";
pub const CODE_NO_MERIT: &str = "AP-NOMERIT";

/// 申诉时效（天）
const FILING_WINDOW_DAYS: f64 = 180.0;

pub fn pipeline() -> Pipeline {
    Pipeline {
        id: "appeal-review",
        stages: vec![
            StageDef {
                title: "Appeal Intake",
                subsystem: "intake",
                agent: "Analysis Agent",
                eval: appeal_intake,
            },
            StageDef {
                title: "Original Determination Review",
                subsystem: "review",
                agent: "Reference Matcher",
                eval: original_determination,
            },
            StageDef {
                title: "Merit Assessment",
                subsystem: "review",
                agent: "Risk Assessor",
                eval: merit_assessment,
            },
        ],
        decide,
    }
}

fn appeal_intake(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    let reason = item.str_field("appealReason").unwrap_or("unspecified");
    match item.num_field("filedWithinDays") {
        Some(days) if days > FILING_WINDOW_DAYS => Ok(StageOutput::warning(
            format!(
                "Appeal filed {days:.0} days after determination, outside the \
                 {FILING_WINDOW_DAYS:.0} day window."
            ),
            json!({ "filed_within_days": days, "reason": reason }),
            Some(CODE_APPEAL_LATE),
        )
        .with_confidence(0.9)),
        Some(days) => Ok(StageOutput::success(
            format!("Appeal filed within the window ({days:.0} days); reason: {reason}."),
            json!({ "filed_within_days": days, "reason": reason }),
        )
        .with_confidence(0.9)),
        None => Ok(StageOutput::warning(
            "Filing date is not on record; timeliness unverified.",
            json!({ "filed_within_days": serde_json::Value::Null }),
            None,
        )
        .with_confidence(0.6)),
    }
}

fn original_determination(item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
    match item.str_field("originalDenialCode") {
        Some(code) => {
            let mut out = StageOutput::success(
                format!("Original claim was denied under code {code}."),
                json!({ "original_denial_code": code }),
            )
            .with_confidence(0.85);
            if let Some(claim_id) = item.str_field("originalClaimId") {
                out = out.with_reference(Reference::new(claim_id, "claim", format!("Claim {claim_id}")));
            }
            Ok(out)
        }
        None => Ok(StageOutput::warning(
            "Original determination record is incomplete.",
            json!({ "original_denial_code": serde_json::Value::Null }),
            None,
        )
        .with_confidence(0.6)),
    }
}

fn merit_assessment(item: &Item, prior: &[StepRecord]) -> Result<StageOutput, String> {
    // 时效已失的申诉不再评估实体问题
    let late = prior.iter().any(|s| s.code() == Some(CODE_APPEAL_LATE));
    if late {
        return Ok(StageOutput::success(
            "Merit not reached: the appeal is untimely.",
            json!({ "reached": false }),
        ));
    }

    if item.bool_field("newEvidence").unwrap_or(false) {
        Ok(StageOutput::success(
            "New clinical evidence supports overturning the original determination.",
            json!({ "new_evidence": true }),
        )
        .with_confidence(0.8))
    } else {
        Ok(StageOutput::warning(
            "No new evidence was submitted with the appeal.",
            json!({ "new_evidence": false }),
            Some(CODE_NO_MERIT),
        )
        .with_confidence(0.75))
    }
}

fn decide(steps: &[StepRecord]) -> Recommendation {
    if let Some(late) = find_code(steps, CODE_APPEAL_LATE) {
        return Recommendation {
            verdict: Verdict::Deny,
            reason: late.narrative.clone(),
            references: Vec::new(),
            actions: vec![Action::new("send_dismissal_notice", "Send dismissal notice")],
            confidence: 0.9,
        };
    }

    let merit = find_step(steps, "Merit Assessment");
    if merit.map(|s| s.status() == StepStatus::Success).unwrap_or(false) {
        return Recommendation {
            verdict: Verdict::Approve,
            reason: merit
                .map(|s| s.narrative.clone())
                .unwrap_or_else(|| "Appeal has merit.".to_string()),
            references: steps
                .iter()
                .flat_map(|s| s.references.iter().cloned())
                .collect(),
            actions: vec![Action::new("reprocess_claim", "Reprocess the original claim")],
            confidence: 0.8,
        };
    }

    Recommendation {
        verdict: Verdict::Review,
        reason: find_code(steps, CODE_NO_MERIT)
            .map(|s| s.narrative.clone())
            .unwrap_or_else(|| "Appeal requires committee review.".to_string()),
        references: Vec::new(),
        actions: vec![Action::new("schedule_committee_review", "Schedule committee review")],
        confidence: 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_appeal_denied() {
        let item = Item::new("AP-1", "case")
            .with_field("appealReason", "medical necessity")
            .with_field("filedWithinDays", 200)
            .with_field("newEvidence", true);
        let rec = pipeline().run(&item, &mut |_| {}).recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Deny);
    }

    #[test]
    fn test_new_evidence_overturns() {
        let item = Item::new("AP-2", "case")
            .with_field("appealReason", "medical necessity")
            .with_field("filedWithinDays", 30)
            .with_field("originalDenialCode", "N26")
            .with_field("originalClaimId", "CLM-1001")
            .with_field("newEvidence", true);
        let rec = pipeline().run(&item, &mut |_| {}).recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Approve);
        assert!(rec.references.iter().any(|r| r.id == "CLM-1001"));
    }

    #[test]
    fn test_no_new_evidence_goes_to_review() {
        let item = Item::new("AP-3", "case")
            .with_field("appealReason", "billing dispute")
            .with_field("filedWithinDays", 30);
        let rec = pipeline().run(&item, &mut |_| {}).recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Review);
    }
}
