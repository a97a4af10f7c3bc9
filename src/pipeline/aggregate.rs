//! 建议聚合辅助：各场景决策函数共用的纯函数
//!
//! 决策规则本身属于具体场景（见 scenarios/*），这里只提供组合手段：
//! 取定夺阶段的叙述、收集告警引用、对「存在的」置信度求均值。

use crate::pipeline::step::{Reference, StepRecord, StepStatus};

/// 现有置信度的均值；缺省的置信度跳过，不按 0 计。全部缺省时为 None。
pub fn mean_confidence(steps: &[StepRecord]) -> Option<f64> {
    let present: Vec<f64> = steps.iter().filter_map(|s| s.confidence).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// 第一条携带指定业务代码的步骤
pub fn find_code<'a>(steps: &'a [StepRecord], code: &str) -> Option<&'a StepRecord> {
    steps.iter().find(|s| s.code() == Some(code))
}

/// 按标题查找步骤
pub fn find_step<'a>(steps: &'a [StepRecord], title: &str) -> Option<&'a StepRecord> {
    steps.iter().find(|s| s.title == title)
}

/// 收集告警 / 错误步骤抛出的引用，按 id 去重、保持出现顺序
pub fn flagged_references(steps: &[StepRecord]) -> Vec<Reference> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for step in steps {
        if matches!(step.status(), StepStatus::Warning | StepStatus::Error) {
            for r in &step.references {
                if seen.insert(r.id.clone()) {
                    out.push(r.clone());
                }
            }
        }
    }
    out
}

/// 收集全部步骤的引用，按 id 去重
pub fn all_references(steps: &[StepRecord]) -> Vec<Reference> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for step in steps {
        for r in &step.references {
            if seen.insert(r.id.clone()) {
                out.push(r.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::StepOutcome;
    use serde_json::json;

    fn step(index: usize, confidence: Option<f64>, outcome: StepOutcome) -> StepRecord {
        StepRecord {
            index,
            title: format!("Step {index}"),
            narrative: String::new(),
            agent: "Test Agent".to_string(),
            confidence,
            references: Vec::new(),
            outcome,
        }
    }

    #[test]
    fn test_mean_confidence_skips_absent() {
        let steps = vec![
            step(0, Some(0.8), StepOutcome::Success { detail: json!({}) }),
            step(1, None, StepOutcome::Success { detail: json!({}) }),
            step(2, Some(0.6), StepOutcome::Success { detail: json!({}) }),
        ];
        // (0.8 + 0.6) / 2，缺省的不算 0
        let mean = mean_confidence(&steps).unwrap();
        assert!((mean - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_mean_confidence_none_when_all_absent() {
        let steps = vec![step(0, None, StepOutcome::Success { detail: json!({}) })];
        assert!(mean_confidence(&steps).is_none());
    }

    #[test]
    fn test_find_code() {
        let steps = vec![
            step(0, None, StepOutcome::Success { detail: json!({}) }),
            step(
                1,
                None,
                StepOutcome::Warning {
                    detail: json!({}),
                    code: Some("N26".to_string()),
                },
            ),
        ];
        assert_eq!(find_code(&steps, "N26").unwrap().index, 1);
        assert!(find_code(&steps, "N27").is_none());
    }

    #[test]
    fn test_flagged_references_dedup() {
        let mut warn = step(
            0,
            None,
            StepOutcome::Warning {
                detail: json!({}),
                code: None,
            },
        );
        warn.references = vec![
            Reference::new("plan-doc-p9", "policy_document", "Page 9"),
            Reference::new("plan-doc-p9", "policy_document", "Page 9"),
        ];
        let ok = step(1, None, StepOutcome::Success { detail: json!({}) });
        let refs = flagged_references(&[warn, ok]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].label, "Page 9");
    }
}
