//! 步骤记录：流水线每个阶段产出的一条结构化结果
//!
//! StepOutcome 为带标签的变体类型（Success / Warning / Error），消费方用模式匹配
//! 读取结果，不再探测可选字段；StepStatus 由 outcome 推导，Pending 仅用于展示占位。

use serde::{Deserialize, Serialize};

/// 步骤 / 日志条目状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// 展示占位（阶段尚未产出结果）
    Pending,
    Success,
    Warning,
    Error,
}

/// 阶段结果变体：detail 为阶段自定义的结构化载荷
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    Success {
        detail: serde_json::Value,
    },
    /// 业务告警；code 为可选的业务代码（如拒付代码 N26）
    Warning {
        detail: serde_json::Value,
        code: Option<String>,
    },
    /// 内部故障（非业务结论），fault 描述故障原因
    Error {
        detail: serde_json::Value,
        fault: String,
    },
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Success { .. } => StepStatus::Success,
            StepOutcome::Warning { .. } => StepStatus::Warning,
            StepOutcome::Error { .. } => StepStatus::Error,
        }
    }

    /// 业务代码（仅 Warning 可能携带）
    pub fn code(&self) -> Option<&str> {
        match self {
            StepOutcome::Warning { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn detail(&self) -> &serde_json::Value {
        match self {
            StepOutcome::Success { detail }
            | StepOutcome::Warning { detail, .. }
            | StepOutcome::Error { detail, .. } => detail,
        }
    }
}

/// 领域文档或关联实体的引用，可按 id + 类型向引用仓库解析
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub ref_type: String,
    pub label: String,
}

impl Reference {
    pub fn new(
        id: impl Into<String>,
        ref_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ref_type: ref_type.into(),
            label: label.into(),
        }
    }
}

/// 单条步骤记录：index 自 0 起单调无缺口，由流水线运行器赋值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub title: String,
    pub narrative: String,
    /// 产出该步骤的 Agent 名（如 "Risk Assessor"）
    pub agent: String,
    /// 置信度 [0,1]；缺省表示该阶段不给出置信度，聚合时跳过而非按 0 计
    pub confidence: Option<f64>,
    pub references: Vec<Reference>,
    pub outcome: StepOutcome,
}

impl StepRecord {
    pub fn status(&self) -> StepStatus {
        self.outcome.status()
    }

    pub fn code(&self) -> Option<&str> {
        self.outcome.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_derived_from_outcome() {
        let warn = StepOutcome::Warning {
            detail: json!({"excess_days": 2}),
            code: Some("N26".to_string()),
        };
        assert_eq!(warn.status(), StepStatus::Warning);
        assert_eq!(warn.code(), Some("N26"));

        let ok = StepOutcome::Success { detail: json!({}) };
        assert_eq!(ok.status(), StepStatus::Success);
        assert_eq!(ok.code(), None);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let out = StepOutcome::Error {
            detail: json!({}),
            fault: "boom".to_string(),
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["fault"], "boom");
    }
}
