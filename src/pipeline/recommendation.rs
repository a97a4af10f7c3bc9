//! 最终建议：结论、理由、引用与可执行动作

use serde::{Deserialize, Serialize};

use crate::pipeline::step::Reference;

/// 结论基线集合；标注 non_exhaustive，新增垂直领域可扩展变体而不破坏下游匹配
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Verdict {
    Approve,
    Deny,
    RequestInfo,
    Review,
    Process,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Approve => "APPROVE",
            Verdict::Deny => "DENY",
            Verdict::RequestInfo => "REQUEST_INFO",
            Verdict::Review => "REVIEW",
            Verdict::Process => "PROCESS",
        };
        f.write_str(s)
    }
}

/// 建议附带的下一步动作，由外部动作执行器按 action_type 执行
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    pub label: String,
}

impl Action {
    pub fn new(action_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            label: label.into(),
        }
    }
}

/// 流水线最终建议；仅在全部阶段产出后由聚合器生成
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub reason: String,
    pub references: Vec<Reference>,
    pub actions: Vec<Action>,
    pub confidence: f64,
}
