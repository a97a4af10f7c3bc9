//! 推理过程事件：适配器在每个阶段完成后回调一次
//!
//! Step 为中间步骤，Final 为最终建议；建议在事件序里恒为最后一个。

use serde::Serialize;

use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::step::StepRecord;

/// 归一化的推理事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasonEvent {
    /// 中间步骤
    Step { record: StepRecord },
    /// 最终建议
    Final { recommendation: Recommendation },
}
