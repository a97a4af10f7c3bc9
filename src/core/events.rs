//! 控制台事件：推送给宿主展示层的统一流
//!
//! 步骤按产出顺序送达；Recommendation（若有）在逻辑序上恒为最后；
//! StepText 仅由渐进展示装饰器产生，不改变最终步骤列表。

use serde::Serialize;

use crate::core::state::ConsolePhase;
use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::step::{Reference, StepRecord};

/// 单条控制台事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleEvent {
    /// 阶段切换
    Phase { phase: ConsolePhase },
    /// 完整步骤记录
    Step { record: StepRecord },
    /// 渐进展示的叙述片段（纯展示，消费方可忽略）
    StepText { index: usize, text: String },
    /// 最终建议
    Recommendation { recommendation: Recommendation },
    /// 运行错误（场景未解析 / 阶段故障）
    RunError { text: String },
    /// 聊天回答的一小段（流式输出）
    ChatToken { text: String },
    /// 完整聊天消息（user / assistant）；助手消息附带本轮引用
    ChatMessage {
        role: String,
        text: String,
        references: Vec<Reference>,
    },
    /// 本轮聊天结束
    ChatDone,
}
