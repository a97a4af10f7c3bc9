//! 核心错误类型
//!
//! 动作执行失败不在此列：失败的动作是预期业务结果，以 ActionResult 返回而非抛错。

use thiserror::Error;

/// 推理核心可能出现的错误（路由、阶段故障、适配器缺口、聊天、外部查找）
#[derive(Error, Debug)]
pub enum EngineError {
    /// 条目无法解析到任何流水线；必须显式上抛，不允许静默兜底
    #[error("No pipeline resolved for item {0}")]
    UnresolvedScenario(String),

    /// 阶段内部故障；当前运行中止，已产出的步骤保留供审计
    #[error("Stage '{stage}' fault: {message}")]
    StageFault { stage: String, message: String },

    /// 适配器方法未实现；集成缺口显式暴露，而非表现为「没有建议」
    #[error("Adapter method not implemented: {0}")]
    AdapterNotImplemented(&'static str),

    /// 聊天回合失败；按轮次兜底为助手消息，不向宿主传播
    #[error("Chat failure: {0}")]
    ChatFailure(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}
