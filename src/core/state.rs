//! 控制台阶段（宿主投影用）

use serde::Serialize;

/// 运行生命周期阶段：Idle → LoadingItem → Reasoning → (AwaitingChat | Complete)；
/// 绑定条目变更时重置回 Idle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolePhase {
    Idle,
    LoadingItem,
    Reasoning,
    AwaitingChat,
    Complete,
}
