//! 文本生成客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Scripted）实现 AgentClient：complete（非流式）、
//! complete_stream（流式 Token）。推理流水线本身是确定性规则，客户端只承接
//! 聊天子通道的回答生成。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::agent::message::ChatMessage;

/// Token 流
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, String>> + Send>>;

/// 文本生成客户端 trait：非流式完成与流式完成
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, String>;

    /// 流式完成，返回 Token 流
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, String>;
}
