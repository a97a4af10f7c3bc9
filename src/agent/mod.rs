//! 文本生成层：客户端抽象与实现（OpenAI 兼容 / Scripted）

pub mod message;
pub mod openai;
pub mod scripted;
pub mod traits;

use std::sync::Arc;

pub use message::{ChatMessage, ChatRole};
pub use openai::OpenAiClient;
pub use scripted::ScriptedAgentClient;
pub use traits::{AgentClient, TokenStream};

use crate::config::AgentSection;

/// 按配置与凭证选择客户端：provider 为 openai 且环境变量里有 API Key 时
/// 用真实端点，否则回落到 Scripted（核心在两种实现下行为一致）
pub fn from_config(cfg: &AgentSection) -> Arc<dyn AgentClient> {
    match cfg.provider.as_str() {
        "openai" => match std::env::var(&cfg.api_key_env) {
            Ok(key) => Arc::new(OpenAiClient::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                Some(&key),
            )),
            Err(_) => {
                tracing::warn!(
                    "{} not set, falling back to the scripted agent client",
                    cfg.api_key_env
                );
                Arc::new(ScriptedAgentClient::new())
            }
        },
        _ => Arc::new(ScriptedAgentClient::new()),
    }
}
