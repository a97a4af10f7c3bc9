//! Scripted 客户端（无凭证环境用，输出模板化文本）
//!
//! 取最后一条 User 消息与 system 上下文中的建议行，拼出确定性的回答，
//! 便于在没有模型凭证时跑通整个控制台与聊天链路。

use async_trait::async_trait;
use futures_util::stream;

use crate::agent::message::{ChatMessage, ChatRole};
use crate::agent::traits::{AgentClient, TokenStream};

/// 流式输出时每段字符数
const CHUNK_CHARS: usize = 6;

/// Scripted 客户端：模板化回答
#[derive(Debug, Default)]
pub struct ScriptedAgentClient;

impl ScriptedAgentClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentClient for ScriptedAgentClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        // system 上下文里由适配器渲染的建议行（"Recommendation: ..."）
        let recommendation_line = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .flat_map(|m| m.content.lines())
            .find(|l| l.starts_with("Recommendation:"));

        let answer = match recommendation_line {
            Some(line) => format!(
                "Regarding \"{last_user}\": the current assessment stands. {line} \
                 The cited references and the transparency log explain each step \
                 that led to it."
            ),
            None => format!(
                "Regarding \"{last_user}\": the analysis has not produced a \
                 recommendation yet. Run the reasoning steps first and I can \
                 walk you through the findings."
            ),
        };
        Ok(answer)
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, String> {
        let content = self.complete(messages).await?;
        let chars: Vec<char> = content.chars().collect();
        let chunks: Vec<Result<String, String>> = chars
            .chunks(CHUNK_CHARS)
            .map(|c| Ok(c.iter().collect::<String>()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_answer_quotes_recommendation_context() {
        let client = ScriptedAgentClient::new();
        let messages = vec![
            ChatMessage::system("Case context\nRecommendation: DENY - N26 applies."),
            ChatMessage::user("Why was this claim denied?"),
        ];
        let answer = client.complete(&messages).await.unwrap();
        assert!(answer.contains("DENY - N26 applies"));
        assert!(answer.contains("Why was this claim denied?"));
    }

    #[tokio::test]
    async fn test_stream_concatenates_to_complete() {
        let client = ScriptedAgentClient::new();
        let messages = vec![ChatMessage::user("status?")];
        let full = client.complete(&messages).await.unwrap();

        let mut stream = client.complete_stream(&messages).await.unwrap();
        let mut collected = String::new();
        while let Some(tok) = stream.next().await {
            collected.push_str(&tok.unwrap());
        }
        assert_eq!(collected, full);
    }
}
