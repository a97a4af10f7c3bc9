//! 提供方层：领域无关的推理契约与各垂直领域的完整适配器

pub mod claims;
pub mod dispatch;
pub mod events;
pub mod external;
pub mod traits;

use std::sync::Arc;

use futures_util::StreamExt;

pub use claims::ClaimsProvider;
pub use dispatch::DispatchProvider;
pub use events::ReasonEvent;
pub use external::{
    ActionExecutor, ActionResult, InMemoryItemRepository, ItemRepository,
    RecordingActionExecutor, ReferenceRepository, StaticReferenceRepository,
};
pub use traits::{ChatContext, ChatResponse, OnEvent, OnToken, ReasoningProvider};

use crate::agent::{AgentClient, ChatMessage};
use crate::core::error::EngineError;
use crate::pipeline::aggregate;
use crate::pipeline::item::Item;
use crate::pipeline::router::ScenarioRouter;
use crate::pipeline::run::RunResult;

/// 适配器共用：路由 → 流水线运行 → 事件回调（步骤在先，建议在后）
pub(crate) fn run_with_events(
    router: &ScenarioRouter,
    item: &Item,
    on_event: OnEvent<'_>,
) -> Result<RunResult, EngineError> {
    let pipeline = router.resolve(item)?;
    let run = pipeline.run(item, &mut |record| {
        on_event(ReasonEvent::Step {
            record: record.clone(),
        });
    });
    if let Some(recommendation) = &run.recommendation {
        on_event(ReasonEvent::Final {
            recommendation: recommendation.clone(),
        });
    }
    Ok(run)
}

/// 适配器共用：拼 system(提示词 + 上下文) 调文本客户端，逐 Token 回调
pub(crate) async fn chat_via_agent(
    agent: &Arc<dyn AgentClient>,
    system_prompt: &str,
    text: &str,
    context: &ChatContext,
    on_token: OnToken<'_>,
) -> Result<ChatResponse, EngineError> {
    let messages = vec![
        ChatMessage::system(format!("{system_prompt}\n\n{}", context.render())),
        ChatMessage::user(text),
    ];

    let mut stream = agent
        .complete_stream(&messages)
        .await
        .map_err(EngineError::ChatFailure)?;

    let mut answer = String::new();
    while let Some(token) = stream.next().await {
        let token = token.map_err(EngineError::ChatFailure)?;
        on_token(&token);
        answer.push_str(&token);
    }

    Ok(ChatResponse {
        text: answer,
        references: aggregate::all_references(&context.steps),
    })
}
