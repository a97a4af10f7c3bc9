//! 理赔垂直领域的完整适配器
//!
//! 组合：条目仓库 + 场景路由（build-limit-review / cob / appeal-review）+
//! 引用仓库 + 动作执行器 + 文本客户端（聊天子通道）。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::AgentClient;
use crate::core::error::EngineError;
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation};
use crate::pipeline::router::ScenarioRouter;
use crate::pipeline::run::RunResult;
use crate::pipeline::step::Reference;
use crate::provider::external::{ActionExecutor, ActionResult, ItemRepository, ReferenceRepository};
use crate::provider::traits::{ChatContext, ChatResponse, OnEvent, OnToken, ReasoningProvider};

const CHAT_SYSTEM_PROMPT: &str = "You are a claims analysis assistant. Answer follow-up \
questions about the case below using only the listed steps, references and \
recommendation. Be concise and cite the deciding step where relevant.";

/// 理赔适配器
pub struct ClaimsProvider {
    items: Arc<dyn ItemRepository>,
    references: Arc<dyn ReferenceRepository>,
    actions: Arc<dyn ActionExecutor>,
    agent: Arc<dyn AgentClient>,
    router: ScenarioRouter,
}

impl ClaimsProvider {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        references: Arc<dyn ReferenceRepository>,
        actions: Arc<dyn ActionExecutor>,
        agent: Arc<dyn AgentClient>,
    ) -> Self {
        Self {
            items,
            references,
            actions,
            agent,
            router: ScenarioRouter::with_defaults(),
        }
    }
}

#[async_trait]
impl ReasoningProvider for ClaimsProvider {
    fn name(&self) -> &'static str {
        "claims"
    }

    async fn get_item(&self, item_id: &str) -> Result<Item, EngineError> {
        self.items.get_by_id(item_id).await
    }

    async fn execute_reasoning(
        &self,
        item: &Item,
        on_event: OnEvent<'_>,
    ) -> Result<RunResult, EngineError> {
        crate::provider::run_with_events(&self.router, item, on_event)
    }

    async fn send_chat_message(
        &self,
        text: &str,
        context: &ChatContext,
        on_token: OnToken<'_>,
    ) -> Result<ChatResponse, EngineError> {
        crate::provider::chat_via_agent(&self.agent, CHAT_SYSTEM_PROMPT, text, context, on_token)
            .await
    }

    async fn references(&self, item: &Item) -> Result<Vec<Reference>, EngineError> {
        self.references.search_applicable(item).await
    }

    async fn reference_by_id(
        &self,
        id: &str,
        ref_type: &str,
    ) -> Result<Option<Reference>, EngineError> {
        self.references.lookup_by_id(id, ref_type).await
    }

    async fn available_actions(
        &self,
        _item: &Item,
        recommendation: &Recommendation,
    ) -> Result<Vec<Action>, EngineError> {
        Ok(recommendation.actions.clone())
    }

    async fn execute_action(
        &self,
        action_type: &str,
        item: &Item,
        recommendation: &Recommendation,
    ) -> Result<ActionResult, EngineError> {
        self.actions.execute(action_type, item, recommendation).await
    }
}
