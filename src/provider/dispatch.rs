//! 外勤派工垂直领域的完整适配器
//!
//! 复用加权匹配算法（routing 模块）：约束随条目快照注入，
//! 资源匹配阶段在流水线内读取。

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
use crate::routing::RouteConstraints;

const CHAT_SYSTEM_PROMPT: &str = "You are a field dispatch assistant. Answer follow-up \
questions about the work order below using only the listed steps, the routing \
plan and the recommendation.";

/// 派工适配器
pub struct DispatchProvider {
    items: Arc<dyn ItemRepository>,
    references: Arc<dyn ReferenceRepository>,
    actions: Arc<dyn ActionExecutor>,
    agent: Arc<dyn AgentClient>,
    router: ScenarioRouter,
    constraints: RouteConstraints,
}

impl DispatchProvider {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        references: Arc<dyn ReferenceRepository>,
        actions: Arc<dyn ActionExecutor>,
        agent: Arc<dyn AgentClient>,
        constraints: RouteConstraints,
    ) -> Self {
        Self {
            items,
            references,
            actions,
            agent,
            router: ScenarioRouter::with_defaults(),
            constraints,
        }
    }
}

#[async_trait]
impl ReasoningProvider for DispatchProvider {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn get_item(&self, item_id: &str) -> Result<Item, EngineError> {
        self.items.get_by_id(item_id).await
    }

    async fn execute_reasoning(
        &self,
        item: &Item,
        on_event: OnEvent<'_>,
    ) -> Result<RunResult, EngineError> {
        // 匹配约束随条目快照下发，条目已带覆盖时尊重原值
        let mut item = item.clone();
        if !item.has_field("routingConstraints") {
            if let Ok(v) = serde_json::to_value(&self.constraints) {
                item.fields.insert("routingConstraints".to_string(), v);
            }
        }
        crate::provider::run_with_events(&self.router, &item, on_event)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgentClient;
    use crate::pipeline::recommendation::Verdict;
    use crate::provider::external::{
        InMemoryItemRepository, RecordingActionExecutor, StaticReferenceRepository,
    };
    use crate::provider::ReasonEvent;
    use serde_json::json;
    use std::sync::Mutex;

    fn provider() -> DispatchProvider {
        let mut items = InMemoryItemRepository::new();
        items.insert(
            Item::new("WO-42", "work_order")
                .with_field("priority", "high")
                .with_field("requiredSkills", json!(["hvac"]))
                .with_field("location", json!({ "lat": 30.27, "lng": -97.74 }))
                .with_field("durationMins", 45)
                .with_field(
                    "availableResources",
                    json!([
                        { "id": "R-1", "name": "Crew 1", "skills": ["hvac"],
                          "location": { "lat": 30.3, "lng": -97.7 },
                          "available": true, "active_jobs": 0 }
                    ]),
                ),
        );
        DispatchProvider::new(
            Arc::new(items),
            Arc::new(StaticReferenceRepository::new()),
            Arc::new(RecordingActionExecutor::new()),
            Arc::new(ScriptedAgentClient::new()),
            RouteConstraints {
                avg_speed_kmh: 60.0,
                ..RouteConstraints::default()
            },
        )
    }

    #[tokio::test]
    async fn test_work_order_runs_through_routing() {
        let p = provider();
        let item = p.get_item("WO-42").await.unwrap();

        let events = Mutex::new(Vec::new());
        let on_event = |ev: ReasonEvent| {
            if let Ok(mut v) = events.lock() {
                v.push(ev);
            }
        };
        let run = p.execute_reasoning(&item, &on_event).await.unwrap();

        assert!(run.fault.is_none());
        let rec = run.recommendation.unwrap();
        assert_eq!(rec.verdict, Verdict::Process);

        let matching = run
            .steps
            .iter()
            .find(|s| s.title == "Resource Matching")
            .unwrap();
        let assignments = matching.outcome.detail()["plan"]["assignments"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(assignments, 1);
        // 步骤事件在先，建议事件收尾
        let seen = events.lock().unwrap();
        assert!(matches!(seen.last(), Some(ReasonEvent::Final { .. })));
    }
}
