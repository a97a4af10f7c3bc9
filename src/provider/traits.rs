//! 推理提供方契约：让不同垂直领域复用同一个控制台的领域无关接缝
//!
//! 每个方法都有返回 AdapterNotImplemented 的默认实现：集成缺口显式失败，
//! 而不是表现为「查不到建议」。运行时只允许完整实现的适配器。

use async_trait::async_trait;

use crate::core::error::EngineError;
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::{Action, Recommendation};
use crate::pipeline::run::RunResult;
use crate::pipeline::step::{Reference, StepRecord};
use crate::provider::events::ReasonEvent;
use crate::provider::external::ActionResult;

/// 推理事件回调
pub type OnEvent<'a> = &'a (dyn Fn(ReasonEvent) + Send + Sync);
/// 聊天 Token 回调
pub type OnToken<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// 聊天上下文：最近绑定的条目、已累计的步骤与最新建议
#[derive(Clone, Debug, Default)]
pub struct ChatContext {
    pub item: Option<Item>,
    pub steps: Vec<StepRecord>,
    pub recommendation: Option<Recommendation>,
}

impl ChatContext {
    /// 渲染为提示词文本；建议行固定以 "Recommendation:" 开头，
    /// 供下游生成与测试捕获
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(item) = &self.item {
            out.push_str(&format!(
                "Item {} ({}), status {}\nFields: {}\n",
                item.id,
                item.kind,
                item.status,
                serde_json::Value::Object(item.fields.clone()),
            ));
        }
        for step in &self.steps {
            out.push_str(&format!(
                "Step {} [{:?}] {}: {}\n",
                step.index,
                step.status(),
                step.title,
                step.narrative,
            ));
        }
        if let Some(rec) = &self.recommendation {
            out.push_str(&format!("Recommendation: {} - {}\n", rec.verdict, rec.reason));
        }
        out
    }
}

/// 聊天回合结果
#[derive(Clone, Debug)]
pub struct ChatResponse {
    pub text: String,
    pub references: Vec<Reference>,
}

/// 推理提供方（适配器）契约
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// 适配器名（垂直领域标识）
    fn name(&self) -> &'static str;

    /// 条目查找，委托外部仓库
    async fn get_item(&self, _item_id: &str) -> Result<Item, EngineError> {
        Err(EngineError::AdapterNotImplemented("get_item"))
    }

    /// 串行执行推理阶段；每阶段完成后回调一次 on_event。
    /// 阶段故障记录在返回的 RunResult（fault 字段与 error 日志条目）。
    async fn execute_reasoning(
        &self,
        _item: &Item,
        _on_event: OnEvent<'_>,
    ) -> Result<RunResult, EngineError> {
        Err(EngineError::AdapterNotImplemented("execute_reasoning"))
    }

    /// 用累计上下文回答追问，流式输出 Token
    async fn send_chat_message(
        &self,
        _text: &str,
        _context: &ChatContext,
        _on_token: OnToken<'_>,
    ) -> Result<ChatResponse, EngineError> {
        Err(EngineError::AdapterNotImplemented("send_chat_message"))
    }

    async fn references(&self, _item: &Item) -> Result<Vec<Reference>, EngineError> {
        Err(EngineError::AdapterNotImplemented("references"))
    }

    async fn reference_by_id(
        &self,
        _id: &str,
        _ref_type: &str,
    ) -> Result<Option<Reference>, EngineError> {
        Err(EngineError::AdapterNotImplemented("reference_by_id"))
    }

    async fn available_actions(
        &self,
        _item: &Item,
        _recommendation: &Recommendation,
    ) -> Result<Vec<Action>, EngineError> {
        Err(EngineError::AdapterNotImplemented("available_actions"))
    }

    /// 执行动作；失败的动作以 ActionResult 返回，不是错误
    async fn execute_action(
        &self,
        _action_type: &str,
        _item: &Item,
        _recommendation: &Recommendation,
    ) -> Result<ActionResult, EngineError> {
        Err(EngineError::AdapterNotImplemented("execute_action"))
    }
}
