//! 外部协作方接口：条目仓库、引用仓库、动作执行器
//!
//! 核心对传输与存储格式保持无关；这里只定义契约，并附带内存实现
//! 供演示与测试使用（持久化是协作方的职责）。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::error::EngineError;
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::step::Reference;

/// 动作执行结果：失败是预期业务结果，以类型化结果返回而非抛错
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub detail: serde_json::Value,
}

/// 条目仓库
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// 按 id 查找条目；不存在时返回 NotFound
    async fn get_by_id(&self, id: &str) -> Result<Item, EngineError>;
}

/// 引用仓库（按领域各自实现）
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn lookup_by_id(
        &self,
        id: &str,
        ref_type: &str,
    ) -> Result<Option<Reference>, EngineError>;

    /// 检索适用于该条目的引用
    async fn search_applicable(&self, item: &Item) -> Result<Vec<Reference>, EngineError>;
}

/// 动作执行器：副作用在核心掌控之外，结果以 ActionResult 带回
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        action_type: &str,
        item: &Item,
        recommendation: &Recommendation,
    ) -> Result<ActionResult, EngineError>;
}

/// 内存条目仓库
#[derive(Default)]
pub struct InMemoryItemRepository {
    items: HashMap<String, Item>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get_by_id(&self, id: &str) -> Result<Item, EngineError> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }
}

/// 静态引用仓库：按条目种类索引
#[derive(Default)]
pub struct StaticReferenceRepository {
    by_kind: HashMap<String, Vec<Reference>>,
}

impl StaticReferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: impl Into<String>, reference: Reference) {
        self.by_kind.entry(kind.into()).or_default().push(reference);
    }
}

#[async_trait]
impl ReferenceRepository for StaticReferenceRepository {
    async fn lookup_by_id(
        &self,
        id: &str,
        ref_type: &str,
    ) -> Result<Option<Reference>, EngineError> {
        Ok(self
            .by_kind
            .values()
            .flatten()
            .find(|r| r.id == id && r.ref_type == ref_type)
            .cloned())
    }

    async fn search_applicable(&self, item: &Item) -> Result<Vec<Reference>, EngineError> {
        Ok(self.by_kind.get(&item.kind).cloned().unwrap_or_default())
    }
}

/// 记录式动作执行器：记下每次调用，指定类型可注入失败
#[derive(Default)]
pub struct RecordingActionExecutor {
    executed: Mutex<Vec<String>>,
    fail_types: HashSet<String>,
}

impl RecordingActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让指定动作类型返回失败结果（仍是 Ok，success=false）
    pub fn with_failure(mut self, action_type: impl Into<String>) -> Self {
        self.fail_types.insert(action_type.into());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ActionExecutor for RecordingActionExecutor {
    async fn execute(
        &self,
        action_type: &str,
        item: &Item,
        _recommendation: &Recommendation,
    ) -> Result<ActionResult, EngineError> {
        if let Ok(mut v) = self.executed.lock() {
            v.push(action_type.to_string());
        }
        if self.fail_types.contains(action_type) {
            return Ok(ActionResult {
                success: false,
                message: format!("{action_type} failed for {}", item.id),
                detail: json!({ "item_id": item.id }),
            });
        }
        Ok(ActionResult {
            success: true,
            message: format!("{action_type} completed for {}", item.id),
            detail: json!({ "item_id": item.id }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::recommendation::Verdict;

    fn dummy_recommendation() -> Recommendation {
        Recommendation {
            verdict: Verdict::Process,
            reason: String::new(),
            references: Vec::new(),
            actions: Vec::new(),
            confidence: 0.5,
        }
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let repo = InMemoryItemRepository::new();
        assert!(matches!(
            repo.get_by_id("nope").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_action_is_a_result_not_an_error() {
        let exec = RecordingActionExecutor::new().with_failure("notify_provider");
        let item = Item::new("CLM-1", "claim");
        let result = exec
            .execute("notify_provider", &item, &dummy_recommendation())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(exec.executed(), vec!["notify_provider".to_string()]);
    }

    #[tokio::test]
    async fn test_reference_lookup_by_id_and_type() {
        let mut repo = StaticReferenceRepository::new();
        repo.insert(
            "claim",
            Reference::new("plan-doc-p9", "policy_document", "Page 9"),
        );
        let hit = repo
            .lookup_by_id("plan-doc-p9", "policy_document")
            .await
            .unwrap();
        assert_eq!(hit.unwrap().label, "Page 9");
        let miss = repo.lookup_by_id("plan-doc-p9", "claim").await.unwrap();
        assert!(miss.is_none());
    }
}
