//! 业务条目：待分析的领域实体（理赔单 / 工单 / 案件 / 贷款申请）
//!
//! 核心对条目保持「不透明」：领域字段放在 JSON map 中，由各流水线阶段按名读取；
//! scenario 为可选的显式场景标签，路由时优先于启发式判定。

use serde::{Deserialize, Serialize};

/// 业务条目
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    /// 条目种类：claim / work_order / case / loan
    pub kind: String,
    /// 显式场景标签；缺省时由路由启发式判定
    pub scenario: Option<String>,
    pub status: String,
    /// 领域字段（字段名与前端约定一致，camelCase）
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            scenario: None,
            status: "open".to_string(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// 数值字段（整数也按 f64 返回）
    pub fn num_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(|v| v.as_f64())
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessors() {
        let item = Item::new("CLM-1", "claim")
            .with_field("buildDays", 12)
            .with_field("state", "Texas")
            .with_field("providerEligible", true);

        assert_eq!(item.num_field("buildDays"), Some(12.0));
        assert_eq!(item.str_field("state"), Some("Texas"));
        assert_eq!(item.bool_field("providerEligible"), Some(true));
        assert!(item.num_field("missing").is_none());
        assert!(!item.has_field("missing"));
    }
}
