//! 透明日志：单次运行的追加式审计轨迹
//!
//! 每个阶段 / 动作追加一条带时间戳与执行耗时的条目；条目一经追加不可变，
//! 外部只能以只读切片访问。持久化超出单次运行生命周期由协作方负责。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::step::StepStatus;

/// 单条审计条目
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// 动作标签（通常为阶段标题或动作类型）
    pub action: String,
    pub status: StepStatus,
    /// 产生该条目的子系统标签（如 "limits"、"routing"）
    pub subsystem: String,
    /// 该条目自身的执行耗时（毫秒），与运行总时长相互独立
    pub duration_ms: u64,
    pub detail: serde_json::Value,
}

impl LogEntry {
    pub fn new(
        action: impl Into<String>,
        status: StepStatus,
        subsystem: impl Into<String>,
        duration_ms: u64,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            status,
            subsystem: subsystem.into(),
            duration_ms,
            detail,
        }
    }
}

/// 追加式透明日志，一次运行独占一份
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransparencyLog {
    entries: Vec<LogEntry>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_preserves_order() {
        let mut log = TransparencyLog::new();
        log.append(LogEntry::new("Intake Review", StepStatus::Success, "intake", 3, json!({})));
        log.append(LogEntry::new("Limit Check", StepStatus::Warning, "limits", 5, json!({})));

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].action, "Intake Review");
        assert_eq!(log.entries()[1].action, "Limit Check");
        assert_eq!(log.entries()[1].status, StepStatus::Warning);
    }
}
