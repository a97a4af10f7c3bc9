//! 运行结果：一次 (条目, 场景) 绑定的全部产出

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::TransparencyLog;
use crate::core::error::EngineError;
use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::step::StepRecord;

/// 一次运行的结果；绑定且仅绑定一个 (item id, scenario) 对。
/// completed 为真当且仅当建议已生成、或流水线以故障显式终止。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub scenario: String,
    pub item_id: String,
    pub steps: Vec<StepRecord>,
    pub log: TransparencyLog,
    pub recommendation: Option<Recommendation>,
    /// 阶段故障描述；Some 时 recommendation 恒为 None
    pub fault: Option<String>,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunResult {
    pub fn new(scenario: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.into(),
            item_id: item_id.into(),
            steps: Vec::new(),
            log: TransparencyLog::new(),
            recommendation: None,
            fault: None,
            completed: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 运行总时长（墙钟 end - start），与逐条目耗时独立
    pub fn total_duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// 故障运行转为可传播的错误；无故障时为 Ok
    pub fn as_result(&self) -> Result<(), EngineError> {
        match &self.fault {
            Some(message) => Err(EngineError::StageFault {
                stage: self
                    .log
                    .entries()
                    .last()
                    .map(|e| e.action.clone())
                    .unwrap_or_default(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
