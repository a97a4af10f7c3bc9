//! 流水线运行器
//!
//! 流水线 = 固定有序的命名阶段列表 + 场景决策函数。阶段严格串行执行：
//! 后续阶段可读取先前阶段的 StepRecord（如拒付代码阶段依赖额度检查的告警）。
//! 每完成一个阶段：产出一条 StepRecord、同步回调 emit、向透明日志追加一条
//! 带耗时与子系统标签的条目。阶段故障中止运行并记入 error 日志条目，
//! 已产出的步骤保留，不回滚。

use std::time::Instant;

use serde_json::json;

use crate::audit::LogEntry;
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::run::RunResult;
use crate::pipeline::step::{Reference, StepOutcome, StepRecord, StepStatus};

/// 阶段求值结果：叙述、结果变体、可选置信度与引用
#[derive(Debug)]
pub struct StageOutput {
    pub narrative: String,
    pub outcome: StepOutcome,
    pub confidence: Option<f64>,
    pub references: Vec<Reference>,
}

impl StageOutput {
    pub fn success(narrative: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            narrative: narrative.into(),
            outcome: StepOutcome::Success { detail },
            confidence: None,
            references: Vec::new(),
        }
    }

    pub fn warning(
        narrative: impl Into<String>,
        detail: serde_json::Value,
        code: Option<&str>,
    ) -> Self {
        Self {
            narrative: narrative.into(),
            outcome: StepOutcome::Warning {
                detail,
                code: code.map(String::from),
            },
            confidence: None,
            references: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }
}

/// 阶段求值函数：读取条目字段与先前步骤，产出 StageOutput；Err 表示内部故障
pub type StageEval = fn(&Item, &[StepRecord]) -> Result<StageOutput, String>;

/// 命名阶段定义
pub struct StageDef {
    pub title: &'static str,
    /// 透明日志条目的子系统标签
    pub subsystem: &'static str,
    /// 产出步骤的 Agent 名
    pub agent: &'static str,
    pub eval: StageEval,
}

/// 场景决策函数：完成步骤列表的纯函数，幂等
pub type DecideFn = fn(&[StepRecord]) -> Recommendation;

/// 场景流水线；各垂直领域共用同一契约，聚合器与展示层保持流水线无关
pub struct Pipeline {
    pub id: &'static str,
    pub stages: Vec<StageDef>,
    pub decide: DecideFn,
}

impl Pipeline {
    /// 串行执行全部阶段。emit 在每个阶段完成后、下一阶段开始前同步触发；
    /// 返回的 RunResult 在故障时 fault 为 Some 且无建议（completed 仍为真）。
    pub fn run(&self, item: &Item, emit: &mut dyn FnMut(&StepRecord)) -> RunResult {
        let mut run = RunResult::new(self.id, item.id.clone());

        for (index, stage) in self.stages.iter().enumerate() {
            let started = Instant::now();
            match (stage.eval)(item, &run.steps) {
                Ok(output) => {
                    let record = StepRecord {
                        index,
                        title: stage.title.to_string(),
                        narrative: output.narrative,
                        agent: stage.agent.to_string(),
                        confidence: output.confidence,
                        references: output.references,
                        outcome: output.outcome,
                    };
                    run.log.append(LogEntry::new(
                        stage.title,
                        record.status(),
                        stage.subsystem,
                        started.elapsed().as_millis() as u64,
                        json!({ "step_index": index, "code": record.code() }),
                    ));
                    emit(&record);
                    run.steps.push(record);
                }
                Err(message) => {
                    run.log.append(LogEntry::new(
                        stage.title,
                        StepStatus::Error,
                        stage.subsystem,
                        started.elapsed().as_millis() as u64,
                        json!({ "fault": message }),
                    ));
                    run.fault = Some(format!("{}: {}", stage.title, message));
                    run.completed = true;
                    run.finished_at = Some(chrono::Utc::now());
                    return run;
                }
            }
        }

        run.recommendation = Some((self.decide)(&run.steps));
        run.completed = true;
        run.finished_at = Some(chrono::Utc::now());
        run
    }

    /// 对完成的步骤列表重新求值建议（决策函数为纯函数，结果幂等）
    pub fn finalize(&self, steps: &[StepRecord]) -> Recommendation {
        (self.decide)(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::recommendation::Verdict;

    fn ok_stage(_item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
        Ok(StageOutput::success("fine", json!({})).with_confidence(0.9))
    }

    fn faulty_stage(_item: &Item, _prior: &[StepRecord]) -> Result<StageOutput, String> {
        Err("ledger service unreachable".to_string())
    }

    fn decide_process(_steps: &[StepRecord]) -> Recommendation {
        Recommendation {
            verdict: Verdict::Process,
            reason: "all clear".to_string(),
            references: Vec::new(),
            actions: Vec::new(),
            confidence: 0.8,
        }
    }

    fn test_pipeline(stages: Vec<StageDef>) -> Pipeline {
        Pipeline {
            id: "test",
            stages,
            decide: decide_process,
        }
    }

    fn stage(title: &'static str, eval: StageEval) -> StageDef {
        StageDef {
            title,
            subsystem: "test",
            agent: "Test Agent",
            eval,
        }
    }

    #[test]
    fn test_indices_are_gapless_and_emitted_in_order() {
        let p = test_pipeline(vec![
            stage("One", ok_stage),
            stage("Two", ok_stage),
            stage("Three", ok_stage),
        ]);
        let item = Item::new("X-1", "case");
        let mut seen = Vec::new();
        let run = p.run(&item, &mut |s| seen.push(s.index));

        assert_eq!(seen, vec![0, 1, 2]);
        let indices: Vec<usize> = run.steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(run.completed);
        assert!(run.recommendation.is_some());
        assert_eq!(run.log.len(), 3);
        assert!(run.total_duration_ms().is_some());
    }

    #[test]
    fn test_fault_aborts_and_preserves_prior_steps() {
        let p = test_pipeline(vec![
            stage("One", ok_stage),
            stage("Broken", faulty_stage),
            stage("Never", ok_stage),
        ]);
        let item = Item::new("X-2", "case");
        let mut emitted = 0;
        let run = p.run(&item, &mut |_| emitted += 1);

        // 第一阶段的步骤保留；故障阶段只进日志，不产出步骤
        assert_eq!(emitted, 1);
        assert_eq!(run.steps.len(), 1);
        assert!(run.recommendation.is_none());
        assert!(run.completed);
        assert!(run.fault.as_deref().unwrap().contains("Broken"));

        let last = run.log.entries().last().unwrap();
        assert_eq!(last.status, StepStatus::Error);
        assert_eq!(last.detail["fault"], "ledger service unreachable");
        assert!(run.as_result().is_err());
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let p = test_pipeline(vec![stage("One", ok_stage)]);
        let item = Item::new("X-3", "case");
        let run = p.run(&item, &mut |_| {});

        let a = p.finalize(&run.steps);
        let b = p.finalize(&run.steps);
        assert_eq!(a, b);
        assert_eq!(Some(a), run.recommendation);
    }
}
