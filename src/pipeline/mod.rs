//! 场景流水线层：条目模型、步骤记录、路由、运行器与建议聚合

pub mod aggregate;
pub mod item;
pub mod recommendation;
pub mod router;
pub mod run;
pub mod runner;
pub mod scenarios;
pub mod step;

pub use item::Item;
pub use recommendation::{Action, Recommendation, Verdict};
pub use router::ScenarioRouter;
pub use run::RunResult;
pub use runner::{Pipeline, StageDef, StageOutput};
pub use step::{Reference, StepOutcome, StepRecord, StepStatus};
