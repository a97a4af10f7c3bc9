//! 场景路由：把业务条目解析到一条流水线
//!
//! 条目带显式场景标签时走静态别名注册表（多个标签可别名同一条流水线，
//! 例如三种 COB 写法都指向 cob）；否则按序应用启发式谓词，首个命中者胜。
//! 任何情况下解析失败都显式返回 UnresolvedScenario，绝不静默兜底。

use std::collections::HashMap;

use crate::core::error::EngineError;
use crate::pipeline::item::Item;
use crate::pipeline::runner::Pipeline;
use crate::pipeline::scenarios;

/// 启发式谓词：按注册顺序求值
struct Heuristic {
    pipeline_id: &'static str,
    matches: fn(&Item) -> bool,
}

/// 场景路由器；解析为纯函数，相同条目恒得相同流水线
pub struct ScenarioRouter {
    pipelines: HashMap<&'static str, Pipeline>,
    aliases: HashMap<&'static str, &'static str>,
    heuristics: Vec<Heuristic>,
}

impl ScenarioRouter {
    /// 注册全部内置垂直场景
    pub fn with_defaults() -> Self {
        let mut pipelines = HashMap::new();
        for p in [
            scenarios::claims::pipeline(),
            scenarios::cob::pipeline(),
            scenarios::lending::pipeline(),
            scenarios::appeals::pipeline(),
            scenarios::dispatch::pipeline(),
        ] {
            pipelines.insert(p.id, p);
        }

        let aliases = HashMap::from([
            ("build-limit-review", "build-limit-review"),
            ("custom-build", "build-limit-review"),
            ("dme-build-limit", "build-limit-review"),
            // COB 的三种惯用写法都归并到同一条流水线
            ("cob", "cob"),
            ("cob-primacy", "cob"),
            ("coordination-of-benefits", "cob"),
            ("dual-coverage", "cob"),
            ("loan-underwrite", "loan-underwrite"),
            ("loan", "loan-underwrite"),
            ("underwrite", "loan-underwrite"),
            ("appeal-review", "appeal-review"),
            ("appeal", "appeal-review"),
            ("grievance", "appeal-review"),
            ("work-order-dispatch", "work-order-dispatch"),
            ("dispatch", "work-order-dispatch"),
            ("field-service", "work-order-dispatch"),
        ]);

        let heuristics = vec![
            Heuristic {
                pipeline_id: "cob",
                matches: |i| i.has_field("otherCoverage") || i.has_field("secondaryPayer"),
            },
            Heuristic {
                pipeline_id: "build-limit-review",
                matches: |i| i.has_field("buildDays") && i.has_field("authorizedDays"),
            },
            Heuristic {
                pipeline_id: "loan-underwrite",
                matches: |i| i.has_field("loanAmount"),
            },
            Heuristic {
                pipeline_id: "appeal-review",
                matches: |i| i.has_field("appealReason"),
            },
            Heuristic {
                pipeline_id: "work-order-dispatch",
                matches: |i| i.kind == "work_order" || i.has_field("availableResources"),
            },
        ];

        Self {
            pipelines,
            aliases,
            heuristics,
        }
    }

    /// 解析条目到流水线；失败返回 UnresolvedScenario
    pub fn resolve(&self, item: &Item) -> Result<&Pipeline, EngineError> {
        if let Some(tag) = &item.scenario {
            let normalized = tag.trim().to_ascii_lowercase();
            return self
                .aliases
                .get(normalized.as_str())
                .and_then(|id| self.pipelines.get(id))
                .ok_or_else(|| EngineError::UnresolvedScenario(item.id.clone()));
        }

        for h in &self.heuristics {
            if (h.matches)(item) {
                // 注册表与启发式共享同一来源，此处取值总能命中
                if let Some(p) = self.pipelines.get(h.pipeline_id) {
                    return Ok(p);
                }
            }
        }
        Err(EngineError::UnresolvedScenario(item.id.clone()))
    }

    pub fn get(&self, id: &str) -> Option<&Pipeline> {
        self.pipelines.get(id)
    }

    pub fn pipeline_ids(&self) -> Vec<&'static str> {
        self.pipelines.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_tag_beats_heuristics() {
        let router = ScenarioRouter::with_defaults();
        // 字段会命中 build-limit-review 启发式，但显式标签优先
        let item = Item::new("CLM-1", "claim")
            .with_scenario("cob-primacy")
            .with_field("buildDays", 12)
            .with_field("authorizedDays", 10);
        assert_eq!(router.resolve(&item).unwrap().id, "cob");
    }

    #[test]
    fn test_cob_aliases_share_one_pipeline() {
        let router = ScenarioRouter::with_defaults();
        for tag in ["cob", "COB-Primacy", "coordination-of-benefits", "dual-coverage"] {
            let item = Item::new("CLM-2", "claim").with_scenario(tag);
            assert_eq!(router.resolve(&item).unwrap().id, "cob", "tag {tag}");
        }
    }

    #[test]
    fn test_heuristics_apply_in_order() {
        let router = ScenarioRouter::with_defaults();
        let item = Item::new("CLM-3", "claim")
            .with_field("buildDays", 12)
            .with_field("authorizedDays", 10);
        assert_eq!(router.resolve(&item).unwrap().id, "build-limit-review");

        // otherCoverage 的启发式排在前面
        let both = Item::new("CLM-4", "claim")
            .with_field("otherCoverage", "Acme Health")
            .with_field("buildDays", 12)
            .with_field("authorizedDays", 10);
        assert_eq!(router.resolve(&both).unwrap().id, "cob");
    }

    #[test]
    fn test_resolution_is_pure() {
        let router = ScenarioRouter::with_defaults();
        let item = Item::new("LN-1", "loan").with_field("loanAmount", 10000.0);
        let a = router.resolve(&item).unwrap().id;
        let b = router.resolve(&item).unwrap().id;
        assert_eq!(a, b);
    }

    #[test]
    fn test_unresolved_surfaces_error() {
        let router = ScenarioRouter::with_defaults();
        let blank = Item::new("X-1", "case");
        assert!(matches!(
            router.resolve(&blank),
            Err(EngineError::UnresolvedScenario(_))
        ));

        // 未注册的显式标签同样报错，不回落到启发式
        let bogus = Item::new("X-2", "claim")
            .with_scenario("no-such-scenario")
            .with_field("buildDays", 1)
            .with_field("authorizedDays", 1);
        assert!(matches!(
            router.resolve(&bogus),
            Err(EngineError::UnresolvedScenario(_))
        ));
    }
}
