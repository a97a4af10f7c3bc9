//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CLERK__*` 覆盖（双下划线表示嵌套，
//! 如 `CLERK__AGENT__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::routing::RouteConstraints;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub console: ConsoleSection,
    #[serde(default)]
    pub routing: RoutingSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [agent] 段：文本客户端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 后端：openai / scripted；openai 且凭证缺失时回落 scripted
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 存放 API Key 的环境变量名
    pub api_key_env: String,
    pub timeouts: AgentTimeoutsSection,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            provider: "scripted".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeouts: AgentTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentTimeoutsSection {
    pub request: u64,
    pub stream: u64,
}

impl Default for AgentTimeoutsSection {
    fn default() -> Self {
        Self {
            request: 60,
            stream: 120,
        }
    }
}

/// [console] 段：渐进展示开关与切片大小
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    pub reveal: bool,
    pub reveal_chunk_chars: usize,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            reveal: false,
            reveal_chunk_chars: 6,
        }
    }
}

/// [routing] 段：加权匹配的权重与约束（默认即算法文档值）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingSection {
    pub skill_weight: f64,
    pub proximity_weight: f64,
    pub availability_weight: f64,
    pub workload_weight: f64,
    pub max_active_jobs: u32,
    pub avg_speed_kmh: f64,
}

impl Default for RoutingSection {
    fn default() -> Self {
        let c = RouteConstraints::default();
        Self {
            skill_weight: c.skill_weight,
            proximity_weight: c.proximity_weight,
            availability_weight: c.availability_weight,
            workload_weight: c.workload_weight,
            max_active_jobs: c.max_active_jobs,
            avg_speed_kmh: c.avg_speed_kmh,
        }
    }
}

impl RoutingSection {
    pub fn constraints(&self) -> RouteConstraints {
        RouteConstraints {
            skill_weight: self.skill_weight,
            proximity_weight: self.proximity_weight,
            availability_weight: self.availability_weight,
            workload_weight: self.workload_weight,
            max_active_jobs: self.max_active_jobs,
            avg_speed_kmh: self.avg_speed_kmh,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            agent: AgentSection::default(),
            console: ConsoleSection::default(),
            routing: RoutingSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 CLERK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CLERK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CLERK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_routing_constraints() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.provider, "scripted");
        let c = cfg.routing.constraints();
        assert!((c.skill_weight - 0.4).abs() < 1e-9);
        assert!((c.proximity_weight - 0.3).abs() < 1e-9);
        assert!((c.availability_weight - 0.2).abs() < 1e-9);
        assert!((c.workload_weight - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clerk.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[agent]\nprovider = \"openai\"\nmodel = \"demo-model\"\n\n[console]\nreveal = true"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.agent.provider, "openai");
        assert_eq!(cfg.agent.model, "demo-model");
        assert!(cfg.console.reveal);
        // 未覆盖的段保持默认
        assert_eq!(cfg.console.reveal_chunk_chars, 6);
    }
}
