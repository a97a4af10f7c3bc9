//! 路径 / 指派优化：工单到资源的加权匹配
//!
//! 对每个待指派工单，按 技能重合 0.4 / 就近 0.3 / 可用性 0.2 / 当前负载 0.1
//! 的权重为候选资源打分，取最高分；同分时列表序在前者胜（严格大于扫描，
//! 确定且可测试）。无可用资源的工单进入 unassigned，绝不静默丢弃或抛错。

use serde::{Deserialize, Serialize};

/// 经纬度坐标
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// 待指派工单
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteJob {
    pub id: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub location: GeoPoint,
    /// 现场作业时长（分钟）
    #[serde(default)]
    pub duration_mins: u32,
}

/// 候选资源（技师 / 车队）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub location: GeoPoint,
    pub available: bool,
    /// 当前已有任务数，用于负载项
    #[serde(default)]
    pub active_jobs: u32,
}

/// 匹配约束与权重；权重来自 [routing] 配置，默认即规格值
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteConstraints {
    pub skill_weight: f64,
    pub proximity_weight: f64,
    pub availability_weight: f64,
    pub workload_weight: f64,
    /// 负载项按 active_jobs / max_active_jobs 归一
    pub max_active_jobs: u32,
    /// 通勤时长估算用平均车速（km/h）
    pub avg_speed_kmh: f64,
}

impl Default for RouteConstraints {
    fn default() -> Self {
        Self {
            skill_weight: 0.4,
            proximity_weight: 0.3,
            availability_weight: 0.2,
            workload_weight: 0.1,
            max_active_jobs: 5,
            avg_speed_kmh: 40.0,
        }
    }
}

/// 单条指派
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub job_id: String,
    pub resource_id: String,
    pub score: f64,
    pub distance_km: f64,
    /// 通勤 + 现场作业（分钟）
    pub duration_mins: u32,
}

/// 优化结果；unassigned 保证覆盖所有未能指派的工单
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutePlan {
    pub assignments: Vec<RouteAssignment>,
    pub unassigned: Vec<String>,
    pub total_distance_km: f64,
    pub total_duration_mins: u32,
    /// 指派覆盖率 [0,1]：assigned / total；无工单时为 1.0
    pub efficiency: f64,
}

/// Haversine 球面距离（公里）
fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// 技能重合度：命中所需技能数 / 所需技能总数；无要求视为 1.0
fn skill_overlap(job: &RouteJob, resource: &RouteResource) -> f64 {
    if job.required_skills.is_empty() {
        return 1.0;
    }
    let hit = job
        .required_skills
        .iter()
        .filter(|s| resource.skills.iter().any(|r| r.eq_ignore_ascii_case(s)))
        .count();
    hit as f64 / job.required_skills.len() as f64
}

fn score(
    job: &RouteJob,
    resource: &RouteResource,
    extra_load: u32,
    constraints: &RouteConstraints,
) -> f64 {
    let overlap = skill_overlap(job, resource);
    let dist = distance_km(job.location, resource.location);
    let proximity = 1.0 / (1.0 + dist / 10.0);
    let availability = if resource.available { 1.0 } else { 0.0 };
    let load = (resource.active_jobs + extra_load).min(constraints.max_active_jobs);
    let workload = 1.0 - load as f64 / constraints.max_active_jobs as f64;

    constraints.skill_weight * overlap
        + constraints.proximity_weight * proximity
        + constraints.availability_weight * availability
        + constraints.workload_weight * workload
}

/// 为全部工单求指派方案。
/// 候选限定为「可用且至少命中一项所需技能」的资源；本次调用内已获指派的
/// 资源负载随之上升，使多工单在资源间摊开。
pub fn optimize_route(
    jobs: &[RouteJob],
    resources: &[RouteResource],
    constraints: &RouteConstraints,
) -> RoutePlan {
    let mut assignments = Vec::new();
    let mut unassigned = Vec::new();
    let mut assigned_load = vec![0u32; resources.len()];

    for job in jobs {
        let mut best: Option<(usize, f64)> = None;
        for (idx, resource) in resources.iter().enumerate() {
            if !resource.available || skill_overlap(job, resource) == 0.0 {
                continue;
            }
            let s = score(job, resource, assigned_load[idx], constraints);
            // 严格大于：同分保持先出现的候选
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((idx, s));
            }
        }

        match best {
            Some((idx, s)) => {
                let resource = &resources[idx];
                let dist = distance_km(job.location, resource.location);
                let travel_mins = (dist / constraints.avg_speed_kmh * 60.0).round() as u32;
                assigned_load[idx] += 1;
                assignments.push(RouteAssignment {
                    job_id: job.id.clone(),
                    resource_id: resource.id.clone(),
                    score: s,
                    distance_km: dist,
                    duration_mins: travel_mins + job.duration_mins,
                });
            }
            None => unassigned.push(job.id.clone()),
        }
    }

    let total_distance_km = assignments.iter().map(|a| a.distance_km).sum();
    let total_duration_mins = assignments.iter().map(|a| a.duration_mins).sum();
    let efficiency = if jobs.is_empty() {
        1.0
    } else {
        assignments.len() as f64 / jobs.len() as f64
    };

    RoutePlan {
        assignments,
        unassigned,
        total_distance_km,
        total_duration_mins,
        efficiency,
    }
}
