// ==========================================
// 爆破起爆网络 - 网络与起爆时序模型
// ==========================================
// Network: 一个站点的炮孔 + 连接（有向图的原始输入）
// FiringSchedule: 求解器输出
// NetworkView: 编排器对外发布的不可变快照
// ==========================================

use crate::domain::charge::{ChargeResult, MaterialParams};
use crate::domain::connection::{BlastConnection, ConnectionView};
use crate::domain::drill_point::DrillPoint;
use crate::domain::types::{HoleId, SiteKey};
use crate::domain::violation::TopologyViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Network - 起爆网络输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub points: Vec<DrillPoint>,
    pub connections: Vec<BlastConnection>,
}

impl Network {
    pub fn new(points: Vec<DrillPoint>, connections: Vec<BlastConnection>) -> Self {
        Self {
            points,
            connections,
        }
    }

    pub fn point(&self, hole_id: &str) -> Option<&DrillPoint> {
        self.points.iter().find(|p| p.id == hole_id)
    }

    pub fn connection(&self, connection_id: &str) -> Option<&BlastConnection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ==========================================
// HoleTiming - 单孔起爆时序
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleTiming {
    pub firing_time_ms: u64,
    pub sequence_number: u32, // 1..N
    pub is_starting_hole: bool,
}

// ==========================================
// BlastMetrics - 起爆时序统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlastMetrics {
    /// 最后一个炮孔的起爆时刻
    pub total_duration_ms: u64,
    /// 同一时刻起爆的最大孔数
    pub max_simultaneous_holes: usize,
    /// 不同起爆时刻的数量
    pub distinct_firing_instants: usize,
    /// 相邻不同起爆时刻的平均间隔
    pub average_interval_ms: f64,
}

// ==========================================
// FiringSchedule - 起爆时序表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiringSchedule {
    pub timings: BTreeMap<HoleId, HoleTiming>,
    /// 按起爆序号排列的炮孔
    pub order: Vec<HoleId>,
    /// 起爆孔（升序）
    pub starting_holes: Vec<HoleId>,
    pub metrics: BlastMetrics,
}

impl FiringSchedule {
    pub fn timing(&self, hole_id: &str) -> Option<&HoleTiming> {
        self.timings.get(hole_id)
    }

    pub fn firing_time(&self, hole_id: &str) -> Option<u64> {
        self.timings.get(hole_id).map(|t| t.firing_time_ms)
    }

    pub fn sequence(&self, hole_id: &str) -> Option<u32> {
        self.timings.get(hole_id).map(|t| t.sequence_number)
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

// ==========================================
// NetworkView - 站点快照
// ==========================================
// 发布后只读；任何修改都生成新快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkView {
    pub site: SiteKey,
    /// 每次成功修改 +1
    pub revision: u64,
    /// 按炮孔ID升序
    pub points: Vec<DrillPoint>,
    /// 按 (序号, 连接ID) 升序
    pub connections: Vec<ConnectionView>,
    pub schedule: FiringSchedule,
    pub charges: ChargeResult,
    pub material_params: MaterialParams,
    pub component_count: usize,
    /// 仅当持久化数据加载时即不合法才非空；此时 schedule 为空
    pub load_violations: Vec<TopologyViolation>,
    pub updated_at: DateTime<Utc>,
}

impl NetworkView {
    /// 快照是否为通过校验的网络
    pub fn is_consistent(&self) -> bool {
        self.load_violations.is_empty()
    }

    pub fn starting_holes(&self) -> &[HoleId] {
        &self.schedule.starting_holes
    }

    /// 还原为原始网络输入
    pub fn network(&self) -> Network {
        Network {
            points: self.points.clone(),
            connections: self
                .connections
                .iter()
                .map(|c| c.connection.clone())
                .collect(),
        }
    }
}
