// ==========================================
// 爆破起爆网络 - 起爆连接领域模型
// ==========================================
// 有向、带延时的边: from_hole_id → to_hole_id
// 对齐: blast_connection 表
// ==========================================

use crate::domain::types::{ConnectionId, ConnectorKind, HoleId};
use serde::{Deserialize, Serialize};

// ==========================================
// BlastConnection - 起爆连接
// ==========================================
// 序号、起爆孔标记均为派生值，见 ConnectionView
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastConnection {
    pub id: ConnectionId,
    pub from_hole_id: HoleId,
    pub to_hole_id: HoleId,
    pub connector: ConnectorKind,
    pub delay_ms: u32, // 延时（毫秒），类型保证非负
}

impl BlastConnection {
    pub fn new(
        id: impl Into<ConnectionId>,
        from_hole_id: impl Into<HoleId>,
        to_hole_id: impl Into<HoleId>,
        connector: ConnectorKind,
        delay_ms: u32,
    ) -> Self {
        Self {
            id: id.into(),
            from_hole_id: from_hole_id.into(),
            to_hole_id: to_hole_id.into(),
            connector,
            delay_ms,
        }
    }

    /// 是否连接同一对炮孔（同方向）
    pub fn same_endpoints(&self, other: &BlastConnection) -> bool {
        self.from_hole_id == other.from_hole_id && self.to_hole_id == other.to_hole_id
    }

    /// 是否触及某个炮孔
    pub fn touches(&self, hole_id: &str) -> bool {
        self.from_hole_id == hole_id || self.to_hole_id == hole_id
    }
}

// ==========================================
// ConnectionView - 带派生信息的连接
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionView {
    #[serde(flatten)]
    pub connection: BlastConnection,
    /// 目标孔的起爆序号
    pub sequence: u32,
    /// 目标孔的起爆时刻（毫秒）
    pub target_firing_time_ms: u64,
    /// 源孔是否为起爆孔
    pub is_starting_hole: bool,
}
