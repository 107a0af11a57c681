// ==========================================
// 爆破起爆网络 - 拓扑违规
// ==========================================
// 校验器一次性返回全部违规（不在第一个错误处中断）
// ViolationKind 为闭合枚举，供前端分组展示
// ==========================================

use crate::domain::types::{ConnectionId, HoleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 违规类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    SelfLoop,
    DuplicateEdge,
    DanglingReference,
    OverDeterminedNode,
    CycleDetected,
    MultipleStartingHoles,
    UnreachableHole,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::SelfLoop => "SELF_LOOP",
            ViolationKind::DuplicateEdge => "DUPLICATE_EDGE",
            ViolationKind::DanglingReference => "DANGLING_REFERENCE",
            ViolationKind::OverDeterminedNode => "OVER_DETERMINED_NODE",
            ViolationKind::CycleDetected => "CYCLE_DETECTED",
            ViolationKind::MultipleStartingHoles => "MULTIPLE_STARTING_HOLES",
            ViolationKind::UnreachableHole => "UNREACHABLE_HOLE",
        };
        write!(f, "{}", s)
    }
}

/// 拓扑违规明细
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyViolation {
    #[error("自环连接: connection={connection_id}, hole={hole_id}")]
    SelfLoop {
        connection_id: ConnectionId,
        hole_id: HoleId,
    },

    #[error("重复连接: connection={connection_id}, {from_hole_id} → {to_hole_id}")]
    DuplicateEdge {
        connection_id: ConnectionId,
        from_hole_id: HoleId,
        to_hole_id: HoleId,
    },

    #[error("连接引用了不存在的炮孔: connection={connection_id}, hole={missing_hole_id}")]
    DanglingReference {
        connection_id: ConnectionId,
        missing_hole_id: HoleId,
    },

    #[error("炮孔有多条入边: hole={hole_id}, connections={incoming:?}")]
    OverDeterminedNode {
        hole_id: HoleId,
        incoming: Vec<ConnectionId>,
    },

    #[error("检测到环路: connection={connection_id}, {from_hole_id} → {to_hole_id}")]
    CycleDetected {
        connection_id: ConnectionId,
        from_hole_id: HoleId,
        to_hole_id: HoleId,
    },

    #[error("存在多个起爆孔: {starting_holes:?}")]
    MultipleStartingHoles { starting_holes: Vec<HoleId> },

    #[error("炮孔无法从任何起爆孔到达: hole={hole_id}")]
    UnreachableHole { hole_id: HoleId },
}

impl TopologyViolation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            TopologyViolation::SelfLoop { .. } => ViolationKind::SelfLoop,
            TopologyViolation::DuplicateEdge { .. } => ViolationKind::DuplicateEdge,
            TopologyViolation::DanglingReference { .. } => ViolationKind::DanglingReference,
            TopologyViolation::OverDeterminedNode { .. } => ViolationKind::OverDeterminedNode,
            TopologyViolation::CycleDetected { .. } => ViolationKind::CycleDetected,
            TopologyViolation::MultipleStartingHoles { .. } => ViolationKind::MultipleStartingHoles,
            TopologyViolation::UnreachableHole { .. } => ViolationKind::UnreachableHole,
        }
    }
}
