// ==========================================
// 爆破起爆网络 - 已校验网络
// ==========================================
// 仅由 NetworkValidator 构造；求解器只接受此类型
// ==========================================

use crate::domain::types::{ConnectionId, HoleId};
use std::collections::BTreeMap;

/// 出边（子孔 + 延时）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEdge {
    pub connection_id: ConnectionId,
    pub to_hole_id: HoleId,
    pub delay_ms: u32,
}

/// 通过校验的起爆网络（森林结构）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNetwork {
    holes: Vec<HoleId>,
    roots: Vec<HoleId>,
    children: BTreeMap<HoleId, Vec<ChildEdge>>,
}

impl ValidatedNetwork {
    pub(super) fn new(
        holes: Vec<HoleId>,
        roots: Vec<HoleId>,
        children: BTreeMap<HoleId, Vec<ChildEdge>>,
    ) -> Self {
        Self {
            holes,
            roots,
            children,
        }
    }

    /// 全部炮孔（ID升序）
    pub fn holes(&self) -> &[HoleId] {
        &self.holes
    }

    /// 起爆孔（ID升序）
    pub fn roots(&self) -> &[HoleId] {
        &self.roots
    }

    /// 子孔出边（按子孔ID升序）
    pub fn children(&self, hole_id: &str) -> &[ChildEdge] {
        self.children
            .get(hole_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 弱连通分量数；森林中每个分量恰有一个起爆孔
    pub fn component_count(&self) -> usize {
        self.roots.len()
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn is_starting_hole(&self, hole_id: &str) -> bool {
        self.roots.binary_search_by(|r| r.as_str().cmp(hole_id)).is_ok()
    }
}
