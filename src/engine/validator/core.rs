// ==========================================
// 爆破起爆网络 - 网络拓扑校验引擎
// ==========================================
// 检查顺序（违规按此顺序累积）:
// 1. 自环  2. 重复连接  3. 悬空引用  4. 多入边
// 5. 多起爆孔（受策略控制）  6. 环路  7. 不可达炮孔
// ==========================================
// 自环、重复、悬空连接不进入后续检查的邻接表
// ==========================================

use super::graph::{ChildEdge, ValidatedNetwork};
use crate::domain::network::Network;
use crate::domain::types::{ConnectionId, HoleId, StartingHolePolicy};
use crate::domain::violation::TopologyViolation;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// DFS 着色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

// ==========================================
// NetworkValidator - 拓扑校验引擎
// ==========================================
pub struct NetworkValidator {}

impl NetworkValidator {
    /// 创建新的拓扑校验引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 校验起爆网络
    ///
    /// # 返回
    /// - Ok(ValidatedNetwork): 无违规
    /// - Err(Vec<TopologyViolation>): 非空，按检查顺序排列
    #[instrument(skip(self, network), fields(
        holes = network.points.len(),
        connections = network.connections.len(),
        policy = %policy
    ))]
    pub fn validate(
        &self,
        network: &Network,
        policy: StartingHolePolicy,
    ) -> Result<ValidatedNetwork, Vec<TopologyViolation>> {
        let holes: BTreeSet<&str> = network.points.iter().map(|p| p.id.as_str()).collect();

        // ===== 1-3. 逐条检查连接，筛出有效边 =====
        let mut self_loops = Vec::new();
        let mut duplicates = Vec::new();
        let mut dangling = Vec::new();

        let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
        let mut incoming: BTreeMap<&str, Vec<ConnectionId>> = BTreeMap::new();
        let mut children: BTreeMap<&str, Vec<ChildEdge>> = BTreeMap::new();

        for conn in &network.connections {
            let from = conn.from_hole_id.as_str();
            let to = conn.to_hole_id.as_str();

            if from == to {
                self_loops.push(TopologyViolation::SelfLoop {
                    connection_id: conn.id.clone(),
                    hole_id: conn.from_hole_id.clone(),
                });
                continue;
            }

            // 保留首条，其余报重复
            if !seen_pairs.insert((from, to)) {
                duplicates.push(TopologyViolation::DuplicateEdge {
                    connection_id: conn.id.clone(),
                    from_hole_id: conn.from_hole_id.clone(),
                    to_hole_id: conn.to_hole_id.clone(),
                });
                continue;
            }

            let mut missing = false;
            for endpoint in [from, to] {
                if !holes.contains(endpoint) {
                    dangling.push(TopologyViolation::DanglingReference {
                        connection_id: conn.id.clone(),
                        missing_hole_id: endpoint.to_string(),
                    });
                    missing = true;
                }
            }
            if missing {
                continue;
            }

            incoming.entry(to).or_default().push(conn.id.clone());
            children.entry(from).or_default().push(ChildEdge {
                connection_id: conn.id.clone(),
                to_hole_id: conn.to_hole_id.clone(),
                delay_ms: conn.delay_ms,
            });
        }

        for edges in children.values_mut() {
            edges.sort_by(|a, b| {
                a.to_hole_id
                    .cmp(&b.to_hole_id)
                    .then_with(|| a.connection_id.cmp(&b.connection_id))
            });
        }

        // ===== 4. 多入边 =====
        let over_determined: Vec<TopologyViolation> = incoming
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(hole_id, ids)| TopologyViolation::OverDeterminedNode {
                hole_id: hole_id.to_string(),
                incoming: ids.clone(),
            })
            .collect();

        // ===== 5. 起爆孔 =====
        let roots: Vec<&str> = holes
            .iter()
            .copied()
            .filter(|h| !incoming.contains_key(h))
            .collect();

        let mut multiple_roots = Vec::new();
        if policy == StartingHolePolicy::SingleInitiation && roots.len() > 1 {
            multiple_roots.push(TopologyViolation::MultipleStartingHoles {
                starting_holes: roots.iter().map(|r| r.to_string()).collect(),
            });
        }

        // ===== 6-7. 环路与可达性 =====
        let mut marks: HashMap<&str, Mark> = holes.iter().map(|h| (*h, Mark::White)).collect();
        let mut cycles = Vec::new();

        for root in &roots {
            visit(*root, &children, &mut marks, &mut cycles);
        }

        let unreachable: Vec<&str> = holes
            .iter()
            .copied()
            .filter(|h| marks.get(h) == Some(&Mark::White))
            .collect();

        // 无起爆孔的分量必含环，逐个探查以定位环边
        for hole in &unreachable {
            visit(*hole, &children, &mut marks, &mut cycles);
        }

        let mut violations = Vec::new();
        violations.extend(self_loops);
        violations.extend(duplicates);
        violations.extend(dangling);
        violations.extend(over_determined);
        violations.extend(multiple_roots);
        violations.extend(cycles);
        violations.extend(
            unreachable
                .iter()
                .map(|h| TopologyViolation::UnreachableHole {
                    hole_id: h.to_string(),
                }),
        );

        if !violations.is_empty() {
            warn!(violations = violations.len(), "网络校验未通过");
            return Err(violations);
        }

        let holes: Vec<HoleId> = holes.iter().map(|h| h.to_string()).collect();
        let roots: Vec<HoleId> = roots.iter().map(|r| r.to_string()).collect();
        let children: BTreeMap<HoleId, Vec<ChildEdge>> = children
            .into_iter()
            .map(|(from, edges)| (from.to_string(), edges))
            .collect();

        debug!(roots = roots.len(), "网络校验通过");
        Ok(ValidatedNetwork::new(holes, roots, children))
    }
}

impl Default for NetworkValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 迭代式 DFS；命中灰色节点即为环边
fn visit<'a>(
    start: &'a str,
    children: &'a BTreeMap<&'a str, Vec<ChildEdge>>,
    marks: &mut HashMap<&'a str, Mark>,
    cycles: &mut Vec<TopologyViolation>,
) {
    if marks.get(start) != Some(&Mark::White) {
        return;
    }
    marks.insert(start, Mark::Gray);

    let mut stack: Vec<(&'a str, usize)> = vec![(start, 0)];
    while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        let edges = children.get(node).map(Vec::as_slice).unwrap_or(&[]);

        match edges.get(frame.1) {
            Some(edge) => {
                frame.1 += 1;
                let child = edge.to_hole_id.as_str();
                match marks.get(child).copied().unwrap_or(Mark::Black) {
                    Mark::White => {
                        marks.insert(child, Mark::Gray);
                        stack.push((child, 0));
                    }
                    Mark::Gray => cycles.push(TopologyViolation::CycleDetected {
                        connection_id: edge.connection_id.clone(),
                        from_hole_id: node.to_string(),
                        to_hole_id: edge.to_hole_id.clone(),
                    }),
                    // 已完成的子树（经多入边到达），不构成环
                    Mark::Black => {}
                }
            }
            None => {
                marks.insert(node, Mark::Black);
                stack.pop();
            }
        }
    }
}

/// 校验入口（无状态便捷函数）
pub fn validate(
    network: &Network,
    policy: StartingHolePolicy,
) -> Result<ValidatedNetwork, Vec<TopologyViolation>> {
    NetworkValidator::new().validate(network, policy)
}
