// ==========================================
// 爆破起爆网络 - 起爆时序求解引擎
// ==========================================
// 输入: ValidatedNetwork（森林）
// 输出: FiringSchedule（起爆时刻 + 起爆序号 + 统计）
// ==========================================
// 规则:
// - 起爆孔时刻为 0
// - 子孔时刻 = 父孔时刻 + 连接延时
// - 序号按 (起爆时刻, 炮孔ID) 升序编号 1..N
// 红线: 每次修改后全量重算，不做增量修补
// ==========================================

use crate::domain::network::{BlastMetrics, FiringSchedule, HoleTiming};
use crate::engine::validator::ValidatedNetwork;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, instrument};

// ==========================================
// FiringTimeSolver - 起爆时序求解引擎
// ==========================================
pub struct FiringTimeSolver {}

impl FiringTimeSolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 求解起爆时序（O(V+E)）
    #[instrument(skip(self, network), fields(
        holes = network.hole_count(),
        roots = network.roots().len()
    ))]
    pub fn solve(&self, network: &ValidatedNetwork) -> FiringSchedule {
        let mut times: BTreeMap<&str, u64> = BTreeMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        for root in network.roots() {
            times.insert(root.as_str(), 0);
            queue.push_back(root.as_str());

            while let Some(hole_id) = queue.pop_front() {
                let parent_time = times.get(hole_id).copied().unwrap_or(0);
                for edge in network.children(hole_id) {
                    let child_time = parent_time.saturating_add(u64::from(edge.delay_ms));
                    times.insert(edge.to_hole_id.as_str(), child_time);
                    queue.push_back(edge.to_hole_id.as_str());
                }
            }
        }

        let mut order: Vec<(&str, u64)> = times.iter().map(|(id, t)| (*id, *t)).collect();
        order.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let mut timings = BTreeMap::new();
        for (index, (hole_id, firing_time_ms)) in order.iter().enumerate() {
            timings.insert(
                hole_id.to_string(),
                HoleTiming {
                    firing_time_ms: *firing_time_ms,
                    sequence_number: index as u32 + 1,
                    is_starting_hole: network.is_starting_hole(hole_id),
                },
            );
        }

        let metrics = compute_metrics(order.iter().map(|(_, t)| *t));

        debug!(
            total_duration_ms = metrics.total_duration_ms,
            max_simultaneous = metrics.max_simultaneous_holes,
            "起爆时序求解完成"
        );

        FiringSchedule {
            timings,
            order: order.iter().map(|(id, _)| id.to_string()).collect(),
            starting_holes: network.roots().to_vec(),
            metrics,
        }
    }
}

impl Default for FiringTimeSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// 时序统计
///
/// # 参数
/// - sorted_times: 升序的起爆时刻
fn compute_metrics(sorted_times: impl Iterator<Item = u64>) -> BlastMetrics {
    let mut metrics = BlastMetrics::default();
    let mut instants: Vec<(u64, usize)> = Vec::new();

    for time in sorted_times {
        match instants.last_mut() {
            Some((last, count)) if *last == time => *count += 1,
            _ => instants.push((time, 1)),
        }
    }

    let (first, last) = match (instants.first(), instants.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return metrics,
    };

    metrics.total_duration_ms = last;
    metrics.max_simultaneous_holes = instants.iter().map(|(_, c)| *c).max().unwrap_or(0);
    metrics.distinct_firing_instants = instants.len();
    if instants.len() > 1 {
        metrics.average_interval_ms = (last - first) as f64 / (instants.len() - 1) as f64;
    }
    metrics
}

/// 求解入口（无状态便捷函数）
pub fn solve(network: &ValidatedNetwork) -> FiringSchedule {
    FiringTimeSolver::new().solve(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::BlastConnection;
    use crate::domain::drill_point::{DrillPoint, HoleGeometry};
    use crate::domain::network::Network;
    use crate::domain::types::{ConnectorKind, StartingHolePolicy};
    use crate::engine::pattern_generator::{generate_pattern, DelaySpec, GridSpec};
    use crate::engine::validator::validate;

    fn network(holes: &[&str], edges: &[(&str, &str, u32)]) -> Network {
        let points = holes
            .iter()
            .enumerate()
            .map(|(i, id)| DrillPoint::new(*id, i as f64, 0.0, HoleGeometry::default()))
            .collect();
        let connections = edges
            .iter()
            .enumerate()
            .map(|(i, (from, to, delay))| {
                BlastConnection::new(
                    format!("c{}", i + 1),
                    *from,
                    *to,
                    ConnectorKind::Connector,
                    *delay,
                )
            })
            .collect();
        Network::new(points, connections)
    }

    fn solve_network(net: &Network) -> FiringSchedule {
        let validated = validate(net, StartingHolePolicy::IndependentPatterns).unwrap();
        solve(&validated)
    }

    #[test]
    fn test_snake_grid_firing_times() {
        let grid = GridSpec {
            rows: 3,
            columns: 3,
            spacing: 3.0,
            burden: 2.5,
            origin_x: 0.0,
            origin_y: 0.0,
            template: HoleGeometry::default(),
        };
        let delays = DelaySpec {
            hole_delay_ms: 10,
            row_delay_ms: 25,
        };
        let candidate = generate_pattern(&grid, &delays).unwrap();
        let schedule = solve_network(&Network::new(candidate.points, candidate.connections));

        let expected = [
            ("DH001", 0),
            ("DH002", 10),
            ("DH003", 20),
            ("DH006", 45),
            ("DH005", 55),
            ("DH004", 65),
            ("DH007", 90),
            ("DH008", 100),
            ("DH009", 110),
        ];
        for (seq, (hole_id, time)) in expected.iter().enumerate() {
            let timing = schedule.timing(hole_id).unwrap();
            assert_eq!(timing.firing_time_ms, *time, "hole {}", hole_id);
            assert_eq!(timing.sequence_number, seq as u32 + 1, "hole {}", hole_id);
        }
        assert_eq!(schedule.starting_holes, vec!["DH001".to_string()]);
        assert_eq!(schedule.metrics.total_duration_ms, 110);
        assert_eq!(schedule.metrics.max_simultaneous_holes, 1);
        assert_eq!(schedule.metrics.distinct_firing_instants, 9);
        assert_eq!(schedule.metrics.average_interval_ms, 110.0 / 8.0);
    }

    #[test]
    fn test_every_edge_respects_delay() {
        let net = network(
            &["A", "B", "C", "D", "E"],
            &[("A", "B", 17), ("A", "C", 42), ("C", "D", 0), ("B", "E", 9)],
        );
        let schedule = solve_network(&net);
        for conn in &net.connections {
            let from = schedule.firing_time(&conn.from_hole_id).unwrap();
            let to = schedule.firing_time(&conn.to_hole_id).unwrap();
            assert_eq!(to, from + u64::from(conn.delay_ms));
        }
    }

    #[test]
    fn test_sequence_is_permutation_with_id_tiebreak() {
        // B 与 C 同时起爆，按ID排序
        let net = network(&["A", "C", "B"], &[("A", "C", 0), ("A", "B", 0)]);
        let schedule = solve_network(&net);

        assert_eq!(schedule.order, vec!["A", "B", "C"]);
        let mut sequences: Vec<u32> = schedule.timings.values().map(|t| t.sequence_number).collect();
        sequences.sort();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(schedule.metrics.max_simultaneous_holes, 3);
        assert_eq!(schedule.metrics.distinct_firing_instants, 1);
        assert_eq!(schedule.metrics.average_interval_ms, 0.0);
    }

    #[test]
    fn test_independent_patterns_each_start_at_zero() {
        let net = network(&["A", "B", "X", "Y"], &[("A", "B", 25), ("X", "Y", 30)]);
        let schedule = solve_network(&net);

        assert_eq!(schedule.starting_holes, vec!["A", "X"]);
        assert_eq!(schedule.firing_time("A"), Some(0));
        assert_eq!(schedule.firing_time("X"), Some(0));
        assert!(schedule.timing("X").unwrap().is_starting_hole);
        assert!(!schedule.timing("Y").unwrap().is_starting_hole);
        assert_eq!(schedule.order, vec!["A", "X", "B", "Y"]);
    }

    #[test]
    fn test_isolated_hole_is_its_own_root() {
        let net = network(&["A"], &[]);
        let schedule = solve_network(&net);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.sequence("A"), Some(1));
        assert_eq!(schedule.metrics.total_duration_ms, 0);
    }

    #[test]
    fn test_solve_is_idempotent() {
        let net = network(
            &["A", "B", "C", "D"],
            &[("A", "B", 5), ("B", "C", 5), ("A", "D", 10)],
        );
        let validated = validate(&net, StartingHolePolicy::default()).unwrap();
        let solver = FiringTimeSolver::new();
        assert_eq!(solver.solve(&validated), solver.solve(&validated));
    }

    #[test]
    fn test_empty_network() {
        let schedule = solve_network(&Network::default());
        assert!(schedule.is_empty());
        assert_eq!(schedule.metrics, BlastMetrics::default());
        assert!(schedule.order.is_empty());
    }
}
