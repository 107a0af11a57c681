// ==========================================
// 爆破起爆网络 - 计算流水线
// ==========================================
// 用途: 协调三个核心引擎的执行顺序
// 1. 几何 + 拓扑校验
// 2. 起爆时序求解
// 3. 装药计算
// ==========================================
// 红线: 任一步失败即整体失败，不产出部分结果
// ==========================================

use crate::domain::charge::{ChargeResult, MaterialParams};
use crate::domain::connection::ConnectionView;
use crate::domain::drill_point::DrillPoint;
use crate::domain::network::{FiringSchedule, Network};
use crate::domain::types::StartingHolePolicy;
use crate::domain::violation::TopologyViolation;
use crate::engine::error::GeometryError;
use crate::engine::geometry::validate_drill_point;
use crate::engine::{ChargeCalculator, FiringTimeSolver, NetworkValidator};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

// ==========================================
// PipelineOutput - 流水线结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// 按炮孔ID升序
    pub points: Vec<DrillPoint>,
    /// 按 (序号, 连接ID) 升序
    pub connections: Vec<ConnectionView>,
    pub schedule: FiringSchedule,
    pub charges: ChargeResult,
    pub component_count: usize,
}

/// 流水线错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("网络拓扑校验失败: {} 项违规", .0.len())]
    Topology(Vec<TopologyViolation>),
}

// ==========================================
// NetworkPipeline - 计算流水线
// ==========================================
pub struct NetworkPipeline {
    validator: NetworkValidator,
    solver: FiringTimeSolver,
    calculator: ChargeCalculator,
}

impl NetworkPipeline {
    pub fn new() -> Self {
        Self {
            validator: NetworkValidator::new(),
            solver: FiringTimeSolver::new(),
            calculator: ChargeCalculator::new(),
        }
    }

    /// 执行完整流水线
    #[instrument(skip(self, network, params), fields(
        holes = network.points.len(),
        connections = network.connections.len()
    ))]
    pub fn run(
        &self,
        network: &Network,
        policy: StartingHolePolicy,
        params: &MaterialParams,
    ) -> Result<PipelineOutput, PipelineError> {
        // ===== Step 1: 几何 + 拓扑校验 =====
        for point in &network.points {
            validate_drill_point(point)?;
        }
        let validated = self
            .validator
            .validate(network, policy)
            .map_err(PipelineError::Topology)?;
        debug!(roots = validated.roots().len(), "Step 1 完成: 校验通过");

        // ===== Step 2: 起爆时序 =====
        let schedule = self.solver.solve(&validated);
        debug!(
            total_duration_ms = schedule.metrics.total_duration_ms,
            "Step 2 完成: 时序求解"
        );

        // ===== Step 3: 装药 =====
        let charges = self.calculator.calculate(&network.points, params)?;
        debug!(
            filled = charges.aggregate.number_of_filled_holes,
            "Step 3 完成: 装药计算"
        );

        let output = PipelineOutput {
            points: sorted_points(network),
            connections: connection_views(network, &schedule),
            component_count: validated.component_count(),
            schedule,
            charges,
        };

        info!(
            holes = output.points.len(),
            components = output.component_count,
            "流水线执行完成"
        );
        Ok(output)
    }

    /// 检视已持久化网络: 违规不拒绝，随结果返回
    ///
    /// 拓扑不合法时时序为空；几何不合法时装药为空
    #[instrument(skip(self, network, params), fields(holes = network.points.len()))]
    pub fn inspect(
        &self,
        network: &Network,
        policy: StartingHolePolicy,
        params: &MaterialParams,
    ) -> (PipelineOutput, Vec<TopologyViolation>) {
        let (schedule, component_count, violations) = match self.validator.validate(network, policy) {
            Ok(validated) => (self.solver.solve(&validated), validated.component_count(), Vec::new()),
            Err(violations) => {
                warn!(violations = violations.len(), "已持久化网络未通过拓扑校验");
                (FiringSchedule::default(), 0, violations)
            }
        };

        let charges = self
            .calculator
            .calculate(&network.points, params)
            .unwrap_or_else(|e| {
                warn!(error = %e, "已持久化网络装药计算失败");
                ChargeResult::default()
            });

        let output = PipelineOutput {
            points: sorted_points(network),
            connections: connection_views(network, &schedule),
            component_count,
            schedule,
            charges,
        };
        (output, violations)
    }

    /// 仅重算装药（拓扑与时序不变）
    pub fn recalculate_charges(
        &self,
        points: &[DrillPoint],
        params: &MaterialParams,
    ) -> Result<ChargeResult, GeometryError> {
        self.calculator.calculate(points, params)
    }
}

impl Default for NetworkPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// 炮孔按ID升序
pub fn sorted_points(network: &Network) -> Vec<DrillPoint> {
    let mut points = network.points.clone();
    points.sort_by(|a, b| a.id.cmp(&b.id));
    points
}

/// 连接派生信息: 序号、目标孔起爆时刻取自目标孔，起爆孔标记取自源孔
///
/// 时序为空（未通过校验的网络）时派生字段为 0/false
pub fn connection_views(network: &Network, schedule: &FiringSchedule) -> Vec<ConnectionView> {
    let mut views: Vec<ConnectionView> = network
        .connections
        .iter()
        .map(|conn| {
            let target = schedule.timing(&conn.to_hole_id);
            ConnectionView {
                connection: conn.clone(),
                sequence: target.map(|t| t.sequence_number).unwrap_or(0),
                target_firing_time_ms: target.map(|t| t.firing_time_ms).unwrap_or(0),
                is_starting_hole: schedule
                    .timing(&conn.from_hole_id)
                    .map(|t| t.is_starting_hole)
                    .unwrap_or(false),
            }
        })
        .collect();
    views.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then_with(|| a.connection.id.cmp(&b.connection.id))
    });
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::BlastConnection;
    use crate::domain::drill_point::HoleGeometry;
    use crate::domain::types::ConnectorKind;
    use crate::domain::violation::ViolationKind;
    use crate::engine::pattern_generator::{generate_pattern, DelaySpec, GridSpec};

    fn grid_network(rows: u32, columns: u32) -> Network {
        let grid = GridSpec {
            rows,
            columns,
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
        Network::new(candidate.points, candidate.connections)
    }

    #[test]
    fn test_pipeline_produces_consistent_output() {
        let pipeline = NetworkPipeline::new();
        let output = pipeline
            .run(
                &grid_network(2, 3),
                StartingHolePolicy::SingleInitiation,
                &MaterialParams::default(),
            )
            .unwrap();

        assert_eq!(output.points.len(), 6);
        assert_eq!(output.component_count, 1);
        assert_eq!(output.charges.holes.len(), 6);

        let first = &output.connections[0];
        assert_eq!(first.connection.from_hole_id, "DH001");
        assert_eq!(first.sequence, 2);
        assert_eq!(first.target_firing_time_ms, 10);
        assert!(first.is_starting_hole);
        assert!(!output.connections[1].is_starting_hole);

        let sequences: Vec<u32> = output.connections.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_pipeline_rejects_topology() {
        let mut network = grid_network(1, 3);
        network.connections[1].to_hole_id = "DH001".to_string();

        let err = NetworkPipeline::new()
            .run(&network, StartingHolePolicy::default(), &MaterialParams::default())
            .unwrap_err();
        match err {
            PipelineError::Topology(violations) => {
                assert!(violations
                    .iter()
                    .any(|v| v.kind() == ViolationKind::CycleDetected));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_rejects_geometry_before_topology() {
        let mut network = grid_network(1, 2);
        network.points[1].stemming = 20.0;
        network.connections.clear();
        network.connections.push(BlastConnection::new(
            "loop",
            "DH001",
            "DH001",
            ConnectorKind::Connector,
            0,
        ));

        let err = NetworkPipeline::new()
            .run(&network, StartingHolePolicy::default(), &MaterialParams::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Geometry(GeometryError::StemmingExceedsDepth { .. })
        ));
    }

    #[test]
    fn test_connection_views_without_schedule() {
        let network = grid_network(1, 2);
        let views = connection_views(&network, &FiringSchedule::default());
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].sequence, 0);
        assert!(!views[0].is_starting_hole);
    }

    #[test]
    fn test_inspect_reports_instead_of_rejecting() {
        let mut network = grid_network(1, 3);
        network.connections[1].to_hole_id = "DH001".to_string();
        network.points[2].diameter = 0.0;

        let (output, violations) = NetworkPipeline::new().inspect(
            &network,
            StartingHolePolicy::default(),
            &MaterialParams::default(),
        );
        assert!(!violations.is_empty());
        assert!(output.schedule.is_empty());
        assert_eq!(output.component_count, 0);
        assert!(output.charges.holes.is_empty());
        assert_eq!(output.points.len(), 3);
        assert_eq!(output.connections.len(), 2);
    }
}
