// ==========================================
// 爆破起爆网络 - 布孔与连线生成引擎
// ==========================================
// 输入: 矩形网格参数（或已有孔位） + 延时配置
// 输出: 候选网络（炮孔 + 连接）
// ==========================================
// 连线规则: 蛇形遍历
// - 第 1、3、5… 排自左向右，第 2、4、6… 排自右向左
// - 除首孔外每孔恰有一条来自遍历前驱的入边
// - 排内用孔间延时，跨排用排间延时
// 红线: 候选网络仍需经过校验器才能被接受
// ==========================================

use crate::domain::connection::BlastConnection;
use crate::domain::drill_point::{DrillPoint, HoleGeometry};
use crate::domain::types::{ConnectorKind, HoleId};
use crate::engine::error::PatternError;
use crate::engine::geometry::validate_drill_point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument};

/// 默认炮孔数量上限
pub const DEFAULT_MAX_DRILL_POINTS: usize = 500;

/// 默认分排容差（米）：Y 差值在此范围内视为同一排
pub const DEFAULT_ROW_TOLERANCE: f64 = 0.5;

// ==========================================
// 输入参数
// ==========================================

/// 矩形网格参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub columns: u32,
    /// 孔距（沿 X）
    pub spacing: f64,
    /// 抵抗线（沿 Y，排距）
    pub burden: f64,
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
    /// 孔几何模板（spacing/burden 以网格参数为准）
    #[serde(default)]
    pub template: HoleGeometry,
}

/// 延时配置（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySpec {
    pub hole_delay_ms: u32,
    pub row_delay_ms: u32,
}

impl Default for DelaySpec {
    fn default() -> Self {
        Self {
            hole_delay_ms: 25,
            row_delay_ms: 42,
        }
    }
}

/// 候选网络
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateNetwork {
    pub points: Vec<DrillPoint>,
    pub connections: Vec<BlastConnection>,
    pub starting_hole: Option<HoleId>,
}

// ==========================================
// PatternGenerator - 布孔与连线生成引擎
// ==========================================
pub struct PatternGenerator {
    max_drill_points: usize,
    row_tolerance_m: f64,
}

impl PatternGenerator {
    /// 创建生成引擎
    ///
    /// # 参数
    /// - max_drill_points: 炮孔数量上限
    /// - row_tolerance_m: 已有孔位分排时的 Y 容差
    pub fn new(max_drill_points: usize, row_tolerance_m: f64) -> Self {
        Self {
            max_drill_points,
            row_tolerance_m,
        }
    }

    /// 生成矩形网格并按蛇形连线
    #[instrument(skip(self), fields(rows = grid.rows, columns = grid.columns))]
    pub fn generate_grid(
        &self,
        grid: &GridSpec,
        delays: &DelaySpec,
    ) -> Result<CandidateNetwork, PatternError> {
        if grid.rows == 0 || grid.columns == 0 {
            return Err(PatternError::EmptyGrid {
                rows: grid.rows,
                columns: grid.columns,
            });
        }
        for (field, value) in [("spacing", grid.spacing), ("burden", grid.burden)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PatternError::InvalidPitch { field, value });
            }
        }
        for (field, value) in [("origin_x", grid.origin_x), ("origin_y", grid.origin_y)] {
            if !value.is_finite() {
                return Err(PatternError::InvalidPitch { field, value });
            }
        }

        let requested = grid.rows as usize * grid.columns as usize;
        if requested > self.max_drill_points {
            return Err(PatternError::TooManyHoles {
                requested,
                max: self.max_drill_points,
            });
        }

        let width = id_width(requested);
        let geometry = HoleGeometry {
            spacing: grid.spacing,
            burden: grid.burden,
            ..grid.template
        };

        let mut points = Vec::with_capacity(requested);
        let mut rows: Vec<Vec<HoleId>> = Vec::with_capacity(grid.rows as usize);
        for row in 0..grid.rows {
            let mut row_ids = Vec::with_capacity(grid.columns as usize);
            for col in 0..grid.columns {
                let id = format!("DH{:0width$}", points.len() + 1, width = width);
                let point = DrillPoint::new(
                    id.clone(),
                    grid.origin_x + col as f64 * grid.spacing,
                    grid.origin_y + row as f64 * grid.burden,
                    geometry,
                );
                validate_drill_point(&point)?;
                row_ids.push(id);
                points.push(point);
            }
            rows.push(row_ids);
        }

        let (connections, starting_hole) = connect_snake(&rows, delays);

        info!(
            holes = points.len(),
            connections = connections.len(),
            "网格布孔生成完成"
        );

        Ok(CandidateNetwork {
            points,
            connections,
            starting_hole,
        })
    }

    /// 为已有孔位按蛇形连线
    ///
    /// 分排: 按 Y 升序，与当前排首孔 Y 差值超过容差即开新排；排内按 X 升序
    #[instrument(skip(self, points), fields(count = points.len()))]
    pub fn connect_points(
        &self,
        points: Vec<DrillPoint>,
        delays: &DelaySpec,
    ) -> Result<CandidateNetwork, PatternError> {
        if points.len() > self.max_drill_points {
            return Err(PatternError::TooManyHoles {
                requested: points.len(),
                max: self.max_drill_points,
            });
        }

        let mut seen = HashSet::new();
        for point in &points {
            validate_drill_point(point)?;
            if !seen.insert(point.id.as_str()) {
                return Err(PatternError::DuplicateHoleId(point.id.clone()));
            }
        }

        let rows = self.group_rows(&points);
        let (connections, starting_hole) = connect_snake(&rows, delays);

        info!(
            holes = points.len(),
            rows = rows.len(),
            connections = connections.len(),
            "已有孔位连线生成完成"
        );

        Ok(CandidateNetwork {
            points,
            connections,
            starting_hole,
        })
    }

    /// 按 Y 分排，排内按 X 排序（均以ID兜底保证全序）
    fn group_rows(&self, points: &[DrillPoint]) -> Vec<Vec<HoleId>> {
        let mut ordered: Vec<&DrillPoint> = points.iter().collect();
        ordered.sort_by(|a, b| {
            a.y.total_cmp(&b.y)
                .then(a.x.total_cmp(&b.x))
                .then(a.id.cmp(&b.id))
        });

        let mut rows: Vec<Vec<&DrillPoint>> = Vec::new();
        let mut row_y = f64::NEG_INFINITY;
        for point in ordered {
            match rows.last_mut() {
                Some(row) if (point.y - row_y).abs() <= self.row_tolerance_m => row.push(point),
                _ => {
                    row_y = point.y;
                    rows.push(vec![point]);
                }
            }
        }

        rows.into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));
                row.into_iter().map(|p| p.id.clone()).collect()
            })
            .collect()
    }
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DRILL_POINTS, DEFAULT_ROW_TOLERANCE)
    }
}

/// 蛇形连线
///
/// # 参数
/// - rows: 每排自左向右的炮孔ID
///
/// # 返回
/// (连接列表, 起爆孔)
fn connect_snake(rows: &[Vec<HoleId>], delays: &DelaySpec) -> (Vec<BlastConnection>, Option<HoleId>) {
    let total: usize = rows.iter().map(|r| r.len()).sum();
    let width = id_width(total.saturating_sub(1));

    let mut connections = Vec::with_capacity(total.saturating_sub(1));
    let mut previous: Option<&HoleId> = None;
    let mut starting_hole = None;

    for (row_index, row) in rows.iter().enumerate() {
        let traversal: Vec<&HoleId> = if row_index % 2 == 0 {
            row.iter().collect()
        } else {
            row.iter().rev().collect()
        };

        for (position, hole_id) in traversal.into_iter().enumerate() {
            match previous {
                None => starting_hole = Some(hole_id.clone()),
                Some(from) => {
                    let delay_ms = if position == 0 {
                        delays.row_delay_ms
                    } else {
                        delays.hole_delay_ms
                    };
                    connections.push(BlastConnection::new(
                        format!("BC{:0width$}", connections.len() + 1, width = width),
                        from.clone(),
                        hole_id.clone(),
                        ConnectorKind::DetonatingCord,
                        delay_ms,
                    ));
                }
            }
            previous = Some(hole_id);
        }
    }

    (connections, starting_hole)
}

/// ID 序号位数（至少 3 位，保证字典序与生成顺序一致）
fn id_width(count: usize) -> usize {
    count.max(1).to_string().len().max(3)
}

/// 生成矩形网格候选网络（无状态便捷函数，使用默认上限）
pub fn generate_pattern(grid: &GridSpec, delays: &DelaySpec) -> Result<CandidateNetwork, PatternError> {
    PatternGenerator::default().generate_grid(grid, delays)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: u32, columns: u32) -> GridSpec {
        GridSpec {
            rows,
            columns,
            spacing: 3.0,
            burden: 2.5,
            origin_x: 0.0,
            origin_y: 0.0,
            template: HoleGeometry::default(),
        }
    }

    fn edges(candidate: &CandidateNetwork) -> Vec<(&str, &str, u32)> {
        candidate
            .connections
            .iter()
            .map(|c| (c.from_hole_id.as_str(), c.to_hole_id.as_str(), c.delay_ms))
            .collect()
    }

    #[test]
    fn test_grid_layout_row_major() {
        let candidate = generate_pattern(&grid(2, 3), &DelaySpec::default()).unwrap();
        let ids: Vec<&str> = candidate.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["DH001", "DH002", "DH003", "DH004", "DH005", "DH006"]);

        let p5 = &candidate.points[4];
        assert_eq!((p5.x, p5.y), (3.0, 2.5));
        assert_eq!((p5.spacing, p5.burden), (3.0, 2.5));
    }

    #[test]
    fn test_snake_connections_3x3() {
        let delays = DelaySpec {
            hole_delay_ms: 10,
            row_delay_ms: 25,
        };
        let candidate = generate_pattern(&grid(3, 3), &delays).unwrap();

        assert_eq!(candidate.starting_hole.as_deref(), Some("DH001"));
        assert_eq!(
            edges(&candidate),
            vec![
                ("DH001", "DH002", 10),
                ("DH002", "DH003", 10),
                ("DH003", "DH006", 25),
                ("DH006", "DH005", 10),
                ("DH005", "DH004", 10),
                ("DH004", "DH007", 25),
                ("DH007", "DH008", 10),
                ("DH008", "DH009", 10),
            ]
        );
    }

    #[test]
    fn test_every_hole_but_first_has_one_parent() {
        let candidate = generate_pattern(&grid(4, 5), &DelaySpec::default()).unwrap();
        assert_eq!(candidate.connections.len(), 19);

        let mut targets: Vec<&str> = candidate
            .connections
            .iter()
            .map(|c| c.to_hole_id.as_str())
            .collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), 19);
        assert!(!targets.contains(&"DH001"));
    }

    #[test]
    fn test_grid_rejects_bad_input() {
        assert_eq!(
            generate_pattern(&grid(0, 3), &DelaySpec::default()).unwrap_err(),
            PatternError::EmptyGrid { rows: 0, columns: 3 }
        );

        let mut bad = grid(2, 2);
        bad.spacing = 0.0;
        assert!(matches!(
            generate_pattern(&bad, &DelaySpec::default()),
            Err(PatternError::InvalidPitch { field: "spacing", .. })
        ));

        let generator = PatternGenerator::new(10, DEFAULT_ROW_TOLERANCE);
        assert_eq!(
            generator.generate_grid(&grid(4, 4), &DelaySpec::default()).unwrap_err(),
            PatternError::TooManyHoles { requested: 16, max: 10 }
        );
    }

    #[test]
    fn test_grid_rejects_bad_template() {
        let mut bad = grid(2, 2);
        bad.template.depth = -1.0;
        assert!(matches!(
            generate_pattern(&bad, &DelaySpec::default()),
            Err(PatternError::Geometry(_))
        ));
    }

    #[test]
    fn test_connect_existing_points_groups_rows() {
        // 第二排 Y 有轻微抖动，且输入顺序打乱
        let g = HoleGeometry::default();
        let points = vec![
            DrillPoint::new("E", 3.0, 2.6, g),
            DrillPoint::new("A", 0.0, 0.0, g),
            DrillPoint::new("D", 0.0, 2.4, g),
            DrillPoint::new("B", 3.0, 0.1, g),
        ];
        let delays = DelaySpec {
            hole_delay_ms: 17,
            row_delay_ms: 42,
        };
        let candidate = PatternGenerator::default()
            .connect_points(points, &delays)
            .unwrap();

        assert_eq!(candidate.starting_hole.as_deref(), Some("A"));
        assert_eq!(
            edges(&candidate),
            vec![("A", "B", 17), ("B", "E", 42), ("E", "D", 17)]
        );
    }

    #[test]
    fn test_connect_points_rejects_duplicate_ids() {
        let g = HoleGeometry::default();
        let points = vec![
            DrillPoint::new("A", 0.0, 0.0, g),
            DrillPoint::new("A", 3.0, 0.0, g),
        ];
        assert_eq!(
            PatternGenerator::default()
                .connect_points(points, &DelaySpec::default())
                .unwrap_err(),
            PatternError::DuplicateHoleId("A".to_string())
        );
    }

    #[test]
    fn test_connect_empty_points() {
        let candidate = PatternGenerator::default()
            .connect_points(Vec::new(), &DelaySpec::default())
            .unwrap();
        assert!(candidate.points.is_empty());
        assert!(candidate.connections.is_empty());
        assert!(candidate.starting_hole.is_none());
    }
}
