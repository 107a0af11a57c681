// ==========================================
// 爆破起爆网络 - 孔位几何规则
// ==========================================
// 职责: 坐标/几何校验、孔网参数估算、原点平移、经验设计值
// 红线: 纯函数，不持有状态
// ==========================================

use crate::domain::drill_point::{DrillPoint, HoleGeometry};
use crate::engine::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 坐标重合判定精度（米）
pub const COORDINATE_PRECISION: f64 = 0.01;

/// 孔网参数估算时忽略的最小间隔（米）
pub const GRID_PITCH_MIN_THRESHOLD: f64 = 0.5;

/// 众数桶的最低支持率，低于该值时退化为中位数
pub const GRID_PITCH_SUPPORT_THRESHOLD: f64 = 0.10;

/// 无法估算时的默认间距
pub const DEFAULT_PITCH: f64 = 1.0;

/// 标准钻头直径（米）
const STANDARD_DIAMETERS: [f64; 15] = [
    0.089, 0.102, 0.115, 0.127, 0.140, 0.152, 0.165, 0.178, 0.191, 0.203, 0.216, 0.229, 0.254,
    0.279, 0.305,
];

// ==========================================
// 几何校验
// ==========================================

/// 校验装药计算所需的几何参数
///
/// # 规则
/// - 所有数值必须有限
/// - depth > 0, diameter > 0
/// - stemming >= 0, subdrill >= 0
///
/// 堵塞长度超过孔深不在此报错，装药柱长度按 0 处理
pub fn validate_charge_geometry(hole_id: &str, g: &HoleGeometry) -> Result<(), GeometryError> {
    for (field, value) in [
        ("depth", g.depth),
        ("diameter", g.diameter),
        ("stemming", g.stemming),
        ("subdrill", g.subdrill),
    ] {
        if !value.is_finite() {
            return Err(GeometryError::NonFiniteValue {
                hole_id: hole_id.to_string(),
                field,
            });
        }
    }

    if g.depth <= 0.0 {
        return Err(GeometryError::NonPositiveDepth {
            hole_id: hole_id.to_string(),
            depth: g.depth,
        });
    }
    if g.diameter <= 0.0 {
        return Err(GeometryError::NonPositiveDiameter {
            hole_id: hole_id.to_string(),
            diameter: g.diameter,
        });
    }
    if g.stemming < 0.0 {
        return Err(GeometryError::NegativeStemming {
            hole_id: hole_id.to_string(),
            stemming: g.stemming,
        });
    }
    if g.subdrill < 0.0 {
        return Err(GeometryError::NegativeSubdrill {
            hole_id: hole_id.to_string(),
            subdrill: g.subdrill,
        });
    }

    Ok(())
}

/// 校验一个完整炮孔（编排器写入前调用）
///
/// 在 validate_charge_geometry 基础上追加:
/// - 坐标有限
/// - stemming <= depth
/// - burden/spacing 有限且非负
pub fn validate_drill_point(point: &DrillPoint) -> Result<(), GeometryError> {
    for (field, value) in [("x", point.x), ("y", point.y)] {
        if !value.is_finite() {
            return Err(GeometryError::NonFiniteValue {
                hole_id: point.id.clone(),
                field,
            });
        }
    }

    let g = point.geometry();
    validate_charge_geometry(&point.id, &g)?;

    if g.stemming > g.depth {
        return Err(GeometryError::StemmingExceedsDepth {
            hole_id: point.id.clone(),
            stemming: g.stemming,
            depth: g.depth,
        });
    }

    for (field, value) in [("burden", g.burden), ("spacing", g.spacing)] {
        if !value.is_finite() {
            return Err(GeometryError::NonFiniteValue {
                hole_id: point.id.clone(),
                field,
            });
        }
        if value < 0.0 {
            return Err(GeometryError::NegativePitch {
                hole_id: point.id.clone(),
                field,
                value,
            });
        }
    }

    Ok(())
}

/// 坐标是否有效（非 NaN/Inf）
pub fn validate_coordinates(x: f64, y: f64) -> bool {
    x.is_finite() && y.is_finite()
}

/// 查找与 (x, y) 在精度内重合的炮孔
///
/// `exclude_id` 用于移动炮孔时排除自身
pub fn find_coincident<'a>(
    x: f64,
    y: f64,
    points: &'a [DrillPoint],
    tolerance: f64,
    exclude_id: Option<&str>,
) -> Option<&'a DrillPoint> {
    points.iter().find(|p| {
        exclude_id.map_or(true, |id| p.id != id)
            && (p.x - x).abs() < tolerance
            && (p.y - y).abs() < tolerance
    })
}

// ==========================================
// 孔网参数估算
// ==========================================

/// 孔网参数（孔距沿 X，抵抗线沿 Y）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPitch {
    pub spacing: f64,
    pub burden: f64,
}

/// 由现有孔位估算孔距与抵抗线
pub fn calculate_grid_pitch(points: &[DrillPoint]) -> GridPitch {
    GridPitch {
        spacing: estimate_pitch(points.iter().map(|p| p.x)),
        burden: estimate_pitch(points.iter().map(|p| p.y)),
    }
}

/// 单轴间距估算
///
/// 1. 坐标排序后取相邻差值（保留 3 位小数），忽略 < 0.5m 的差值（同一排内抖动）
/// 2. 差值按 0.1m 分桶，取频次最高的桶
/// 3. 支持率不足时退化为差值中位数
fn estimate_pitch(coordinates: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = coordinates.collect();
    if sorted.len() < 2 {
        return DEFAULT_PITCH;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut deltas: Vec<f64> = sorted
        .windows(2)
        .map(|w| round_to(w[1] - w[0], 3))
        .filter(|d| *d >= GRID_PITCH_MIN_THRESHOLD)
        .collect();

    if deltas.is_empty() {
        return DEFAULT_PITCH;
    }

    // 桶键用整数（0.1m 为单位），首次出现顺序决定并列时的胜者
    let mut frequency: HashMap<i64, usize> = HashMap::new();
    let mut first_seen: Vec<i64> = Vec::new();
    for delta in &deltas {
        let bucket = (delta * 10.0).round() as i64;
        let count = frequency.entry(bucket).or_insert(0);
        if *count == 0 {
            first_seen.push(bucket);
        }
        *count += 1;
    }

    let mut top_bucket = first_seen[0];
    let mut top_count = frequency[&top_bucket];
    for bucket in first_seen.iter().skip(1) {
        let count = frequency[bucket];
        if count > top_count {
            top_bucket = *bucket;
            top_count = count;
        }
    }

    let support = top_count as f64 / deltas.len() as f64;
    if support >= GRID_PITCH_SUPPORT_THRESHOLD {
        return top_bucket as f64 / 10.0;
    }

    deltas.sort_by(|a, b| a.total_cmp(b));
    round_to(deltas[deltas.len() / 2], 1)
}

// ==========================================
// 原点平移
// ==========================================

/// 平移所有孔位，使最小 X/Y 落在 (0, 0)，坐标保留 2 位小数
pub fn anchor_to_origin(points: &[DrillPoint]) -> Vec<DrillPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    points
        .iter()
        .map(|p| DrillPoint {
            x: round_to(p.x - min_x, 2),
            y: round_to(p.y - min_y, 2),
            ..p.clone()
        })
        .collect()
}

// ==========================================
// 经验设计值
// ==========================================

/// 推荐堵塞长度
///
/// 取 max(25% 孔深, 抵抗线)，限制在
/// [max(1.0, 0.8×抵抗线), min(40% 孔深, 8.0)] 内，保留 1 位小数
pub fn calculate_optimal_stemming(depth: f64, burden: f64) -> f64 {
    let optimal = (depth * 0.25).max(burden);
    let min_stemming = (burden * 0.8).max(1.0);
    let max_stemming = (depth * 0.4).min(8.0);

    round_to(min_stemming.max(optimal.min(max_stemming)), 1)
}

/// 推荐孔径：取 max(抵抗线/35, √(抵抗线×孔距)/20) 最接近的标准钻头
pub fn calculate_optimal_diameter(burden: f64, spacing: f64) -> f64 {
    let by_burden = burden / 35.0;
    let by_area = (burden * spacing).max(0.0).sqrt() / 20.0;
    let target = by_burden.max(by_area);

    STANDARD_DIAMETERS
        .iter()
        .copied()
        .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
        .unwrap_or(STANDARD_DIAMETERS[0])
}

/// 以模板的孔深、抵抗线、孔距为准，给出推荐堵塞长度与孔径
pub fn recommended_geometry(template: &HoleGeometry) -> HoleGeometry {
    HoleGeometry {
        stemming: calculate_optimal_stemming(template.depth, template.burden),
        diameter: calculate_optimal_diameter(template.burden, template.spacing),
        ..*template
    }
}

/// 四舍五入到指定小数位
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, x: f64, y: f64) -> DrillPoint {
        DrillPoint::new(id, x, y, HoleGeometry::default())
    }

    #[test]
    fn test_charge_geometry_rejects_non_positive_depth() {
        let g = HoleGeometry {
            depth: 0.0,
            ..HoleGeometry::default()
        };
        let err = validate_charge_geometry("DH1", &g).unwrap_err();
        assert!(matches!(err, GeometryError::NonPositiveDepth { .. }));
    }

    #[test]
    fn test_charge_geometry_rejects_nan() {
        let g = HoleGeometry {
            diameter: f64::NAN,
            ..HoleGeometry::default()
        };
        let err = validate_charge_geometry("DH1", &g).unwrap_err();
        assert_eq!(
            err,
            GeometryError::NonFiniteValue {
                hole_id: "DH1".to_string(),
                field: "diameter"
            }
        );
    }

    #[test]
    fn test_charge_geometry_allows_stemming_beyond_depth() {
        // 装药计算时按未装药处理，不报错
        let g = HoleGeometry {
            depth: 2.0,
            stemming: 3.0,
            ..HoleGeometry::default()
        };
        assert!(validate_charge_geometry("DH1", &g).is_ok());
    }

    #[test]
    fn test_drill_point_rejects_stemming_beyond_depth() {
        let mut p = point("DH1", 0.0, 0.0);
        p.depth = 2.0;
        p.stemming = 3.0;
        assert!(matches!(
            validate_drill_point(&p),
            Err(GeometryError::StemmingExceedsDepth { .. })
        ));
    }

    #[test]
    fn test_drill_point_rejects_infinite_coordinate() {
        let p = point("DH1", f64::INFINITY, 0.0);
        assert!(matches!(
            validate_drill_point(&p),
            Err(GeometryError::NonFiniteValue { field: "x", .. })
        ));
    }

    #[test]
    fn test_find_coincident_respects_tolerance_and_exclusion() {
        let points = vec![point("A", 0.0, 0.0), point("B", 3.0, 0.0)];
        assert_eq!(
            find_coincident(3.005, 0.004, &points, COORDINATE_PRECISION, None).map(|p| p.id.as_str()),
            Some("B")
        );
        assert!(find_coincident(3.005, 0.0, &points, COORDINATE_PRECISION, Some("B")).is_none());
        assert!(find_coincident(3.02, 0.0, &points, COORDINATE_PRECISION, None).is_none());
    }

    #[test]
    fn test_grid_pitch_from_regular_grid() {
        let mut points = Vec::new();
        for row in 0..3 {
            for col in 0..4 {
                points.push(point(
                    &format!("R{}C{}", row, col),
                    col as f64 * 3.0,
                    row as f64 * 2.5,
                ));
            }
        }
        let pitch = calculate_grid_pitch(&points);
        assert_eq!(pitch.spacing, 3.0);
        assert_eq!(pitch.burden, 2.5);
    }

    #[test]
    fn test_grid_pitch_defaults_for_single_point() {
        let pitch = calculate_grid_pitch(&[point("A", 5.0, 5.0)]);
        assert_eq!(pitch, GridPitch { spacing: DEFAULT_PITCH, burden: DEFAULT_PITCH });
    }

    #[test]
    fn test_grid_pitch_ignores_jitter() {
        // 同排孔 Y 轻微抖动，不应被识别为抵抗线
        let points = vec![
            point("A", 0.0, 0.0),
            point("B", 3.0, 0.1),
            point("C", 6.0, 0.05),
        ];
        let pitch = calculate_grid_pitch(&points);
        assert_eq!(pitch.spacing, 3.0);
        assert_eq!(pitch.burden, DEFAULT_PITCH);
    }

    #[test]
    fn test_anchor_to_origin() {
        let points = vec![point("A", 10.0, 20.0), point("B", 13.333, 22.5)];
        let anchored = anchor_to_origin(&points);
        assert_eq!((anchored[0].x, anchored[0].y), (0.0, 0.0));
        assert_eq!((anchored[1].x, anchored[1].y), (3.33, 2.5));
        assert_eq!(anchored[1].id, "B");
    }

    #[test]
    fn test_optimal_stemming_bounds() {
        // 25% × 12 = 3.0 > 抵抗线 2.5，在 [2.0, 4.8] 内
        assert_eq!(calculate_optimal_stemming(12.0, 2.5), 3.0);
        // 深孔受 8.0 上限约束
        assert_eq!(calculate_optimal_stemming(40.0, 3.0), 8.0);
        // 浅孔: 上限 0.4×2=0.8 小于下限 1.0，取下限
        assert_eq!(calculate_optimal_stemming(2.0, 0.5), 1.0);
    }

    #[test]
    fn test_optimal_diameter_picks_standard_size() {
        // max(3.5/35=0.1, √(3.5×4)/20≈0.187) → 0.191
        assert_eq!(calculate_optimal_diameter(3.5, 4.0), 0.191);
        assert_eq!(calculate_optimal_diameter(0.1, 0.1), 0.089);
    }

    #[test]
    fn test_recommended_geometry_keeps_depth_and_pitch() {
        let template = HoleGeometry {
            depth: 12.0,
            burden: 3.5,
            spacing: 4.0,
            ..HoleGeometry::default()
        };
        let recommended = recommended_geometry(&template);
        assert_eq!(recommended.stemming, 3.5);
        assert_eq!(recommended.diameter, 0.191);
        assert_eq!(recommended.depth, 12.0);
        assert_eq!(recommended.subdrill, template.subdrill);
        assert_eq!((recommended.burden, recommended.spacing), (3.5, 4.0));
    }
}
