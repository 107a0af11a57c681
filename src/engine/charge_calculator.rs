// ==========================================
// 爆破起爆网络 - 装药计算引擎
// ==========================================
// 输入: 炮孔几何 + 材料参数
// 输出: 单孔装药 + 站点汇总
// ==========================================
// 模型: 炮孔视为圆柱
// - 装药柱 = 孔深 - 堵塞（<= 0 时为未装药孔，不计入汇总，不报错）
// - 乳化炸药自孔底占据固定长度，剩余长度装铵油
// - 体积 = π·(d/2)²·L，质量 = 体积 × 密度
// 红线: 汇总按炮孔ID升序累加，保证结果逐位一致
// ==========================================

use crate::domain::charge::{ChargeAggregate, ChargeResult, HoleCharge, MaterialParams};
use crate::domain::drill_point::DrillPoint;
use crate::engine::error::GeometryError;
use crate::engine::geometry::validate_charge_geometry;
use std::f64::consts::PI;
use tracing::{debug, instrument};

// ==========================================
// ChargeCalculator - 装药计算引擎
// ==========================================
// 无状态，材料参数通过参数传入
pub struct ChargeCalculator {}

impl ChargeCalculator {
    /// 创建新的装药计算引擎
    pub fn new() -> Self {
        Self {}
    }

    /// 校验材料参数（有限且非负）
    pub fn validate_params(&self, params: &MaterialParams) -> Result<(), GeometryError> {
        for (field, value) in [
            ("anfo_density_kg_m3", params.anfo_density_kg_m3),
            ("emulsion_density_kg_m3", params.emulsion_density_kg_m3),
            ("emulsion_per_hole_m", params.emulsion_per_hole_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GeometryError::InvalidMaterialParameter { field, value });
            }
        }
        Ok(())
    }

    /// 计算单孔装药
    ///
    /// # 返回
    /// - Ok(HoleCharge): 装药柱 <= 0 时 is_filled=false，各量为 0
    /// - Err(GeometryError): 几何参数非法
    pub fn calculate_hole(
        &self,
        point: &DrillPoint,
        params: &MaterialParams,
    ) -> Result<HoleCharge, GeometryError> {
        let geometry = point.geometry();
        validate_charge_geometry(&point.id, &geometry)?;

        let radius = geometry.diameter / 2.0;
        let area = PI * radius * radius;

        let column_length_m = (geometry.depth - geometry.stemming).max(0.0);
        let is_filled = column_length_m > 0.0;

        let emulsion_length_m = params.emulsion_per_hole_m.min(column_length_m);
        let anfo_length_m = column_length_m - emulsion_length_m;

        let emulsion_volume_m3 = area * emulsion_length_m;
        let anfo_volume_m3 = area * anfo_length_m;
        let volume_m3 = emulsion_volume_m3 + anfo_volume_m3;

        let emulsion_mass_kg = emulsion_volume_m3 * params.emulsion_density_kg_m3;
        let anfo_mass_kg = anfo_volume_m3 * params.anfo_density_kg_m3;

        let rock_volume_m3 = geometry.burden * geometry.spacing * geometry.depth;
        let powder_factor_kg_m3 = if rock_volume_m3 > 0.0 {
            (emulsion_mass_kg + anfo_mass_kg) / rock_volume_m3
        } else {
            0.0
        };

        Ok(HoleCharge {
            hole_id: point.id.clone(),
            column_length_m,
            emulsion_length_m,
            anfo_length_m,
            emulsion_volume_m3,
            anfo_volume_m3,
            volume_m3,
            emulsion_mass_kg,
            anfo_mass_kg,
            emulsion_per_meter_kg: area * params.emulsion_density_kg_m3,
            anfo_per_meter_kg: area * params.anfo_density_kg_m3,
            powder_factor_kg_m3,
            is_filled,
        })
    }

    /// 计算站点全部炮孔装药及汇总
    ///
    /// 任一炮孔几何非法即整体失败（不做部分计算）
    #[instrument(skip(self, points, params), fields(count = points.len()))]
    pub fn calculate(
        &self,
        points: &[DrillPoint],
        params: &MaterialParams,
    ) -> Result<ChargeResult, GeometryError> {
        self.validate_params(params)?;

        let mut ordered: Vec<&DrillPoint> = points.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let holes = ordered
            .iter()
            .map(|p| self.calculate_hole(p, params))
            .collect::<Result<Vec<_>, _>>()?;

        let mut aggregate = ChargeAggregate::default();
        for (hole, point) in holes.iter().zip(ordered.iter()) {
            if !hole.is_filled {
                continue;
            }
            aggregate.number_of_filled_holes += 1;
            aggregate.total_depth_m += point.depth;
            aggregate.total_volume_m3 += hole.volume_m3;
            aggregate.total_anfo_kg += hole.anfo_mass_kg;
            aggregate.total_emulsion_kg += hole.emulsion_mass_kg;
            aggregate.total_anfo_length_m += hole.anfo_length_m;
            aggregate.total_emulsion_length_m += hole.emulsion_length_m;
        }
        if aggregate.number_of_filled_holes > 0 {
            aggregate.average_depth_m =
                aggregate.total_depth_m / aggregate.number_of_filled_holes as f64;
        }

        debug!(
            filled = aggregate.number_of_filled_holes,
            total_anfo_kg = aggregate.total_anfo_kg,
            total_emulsion_kg = aggregate.total_emulsion_kg,
            "装药计算完成"
        );

        Ok(ChargeResult { holes, aggregate })
    }
}

impl Default for ChargeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// 装药计算入口（无状态便捷函数）
pub fn calculate_charges(
    points: &[DrillPoint],
    params: &MaterialParams,
) -> Result<ChargeResult, GeometryError> {
    ChargeCalculator::new().calculate(points, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drill_point::HoleGeometry;

    fn hole(id: &str, depth: f64, diameter: f64, stemming: f64) -> DrillPoint {
        DrillPoint::new(
            id,
            0.0,
            0.0,
            HoleGeometry {
                depth,
                diameter,
                burden: 2.5,
                spacing: 3.0,
                stemming,
                subdrill: 0.0,
            },
        )
    }

    fn params(emulsion_per_hole_m: f64) -> MaterialParams {
        MaterialParams {
            anfo_density_kg_m3: 800.0,
            emulsion_density_kg_m3: 1200.0,
            emulsion_per_hole_m,
        }
    }

    #[test]
    fn test_single_hole_column_split() {
        // 孔深10，孔径0.1，堵塞2，乳化覆盖3 → 铵油5，乳化3
        let calc = ChargeCalculator::new();
        let p = params(3.0);
        let charge = calc.calculate_hole(&hole("DH1", 10.0, 0.1, 2.0), &p).unwrap();

        assert_eq!(charge.column_length_m, 8.0);
        assert_eq!(charge.emulsion_length_m, 3.0);
        assert_eq!(charge.anfo_length_m, 5.0);

        let area = PI * 0.05 * 0.05;
        let emulsion_volume = area * 3.0;
        let anfo_volume = area * 5.0;
        assert_eq!(charge.emulsion_volume_m3, emulsion_volume);
        assert_eq!(charge.anfo_volume_m3, anfo_volume);
        assert_eq!(charge.emulsion_mass_kg, emulsion_volume * 1200.0);
        assert_eq!(charge.anfo_mass_kg, anfo_volume * 800.0);
        assert!(charge.is_filled);
    }

    #[test]
    fn test_emulsion_longer_than_column() {
        let calc = ChargeCalculator::new();
        let charge = calc
            .calculate_hole(&hole("DH1", 5.0, 0.1, 4.0), &params(3.0))
            .unwrap();
        assert_eq!(charge.emulsion_length_m, 1.0);
        assert_eq!(charge.anfo_length_m, 0.0);
        assert_eq!(charge.anfo_mass_kg, 0.0);
    }

    #[test]
    fn test_stemming_equal_depth_is_unfilled_not_error() {
        let calc = ChargeCalculator::new();
        let points = vec![hole("DH1", 10.0, 0.1, 10.0), hole("DH2", 10.0, 0.1, 2.0)];
        let result = calc.calculate(&points, &params(3.0)).unwrap();

        let unfilled = result.hole("DH1").unwrap();
        assert!(!unfilled.is_filled);
        assert_eq!(unfilled.column_length_m, 0.0);
        assert_eq!(unfilled.volume_m3, 0.0);

        assert_eq!(result.aggregate.number_of_filled_holes, 1);
        assert_eq!(result.aggregate.total_depth_m, 10.0);
        assert_eq!(result.aggregate.average_depth_m, 10.0);
    }

    #[test]
    fn test_invalid_geometry_rejected_before_calculation() {
        let calc = ChargeCalculator::new();
        let points = vec![hole("DH1", 10.0, 0.1, 2.0), hole("DH2", 10.0, 0.0, 2.0)];
        let err = calc.calculate(&points, &params(3.0)).unwrap_err();
        assert_eq!(
            err,
            GeometryError::NonPositiveDiameter {
                hole_id: "DH2".to_string(),
                diameter: 0.0
            }
        );

        let err = calc
            .calculate(&[hole("DH3", 10.0, 0.1, -1.0)], &params(3.0))
            .unwrap_err();
        assert!(matches!(err, GeometryError::NegativeStemming { .. }));
    }

    #[test]
    fn test_invalid_material_params() {
        let calc = ChargeCalculator::new();
        let mut p = params(3.0);
        p.anfo_density_kg_m3 = -1.0;
        assert!(matches!(
            calc.calculate(&[], &p),
            Err(GeometryError::InvalidMaterialParameter { field: "anfo_density_kg_m3", .. })
        ));
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let calc = ChargeCalculator::new();
        let a = vec![
            hole("DH1", 9.7, 0.115, 2.3),
            hole("DH2", 11.1, 0.102, 2.9),
            hole("DH3", 10.4, 0.127, 2.1),
        ];
        let mut b = a.clone();
        b.reverse();

        let ra = calc.calculate(&a, &params(1.5)).unwrap();
        let rb = calc.calculate(&b, &params(1.5)).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(ra.holes[0].hole_id, "DH1");
        assert_eq!(ra.aggregate.number_of_filled_holes, 3);
    }

    #[test]
    fn test_powder_factor() {
        let calc = ChargeCalculator::new();
        let charge = calc
            .calculate_hole(&hole("DH1", 10.0, 0.1, 2.0), &params(3.0))
            .unwrap();
        let rock = 2.5 * 3.0 * 10.0;
        assert_eq!(charge.powder_factor_kg_m3, charge.total_mass_kg() / rock);

        let mut no_pitch = hole("DH2", 10.0, 0.1, 2.0);
        no_pitch.burden = 0.0;
        let charge = calc.calculate_hole(&no_pitch, &params(3.0)).unwrap();
        assert_eq!(charge.powder_factor_kg_m3, 0.0);
    }
}
