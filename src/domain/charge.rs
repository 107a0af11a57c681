// ==========================================
// 爆破起爆网络 - 装药领域模型
// ==========================================
// 派生数据: 任何时候都可由炮孔几何 + 材料参数重新计算
// 红线: 不作为独立事实持久化
// ==========================================

use crate::domain::types::HoleId;
use serde::{Deserialize, Serialize};

// ==========================================
// MaterialParams - 炸药材料参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    pub anfo_density_kg_m3: f64,     // 铵油炸药密度
    pub emulsion_density_kg_m3: f64, // 乳化炸药密度
    pub emulsion_per_hole_m: f64,    // 每孔乳化炸药装填长度（自孔底起）
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            anfo_density_kg_m3: 800.0,
            emulsion_density_kg_m3: 1200.0,
            emulsion_per_hole_m: 1.0,
        }
    }
}

// ==========================================
// HoleCharge - 单孔装药
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleCharge {
    pub hole_id: HoleId,

    // ===== 装药柱长度 (m) =====
    pub column_length_m: f64,
    pub emulsion_length_m: f64, // 乳化炸药覆盖长度
    pub anfo_length_m: f64,     // 剩余长度，由铵油填充

    // ===== 体积 (m³) =====
    pub emulsion_volume_m3: f64,
    pub anfo_volume_m3: f64,
    pub volume_m3: f64,

    // ===== 质量 (kg) =====
    pub emulsion_mass_kg: f64,
    pub anfo_mass_kg: f64,

    // ===== 线装药密度 (kg/m) =====
    pub emulsion_per_meter_kg: f64,
    pub anfo_per_meter_kg: f64,

    /// 炸药单耗 (kg/m³ 岩石)，岩石体积为 0 时记 0
    pub powder_factor_kg_m3: f64,

    /// 装药柱长度 > 0
    pub is_filled: bool,
}

impl HoleCharge {
    /// 单孔炸药总质量
    pub fn total_mass_kg(&self) -> f64 {
        self.anfo_mass_kg + self.emulsion_mass_kg
    }
}

// ==========================================
// ChargeAggregate - 站点汇总
// ==========================================
// 仅统计已装药孔
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeAggregate {
    pub total_depth_m: f64,
    pub average_depth_m: f64,
    pub number_of_filled_holes: usize,
    pub total_volume_m3: f64,
    pub total_anfo_kg: f64,
    pub total_emulsion_kg: f64,
    pub total_emulsion_length_m: f64,
    pub total_anfo_length_m: f64,
}

// ==========================================
// ChargeResult - 装药计算结果
// ==========================================
// holes 按炮孔ID升序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeResult {
    pub holes: Vec<HoleCharge>,
    pub aggregate: ChargeAggregate,
}

impl ChargeResult {
    pub fn hole(&self, hole_id: &str) -> Option<&HoleCharge> {
        self.holes.iter().find(|h| h.hole_id == hole_id)
    }
}
