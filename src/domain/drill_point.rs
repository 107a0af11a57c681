// ==========================================
// 爆破起爆网络 - 炮孔领域模型
// ==========================================
// 红线: 只是值记录，不保存对其他实体的引用（邻接关系每次重建）
// 对齐: drill_point 表
// ==========================================

use crate::domain::types::HoleId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// DrillPoint - 设计炮孔
// ==========================================
// 单位: 米
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillPoint {
    pub id: HoleId,

    // ===== 平面位置 =====
    pub x: f64,
    pub y: f64,

    // ===== 孔几何 =====
    pub depth: f64,    // 孔深
    pub diameter: f64, // 孔径
    pub burden: f64,   // 抵抗线
    pub spacing: f64,  // 孔距
    pub stemming: f64, // 堵塞长度
    pub subdrill: f64, // 超深

    // ===== 施工状态 =====
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
}

impl DrillPoint {
    /// 创建未完成的炮孔
    pub fn new(id: impl Into<HoleId>, x: f64, y: f64, geometry: HoleGeometry) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            depth: geometry.depth,
            diameter: geometry.diameter,
            burden: geometry.burden,
            spacing: geometry.spacing,
            stemming: geometry.stemming,
            subdrill: geometry.subdrill,
            is_completed: false,
            completed_at: None,
        }
    }

    /// 提取几何参数
    pub fn geometry(&self) -> HoleGeometry {
        HoleGeometry {
            depth: self.depth,
            diameter: self.diameter,
            burden: self.burden,
            spacing: self.spacing,
            stemming: self.stemming,
            subdrill: self.subdrill,
        }
    }

    /// 覆盖几何参数（位置与施工状态不变）
    pub fn with_geometry(mut self, geometry: HoleGeometry) -> Self {
        self.depth = geometry.depth;
        self.diameter = geometry.diameter;
        self.burden = geometry.burden;
        self.spacing = geometry.spacing;
        self.stemming = geometry.stemming;
        self.subdrill = geometry.subdrill;
        self
    }
}

// ==========================================
// HoleGeometry - 孔几何参数
// ==========================================
// 装药计算与图形生成共用的几何值对象
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoleGeometry {
    pub depth: f64,
    pub diameter: f64,
    pub burden: f64,
    pub spacing: f64,
    pub stemming: f64,
    pub subdrill: f64,
}

impl Default for HoleGeometry {
    fn default() -> Self {
        Self {
            depth: 10.0,
            diameter: 0.115,
            burden: 2.5,
            spacing: 3.0,
            stemming: 2.5,
            subdrill: 0.5,
        }
    }
}
