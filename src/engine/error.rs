// ==========================================
// 爆破起爆网络 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 非法输入在计算前拒绝，绝不静默修正
// ==========================================

use crate::domain::types::HoleId;
use thiserror::Error;

/// 孔几何错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("孔深必须大于0: hole={hole_id}, depth={depth}")]
    NonPositiveDepth { hole_id: HoleId, depth: f64 },

    #[error("孔径必须大于0: hole={hole_id}, diameter={diameter}")]
    NonPositiveDiameter { hole_id: HoleId, diameter: f64 },

    #[error("堵塞长度不能为负: hole={hole_id}, stemming={stemming}")]
    NegativeStemming { hole_id: HoleId, stemming: f64 },

    #[error("堵塞长度超过孔深: hole={hole_id}, stemming={stemming}, depth={depth}")]
    StemmingExceedsDepth {
        hole_id: HoleId,
        stemming: f64,
        depth: f64,
    },

    #[error("超深不能为负: hole={hole_id}, subdrill={subdrill}")]
    NegativeSubdrill { hole_id: HoleId, subdrill: f64 },

    #[error("孔距/抵抗线不能为负: hole={hole_id}, field={field}, value={value}")]
    NegativePitch {
        hole_id: HoleId,
        field: &'static str,
        value: f64,
    },

    #[error("数值无效 (NaN/Inf): hole={hole_id}, field={field}")]
    NonFiniteValue { hole_id: HoleId, field: &'static str },

    #[error("材料参数无效: {field}={value}")]
    InvalidMaterialParameter { field: &'static str, value: f64 },
}

/// 布孔生成错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("网格行列数必须大于0: rows={rows}, columns={columns}")]
    EmptyGrid { rows: u32, columns: u32 },

    #[error("网格间距无效: {field}={value}")]
    InvalidPitch { field: &'static str, value: f64 },

    #[error("炮孔数量超过上限: requested={requested}, max={max}")]
    TooManyHoles { requested: usize, max: usize },

    #[error("炮孔ID重复: {0}")]
    DuplicateHoleId(HoleId),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
