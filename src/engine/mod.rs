// ==========================================
// 爆破起爆网络 - 引擎层
// ==========================================
// 流水线: 布孔生成 → 拓扑校验 → 时序求解 → 装药计算
// ==========================================
// 职责: 纯计算，不访问数据库，不持有状态
// 红线: 引擎不拼 SQL，失败一律以返回值表达
// ==========================================

pub mod charge_calculator;
pub mod error;
pub mod geometry;
pub mod pattern_generator;
pub mod pipeline;
pub mod solver;
pub mod validator;

// 重导出核心引擎
pub use charge_calculator::{calculate_charges, ChargeCalculator};
pub use error::{GeometryError, PatternError};
pub use geometry::{anchor_to_origin, calculate_grid_pitch, recommended_geometry, GridPitch};
pub use pattern_generator::{
    generate_pattern, CandidateNetwork, DelaySpec, GridSpec, PatternGenerator,
};
pub use pipeline::{NetworkPipeline, PipelineError, PipelineOutput};
pub use solver::{solve, FiringTimeSolver};
pub use validator::{validate, ChildEdge, NetworkValidator, ValidatedNetwork};
