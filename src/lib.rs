// ==========================================
// 爆破起爆网络与装药计算引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 流水线: 布孔生成 → 拓扑校验 → 时序求解 → 装药计算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 纯计算
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 网络服务
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    BlastConnection, BlastMetrics, ChargeAggregate, ChargeResult, ConnectionView, ConnectorKind,
    DrillPoint, FiringSchedule, HoleCharge, HoleGeometry, HoleTiming, MaterialParams, Network,
    NetworkView, SiteKey, StartingHolePolicy, TopologyViolation, ViolationKind,
};

// 引擎
pub use engine::{
    calculate_charges, generate_pattern, solve, validate, CandidateNetwork, DelaySpec,
    GeometryError, GridSpec, NetworkPipeline, PatternError, ValidatedNetwork,
};

// API
pub use api::{ApiError, ApiResult, MutationOp, NetworkService};

// 存储
pub use repository::{NetworkStore, SqliteNetworkStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "爆破起爆网络与装药计算引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
