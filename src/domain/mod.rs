// ==========================================
// 爆破起爆网络 - 领域模型层
// ==========================================
// 职责: 定义炮孔、连接、装药、时序等值类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod charge;
pub mod connection;
pub mod drill_point;
pub mod network;
pub mod types;
pub mod violation;

// 重导出核心类型
pub use charge::{ChargeAggregate, ChargeResult, HoleCharge, MaterialParams};
pub use connection::{BlastConnection, ConnectionView};
pub use drill_point::{DrillPoint, HoleGeometry};
pub use network::{BlastMetrics, FiringSchedule, HoleTiming, Network, NetworkView};
pub use types::{ConnectionId, ConnectorKind, HoleId, SiteKey, StartingHolePolicy};
pub use violation::{TopologyViolation, ViolationKind};
