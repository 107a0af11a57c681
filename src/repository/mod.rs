// ==========================================
// 爆破起爆网络 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod blast_connection_repo;
pub mod drill_point_repo;
pub mod error;
pub mod network_store;

// 重导出核心仓储
pub use blast_connection_repo::BlastConnectionRepository;
pub use drill_point_repo::DrillPointRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use network_store::{MemoryNetworkStore, NetworkStore, SqliteNetworkStore};
