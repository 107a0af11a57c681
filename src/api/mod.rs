// ==========================================
// 爆破起爆网络 - API 层
// ==========================================
// 职责: 对外提供网络服务，汇总各层错误
// ==========================================

pub mod error;
pub mod network_service;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use network_service::{MutationOp, NetworkService};
