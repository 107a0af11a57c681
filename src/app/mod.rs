// ==========================================
// 爆破起爆网络 - 应用层
// ==========================================
// 职责: 装配数据库、配置、存储与网络服务
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
