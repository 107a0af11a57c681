// ==========================================
// 爆破起爆网络 - 配置层
// ==========================================
// 职责: 系统配置读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod network_config_trait;
pub mod settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use network_config_trait::{ConfigResult, NetworkConfigReader};
pub use settings::NetworkSettings;
