// ==========================================
// 爆破起爆网络 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态
// 启动顺序: 打开数据库 → 建表 → 加载配置 → 构建存储与服务
// ==========================================

use crate::api::NetworkService;
use crate::config::{ConfigManager, NetworkSettings};
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{NetworkStore, SqliteNetworkStore};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "BLAST_NETWORK_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器（可在运行期覆写配置）
    pub config_manager: Arc<ConfigManager>,

    /// 网络服务
    pub network_service: Arc<NetworkService>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = NetworkSettings::load(config_manager.as_ref()).await;

        let store: Arc<dyn NetworkStore> = Arc::new(SqliteNetworkStore::from_connection(conn));
        let network_service = Arc::new(NetworkService::new(store, settings));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config_manager,
            network_service,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 BLAST_NETWORK_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./blast_network.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("blast-network");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("blast_network.db");
        }
    }

    path.to_string_lossy().to_string()
}
