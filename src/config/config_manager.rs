// ==========================================
// 爆破起爆网络 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================
// 非法的已存值回退默认值并告警，不中断启动
// ==========================================

use crate::config::network_config_trait::{ConfigResult, NetworkConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::charge::MaterialParams;
use crate::domain::types::StartingHolePolicy;
use crate::engine::pattern_generator::{DelaySpec, DEFAULT_MAX_DRILL_POINTS, DEFAULT_ROW_TOLERANCE};
use crate::engine::geometry::COORDINATE_PRECISION;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置；缺失返回默认值，格式错误或不满足约束时告警并返回默认值
    fn get_parsed<T>(&self, key: &str, default: T, accept: impl Fn(&T) -> bool) -> ConfigResult<T>
    where
        T: FromStr + Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(value) if accept(&value) => Ok(value),
            _ => {
                warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值无效，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

fn is_non_negative(v: &f64) -> bool {
    v.is_finite() && *v >= 0.0
}

fn is_positive(v: &f64) -> bool {
    v.is_finite() && *v > 0.0
}

// ==========================================
// NetworkConfigReader Trait 实现
// ==========================================
#[async_trait]
impl NetworkConfigReader for ConfigManager {
    async fn get_material_params(&self) -> ConfigResult<MaterialParams> {
        let defaults = MaterialParams::default();
        Ok(MaterialParams {
            anfo_density_kg_m3: self.get_parsed(
                config_keys::ANFO_DENSITY,
                defaults.anfo_density_kg_m3,
                is_positive,
            )?,
            emulsion_density_kg_m3: self.get_parsed(
                config_keys::EMULSION_DENSITY,
                defaults.emulsion_density_kg_m3,
                is_positive,
            )?,
            emulsion_per_hole_m: self.get_parsed(
                config_keys::EMULSION_PER_HOLE,
                defaults.emulsion_per_hole_m,
                is_non_negative,
            )?,
        })
    }

    async fn get_max_drill_points(&self) -> ConfigResult<usize> {
        self.get_parsed(
            config_keys::MAX_DRILL_POINTS,
            DEFAULT_MAX_DRILL_POINTS,
            |v| *v > 0,
        )
    }

    async fn get_coordinate_tolerance(&self) -> ConfigResult<f64> {
        self.get_parsed(
            config_keys::COORDINATE_TOLERANCE,
            COORDINATE_PRECISION,
            is_non_negative,
        )
    }

    async fn get_row_tolerance(&self) -> ConfigResult<f64> {
        self.get_parsed(config_keys::ROW_TOLERANCE, DEFAULT_ROW_TOLERANCE, is_non_negative)
    }

    async fn get_starting_hole_policy(&self) -> ConfigResult<StartingHolePolicy> {
        let value = match self.get_config_value(config_keys::STARTING_HOLE_POLICY)? {
            Some(v) => v,
            None => return Ok(StartingHolePolicy::default()),
        };

        match StartingHolePolicy::from_db_str(value.trim()) {
            Some(policy) => Ok(policy),
            None => {
                warn!(
                    config_key = config_keys::STARTING_HOLE_POLICY,
                    raw_value = %value,
                    "起爆孔策略配置无效，使用默认值"
                );
                Ok(StartingHolePolicy::default())
            }
        }
    }

    async fn get_default_delays(&self) -> ConfigResult<DelaySpec> {
        let defaults = DelaySpec::default();
        Ok(DelaySpec {
            hole_delay_ms: self.get_parsed(
                config_keys::DEFAULT_HOLE_DELAY_MS,
                defaults.hole_delay_ms,
                |_| true,
            )?,
            row_delay_ms: self.get_parsed(
                config_keys::DEFAULT_ROW_DELAY_MS,
                defaults.row_delay_ms,
                |_| true,
            )?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 材料
    pub const ANFO_DENSITY: &str = "blast.anfo_density";
    pub const EMULSION_DENSITY: &str = "blast.emulsion_density";
    pub const EMULSION_PER_HOLE: &str = "blast.emulsion_per_hole";

    // 布孔约束
    pub const MAX_DRILL_POINTS: &str = "blast.max_drill_points";
    pub const COORDINATE_TOLERANCE: &str = "blast.coordinate_tolerance";
    pub const ROW_TOLERANCE: &str = "blast.row_tolerance";

    // 拓扑
    pub const STARTING_HOLE_POLICY: &str = "blast.starting_hole_policy";

    // 延时
    pub const DEFAULT_HOLE_DELAY_MS: &str = "blast.default_hole_delay_ms";
    pub const DEFAULT_ROW_DELAY_MS: &str = "blast.default_row_delay_ms";
}
