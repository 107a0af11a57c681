// ==========================================
// 爆破起爆网络 - 网络配置读取 Trait
// ==========================================
// 职责: 定义网络服务所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::charge::MaterialParams;
use crate::domain::types::StartingHolePolicy;
use crate::engine::pattern_generator::DelaySpec;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// NetworkConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait NetworkConfigReader: Send + Sync {
    /// 获取材料参数
    ///
    /// # 默认值
    /// - 铵油密度 800 kg/m³，乳化密度 1200 kg/m³，乳化长度 1.0 m
    async fn get_material_params(&self) -> ConfigResult<MaterialParams>;

    /// 获取站点炮孔数量上限
    ///
    /// # 默认值
    /// - 500
    async fn get_max_drill_points(&self) -> ConfigResult<usize>;

    /// 获取坐标重合判定容差（米）
    ///
    /// # 默认值
    /// - 0.01
    async fn get_coordinate_tolerance(&self) -> ConfigResult<f64>;

    /// 获取已有孔位分排容差（米）
    ///
    /// # 默认值
    /// - 0.5
    async fn get_row_tolerance(&self) -> ConfigResult<f64>;

    /// 获取起爆孔策略
    ///
    /// # 默认值
    /// - INDEPENDENT_PATTERNS
    async fn get_starting_hole_policy(&self) -> ConfigResult<StartingHolePolicy>;

    /// 获取默认延时（孔间 / 排间）
    ///
    /// # 默认值
    /// - 25 ms / 42 ms
    async fn get_default_delays(&self) -> ConfigResult<DelaySpec>;
}
