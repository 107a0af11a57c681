// ==========================================
// 爆破起爆网络 - 运行参数
// ==========================================
// 启动时从 NetworkConfigReader 一次性装配
// 读取失败的项回退默认值并告警
// ==========================================

use crate::config::network_config_trait::NetworkConfigReader;
use crate::domain::charge::MaterialParams;
use crate::domain::types::StartingHolePolicy;
use crate::engine::geometry::COORDINATE_PRECISION;
use crate::engine::pattern_generator::{DelaySpec, DEFAULT_MAX_DRILL_POINTS, DEFAULT_ROW_TOLERANCE};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 网络服务运行参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub material_params: MaterialParams,
    pub max_drill_points: usize,
    pub coordinate_tolerance_m: f64,
    pub row_tolerance_m: f64,
    pub starting_hole_policy: StartingHolePolicy,
    pub default_delays: DelaySpec,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            material_params: MaterialParams::default(),
            max_drill_points: DEFAULT_MAX_DRILL_POINTS,
            coordinate_tolerance_m: COORDINATE_PRECISION,
            row_tolerance_m: DEFAULT_ROW_TOLERANCE,
            starting_hole_policy: StartingHolePolicy::default(),
            default_delays: DelaySpec::default(),
        }
    }
}

impl NetworkSettings {
    /// 从配置读取器装配
    pub async fn load(reader: &dyn NetworkConfigReader) -> Self {
        let defaults = Self::default();

        let material_params = reader.get_material_params().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取材料参数失败，使用默认值");
            defaults.material_params
        });
        let max_drill_points = reader.get_max_drill_points().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取炮孔上限失败，使用默认值");
            defaults.max_drill_points
        });
        let coordinate_tolerance_m = reader.get_coordinate_tolerance().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取坐标容差失败，使用默认值");
            defaults.coordinate_tolerance_m
        });
        let row_tolerance_m = reader.get_row_tolerance().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取分排容差失败，使用默认值");
            defaults.row_tolerance_m
        });
        let starting_hole_policy = reader.get_starting_hole_policy().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取起爆孔策略失败，使用默认值");
            defaults.starting_hole_policy
        });
        let default_delays = reader.get_default_delays().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取默认延时失败，使用默认值");
            defaults.default_delays
        });

        let settings = Self {
            material_params,
            max_drill_points,
            coordinate_tolerance_m,
            row_tolerance_m,
            starting_hole_policy,
            default_delays,
        };
        info!(
            policy = %settings.starting_hole_policy,
            max_drill_points = settings.max_drill_points,
            "网络参数加载完成"
        );
        settings
    }
}
