// ==========================================
// 爆破起爆网络 - 网络服务（编排器）
// ==========================================
// 每个站点持有一份不可变快照 NetworkView
// 修改流程: 临界区 → 复制 → 应用操作 → 校验 → 求解 → 装药 → 持久化 → 发布
// ==========================================
// 红线: 任一步失败即拒绝，旧快照保持不变
// 红线: 同一站点的修改串行；不同站点互不阻塞
// 红线: 读取只克隆 Arc，永远看不到半更新的网络
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::NetworkSettings;
use crate::domain::charge::{ChargeAggregate, ChargeResult, MaterialParams};
use crate::domain::connection::{BlastConnection, ConnectionView};
use crate::domain::drill_point::{DrillPoint, HoleGeometry};
use crate::domain::network::{FiringSchedule, Network, NetworkView};
use crate::domain::types::{ConnectionId, ConnectorKind, HoleId, SiteKey};
use crate::domain::violation::TopologyViolation;
use crate::engine::geometry::{
    anchor_to_origin, calculate_grid_pitch, find_coincident, recommended_geometry,
    validate_coordinates, validate_drill_point, GridPitch,
};
use crate::engine::pattern_generator::{DelaySpec, GridSpec, PatternGenerator};
use crate::engine::pipeline::{NetworkPipeline, PipelineOutput};
use crate::repository::NetworkStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// MutationOp - 网络修改操作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationOp {
    AddPoint {
        point: DrillPoint,
    },
    MovePoint {
        hole_id: HoleId,
        x: f64,
        y: f64,
    },
    UpdatePointGeometry {
        hole_id: HoleId,
        geometry: HoleGeometry,
    },
    /// 同时删除触及该孔的全部连接
    RemovePoint {
        hole_id: HoleId,
    },
    /// 未给出 id 时生成 UUID
    AddConnection {
        #[serde(default)]
        id: Option<ConnectionId>,
        from_hole_id: HoleId,
        to_hole_id: HoleId,
        #[serde(default)]
        connector: ConnectorKind,
        delay_ms: u32,
    },
    /// 仅修改给出的字段
    UpdateConnection {
        connection_id: ConnectionId,
        #[serde(default)]
        from_hole_id: Option<HoleId>,
        #[serde(default)]
        to_hole_id: Option<HoleId>,
        #[serde(default)]
        connector: Option<ConnectorKind>,
        #[serde(default)]
        delay_ms: Option<u32>,
    },
    RemoveConnection {
        connection_id: ConnectionId,
    },
    /// 整站原子替换
    ReplaceAll {
        points: Vec<DrillPoint>,
        connections: Vec<BlastConnection>,
    },
    /// 按蛇形规则为现有孔位重新连线（替换全部连接）
    AutoConnect {
        #[serde(default)]
        delays: Option<DelaySpec>,
    },
    MarkCompleted {
        hole_id: HoleId,
        completed: bool,
    },
    AnchorToOrigin,
    ClearAll,
}

impl MutationOp {
    /// 操作名（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            MutationOp::AddPoint { .. } => "ADD_POINT",
            MutationOp::MovePoint { .. } => "MOVE_POINT",
            MutationOp::UpdatePointGeometry { .. } => "UPDATE_POINT_GEOMETRY",
            MutationOp::RemovePoint { .. } => "REMOVE_POINT",
            MutationOp::AddConnection { .. } => "ADD_CONNECTION",
            MutationOp::UpdateConnection { .. } => "UPDATE_CONNECTION",
            MutationOp::RemoveConnection { .. } => "REMOVE_CONNECTION",
            MutationOp::ReplaceAll { .. } => "REPLACE_ALL",
            MutationOp::AutoConnect { .. } => "AUTO_CONNECT",
            MutationOp::MarkCompleted { .. } => "MARK_COMPLETED",
            MutationOp::AnchorToOrigin => "ANCHOR_TO_ORIGIN",
            MutationOp::ClearAll => "CLEAR_ALL",
        }
    }
}

// ==========================================
// SiteSlot - 单站点状态
// ==========================================
// section: 修改临界区；值为 true 表示该槽已被 unload 摘除
// snapshot: None 表示尚未从存储加载
#[derive(Default)]
struct SiteSlot {
    section: Mutex<bool>,
    snapshot: RwLock<Option<Arc<NetworkView>>>,
}

fn lock_error(e: impl Display) -> ApiError {
    ApiError::LockError(e.to_string())
}

// ==========================================
// NetworkService - 网络服务
// ==========================================
// 站点槽在首次访问时创建，常驻直到 unload
pub struct NetworkService {
    store: Arc<dyn NetworkStore>,
    settings: NetworkSettings,
    pipeline: NetworkPipeline,
    sites: Mutex<HashMap<SiteKey, Arc<SiteSlot>>>,
}

impl NetworkService {
    /// 创建网络服务
    ///
    /// # 参数
    /// - store: 持久化实现
    /// - settings: 运行参数（材料参数作为各站点初始值）
    pub fn new(store: Arc<dyn NetworkStore>, settings: NetworkSettings) -> Self {
        Self {
            store,
            settings,
            pipeline: NetworkPipeline::new(),
            sites: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    // ==========================================
    // 修改
    // ==========================================

    /// 应用一次修改并发布新快照
    ///
    /// # 返回
    /// - Ok(NetworkView): 新快照（revision + 1）
    /// - Err: NotFound / Conflict / InvalidInput / Geometry / Topology / 持久化错误，旧快照不变
    #[instrument(skip(self, op), fields(site = %site, op = op.name()))]
    pub fn mutate(&self, site: SiteKey, op: MutationOp) -> ApiResult<Arc<NetworkView>> {
        let op_name = op.name();
        let result = self.with_section(site, |slot| {
            let current = self.ensure_loaded(site, slot)?;
            let mut network = current.network();
            self.apply(&mut network, op)?;
            self.commit(site, slot, &current, &network)
        });

        match &result {
            Ok(view) => info!(
                site = %site,
                op = op_name,
                revision = view.revision,
                holes = view.points.len(),
                connections = view.connections.len(),
                "网络修改已发布"
            ),
            Err(e) => warn!(
                site = %site,
                op = op_name,
                error = %e,
                "网络修改被拒绝，快照保持不变"
            ),
        }
        result
    }

    /// 生成矩形网格并整站替换
    ///
    /// delays 为空时使用配置的默认延时
    pub fn generate_pattern(
        &self,
        site: SiteKey,
        grid: &GridSpec,
        delays: Option<DelaySpec>,
    ) -> ApiResult<Arc<NetworkView>> {
        let delays = delays.unwrap_or(self.settings.default_delays);
        let candidate = self.generator().generate_grid(grid, &delays)?;
        self.mutate(
            site,
            MutationOp::ReplaceAll {
                points: candidate.points,
                connections: candidate.connections,
            },
        )
    }

    /// 修改站点材料参数（仅重算装药，拓扑与时序不变）
    ///
    /// 参数只保存在内存快照中，不写入存储；unload 或重启后回到配置的默认值
    #[instrument(skip(self, params), fields(site = %site))]
    pub fn set_material_params(
        &self,
        site: SiteKey,
        params: MaterialParams,
    ) -> ApiResult<Arc<NetworkView>> {
        self.with_section(site, |slot| {
            let current = self.ensure_loaded(site, slot)?;
            let charges = self.pipeline.recalculate_charges(&current.points, &params)?;

            let mut view = (*current).clone();
            view.material_params = params;
            view.charges = charges;
            view.revision += 1;
            view.updated_at = Utc::now();

            let view = Arc::new(view);
            Self::publish(slot, view.clone())?;
            info!(site = %site, revision = view.revision, "材料参数已更新");
            Ok(view)
        })
    }

    /// 释放站点的内存快照
    ///
    /// 等待进行中的修改完成后摘除；下次访问重新从存储加载（revision 归零）
    ///
    /// # 返回
    /// - Ok(true): 站点曾驻留并已释放
    /// - Ok(false): 站点未驻留
    pub fn unload(&self, site: SiteKey) -> ApiResult<bool> {
        let slot = match self.sites.lock().map_err(lock_error)?.get(&site) {
            Some(slot) => slot.clone(),
            None => return Ok(false),
        };

        let mut retired = slot.section.lock().map_err(lock_error)?;
        if *retired {
            return Ok(false);
        }
        let mut sites = self.sites.lock().map_err(lock_error)?;
        if sites.get(&site).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
            sites.remove(&site);
        }
        *retired = true;

        info!(site = %site, resident_sites = sites.len(), "站点快照已释放");
        Ok(true)
    }

    /// 当前驻留内存的站点数
    pub fn resident_sites(&self) -> ApiResult<usize> {
        Ok(self.sites.lock().map_err(lock_error)?.len())
    }

    // ==========================================
    // 读取
    // ==========================================

    /// 当前快照（首次访问时从存储加载）
    pub fn view(&self, site: SiteKey) -> ApiResult<Arc<NetworkView>> {
        let slot = self.slot(site)?;
        if let Some(view) = Self::published(&slot)? {
            return Ok(view);
        }

        self.with_section(site, |slot| self.ensure_loaded(site, slot))
    }

    pub fn points(&self, site: SiteKey) -> ApiResult<Vec<DrillPoint>> {
        Ok(self.view(site)?.points.clone())
    }

    pub fn connections(&self, site: SiteKey) -> ApiResult<Vec<ConnectionView>> {
        Ok(self.view(site)?.connections.clone())
    }

    pub fn schedule(&self, site: SiteKey) -> ApiResult<FiringSchedule> {
        Ok(self.view(site)?.schedule.clone())
    }

    pub fn charges(&self, site: SiteKey) -> ApiResult<ChargeResult> {
        Ok(self.view(site)?.charges.clone())
    }

    pub fn charge_aggregate(&self, site: SiteKey) -> ApiResult<ChargeAggregate> {
        Ok(self.view(site)?.charges.aggregate.clone())
    }

    /// 持久化数据加载时的拓扑违规（修改成功后清空）
    pub fn load_violations(&self, site: SiteKey) -> ApiResult<Vec<TopologyViolation>> {
        Ok(self.view(site)?.load_violations.clone())
    }

    /// 由现有孔位估算孔距与抵抗线
    pub fn grid_pitch(&self, site: SiteKey) -> ApiResult<GridPitch> {
        Ok(calculate_grid_pitch(&self.view(site)?.points))
    }

    /// 网格的推荐孔几何（孔距、抵抗线取网格参数，堵塞与孔径取经验值）
    ///
    /// 不修改任何站点；调用方可将结果作为 GridSpec.template 再生成
    pub fn recommended_template(&self, grid: &GridSpec) -> HoleGeometry {
        recommended_geometry(&HoleGeometry {
            spacing: grid.spacing,
            burden: grid.burden,
            ..grid.template
        })
    }

    // ==========================================
    // 内部
    // ==========================================

    fn generator(&self) -> PatternGenerator {
        PatternGenerator::new(self.settings.max_drill_points, self.settings.row_tolerance_m)
    }

    fn slot(&self, site: SiteKey) -> ApiResult<Arc<SiteSlot>> {
        let mut sites = self.sites.lock().map_err(lock_error)?;
        Ok(sites.entry(site).or_default().clone())
    }

    /// 在站点临界区内执行；槽已被摘除时改用新槽重试
    fn with_section<T>(
        &self,
        site: SiteKey,
        f: impl FnOnce(&SiteSlot) -> ApiResult<T>,
    ) -> ApiResult<T> {
        loop {
            let slot = self.slot(site)?;
            let retired = slot.section.lock().map_err(lock_error)?;
            if !*retired {
                return f(&slot);
            }
        }
    }

    fn published(slot: &SiteSlot) -> ApiResult<Option<Arc<NetworkView>>> {
        let guard = slot.snapshot.read().map_err(lock_error)?;
        Ok(guard.clone())
    }

    fn publish(slot: &SiteSlot, view: Arc<NetworkView>) -> ApiResult<()> {
        let mut guard = slot.snapshot.write().map_err(lock_error)?;
        *guard = Some(view);
        Ok(())
    }

    /// 调用方须持有站点临界区
    fn ensure_loaded(&self, site: SiteKey, slot: &SiteSlot) -> ApiResult<Arc<NetworkView>> {
        if let Some(view) = Self::published(slot)? {
            return Ok(view);
        }

        let network = self.store.load_network(site)?;
        let (output, violations) = self.pipeline.inspect(
            &network,
            self.settings.starting_hole_policy,
            &self.settings.material_params,
        );
        if !violations.is_empty() {
            warn!(site = %site, violations = violations.len(), "站点网络加载时即不合法");
        }

        let view = Arc::new(build_view(
            site,
            0,
            output,
            self.settings.material_params,
            violations,
        ));
        Self::publish(slot, view.clone())?;
        info!(site = %site, holes = view.points.len(), "站点网络已加载");
        Ok(view)
    }

    /// 校验、求解、计算、持久化、发布
    fn commit(
        &self,
        site: SiteKey,
        slot: &SiteSlot,
        current: &NetworkView,
        network: &Network,
    ) -> ApiResult<Arc<NetworkView>> {
        let output = self.pipeline.run(
            network,
            self.settings.starting_hole_policy,
            &current.material_params,
        )?;
        self.store.replace_network(site, network)?;

        let view = Arc::new(build_view(
            site,
            current.revision + 1,
            output,
            current.material_params,
            Vec::new(),
        ));
        Self::publish(slot, view.clone())?;
        Ok(view)
    }

    /// 在副本上应用操作（仅做存在性与冲突检查，拓扑由流水线校验）
    fn apply(&self, network: &mut Network, op: MutationOp) -> ApiResult<()> {
        match op {
            MutationOp::AddPoint { point } => {
                if network.points.len() >= self.settings.max_drill_points {
                    return Err(ApiError::Conflict(format!(
                        "炮孔数量已达上限: {}",
                        self.settings.max_drill_points
                    )));
                }
                if network.point(&point.id).is_some() {
                    return Err(ApiError::Conflict(format!("炮孔ID已存在: {}", point.id)));
                }
                validate_drill_point(&point)?;
                self.ensure_no_coincident(point.x, point.y, &network.points, None)?;
                network.points.push(point);
            }

            MutationOp::MovePoint { hole_id, x, y } => {
                if !validate_coordinates(x, y) {
                    return Err(ApiError::InvalidInput(format!(
                        "坐标无效: hole={}, x={}, y={}",
                        hole_id, x, y
                    )));
                }
                ensure_hole(network, &hole_id)?;
                self.ensure_no_coincident(x, y, &network.points, Some(hole_id.as_str()))?;
                let point = point_mut(network, &hole_id)?;
                point.x = x;
                point.y = y;
            }

            MutationOp::UpdatePointGeometry { hole_id, geometry } => {
                let point = point_mut(network, &hole_id)?;
                let updated = point.clone().with_geometry(geometry);
                validate_drill_point(&updated)?;
                *point = updated;
            }

            MutationOp::RemovePoint { hole_id } => {
                let before = network.points.len();
                network.points.retain(|p| p.id != hole_id);
                if network.points.len() == before {
                    return Err(hole_not_found(&hole_id));
                }
                network.connections.retain(|c| !c.touches(&hole_id));
            }

            MutationOp::AddConnection {
                id,
                from_hole_id,
                to_hole_id,
                connector,
                delay_ms,
            } => {
                ensure_hole(network, &from_hole_id)?;
                ensure_hole(network, &to_hole_id)?;
                let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
                if network.connection(&id).is_some() {
                    return Err(ApiError::Conflict(format!("连接ID已存在: {}", id)));
                }
                let conn = BlastConnection::new(id, from_hole_id, to_hole_id, connector, delay_ms);
                if let Some(existing) = network.connections.iter().find(|c| c.same_endpoints(&conn)) {
                    return Err(ApiError::Conflict(format!(
                        "连接已存在: {} → {} (connection={})",
                        conn.from_hole_id, conn.to_hole_id, existing.id
                    )));
                }
                network.connections.push(conn);
            }

            MutationOp::UpdateConnection {
                connection_id,
                from_hole_id,
                to_hole_id,
                connector,
                delay_ms,
            } => {
                for hole_id in from_hole_id.iter().chain(to_hole_id.iter()) {
                    ensure_hole(network, hole_id)?;
                }
                let conn = network
                    .connections
                    .iter_mut()
                    .find(|c| c.id == connection_id)
                    .ok_or_else(|| connection_not_found(&connection_id))?;
                if let Some(from) = from_hole_id {
                    conn.from_hole_id = from;
                }
                if let Some(to) = to_hole_id {
                    conn.to_hole_id = to;
                }
                if let Some(kind) = connector {
                    conn.connector = kind;
                }
                if let Some(delay) = delay_ms {
                    conn.delay_ms = delay;
                }
            }

            MutationOp::RemoveConnection { connection_id } => {
                let before = network.connections.len();
                network.connections.retain(|c| c.id != connection_id);
                if network.connections.len() == before {
                    return Err(connection_not_found(&connection_id));
                }
            }

            MutationOp::ReplaceAll {
                points,
                connections,
            } => {
                self.check_replacement(&points, &connections)?;
                *network = Network::new(points, connections);
            }

            MutationOp::AutoConnect { delays } => {
                let delays = delays.unwrap_or(self.settings.default_delays);
                let candidate = self
                    .generator()
                    .connect_points(network.points.clone(), &delays)?;
                network.connections = candidate.connections;
            }

            MutationOp::MarkCompleted { hole_id, completed } => {
                let point = point_mut(network, &hole_id)?;
                point.is_completed = completed;
                point.completed_at = if completed {
                    Some(Utc::now().naive_utc())
                } else {
                    None
                };
            }

            MutationOp::AnchorToOrigin => {
                network.points = anchor_to_origin(&network.points);
            }

            MutationOp::ClearAll => {
                *network = Network::default();
            }
        }
        Ok(())
    }

    /// 整站替换前的冲突检查
    fn check_replacement(
        &self,
        points: &[DrillPoint],
        connections: &[BlastConnection],
    ) -> ApiResult<()> {
        if points.len() > self.settings.max_drill_points {
            return Err(ApiError::Conflict(format!(
                "炮孔数量超过上限: {} > {}",
                points.len(),
                self.settings.max_drill_points
            )));
        }

        let mut hole_ids = HashSet::new();
        for (index, point) in points.iter().enumerate() {
            if !hole_ids.insert(point.id.as_str()) {
                return Err(ApiError::Conflict(format!("炮孔ID重复: {}", point.id)));
            }
            validate_drill_point(point)?;
            self.ensure_no_coincident(point.x, point.y, &points[..index], None)?;
        }

        let mut connection_ids = HashSet::new();
        for conn in connections {
            if !connection_ids.insert(conn.id.as_str()) {
                return Err(ApiError::Conflict(format!("连接ID重复: {}", conn.id)));
            }
        }
        Ok(())
    }

    fn ensure_no_coincident(
        &self,
        x: f64,
        y: f64,
        points: &[DrillPoint],
        exclude_id: Option<&str>,
    ) -> ApiResult<()> {
        match find_coincident(x, y, points, self.settings.coordinate_tolerance_m, exclude_id) {
            Some(other) => Err(ApiError::Conflict(format!(
                "坐标与炮孔{}重合: ({:.2}, {:.2})",
                other.id, x, y
            ))),
            None => Ok(()),
        }
    }
}

fn point_mut<'a>(network: &'a mut Network, hole_id: &str) -> ApiResult<&'a mut DrillPoint> {
    network
        .points
        .iter_mut()
        .find(|p| p.id == hole_id)
        .ok_or_else(|| hole_not_found(hole_id))
}

/// 单条修改引用的炮孔必须存在于当前快照
fn ensure_hole(network: &Network, hole_id: &str) -> ApiResult<()> {
    network
        .point(hole_id)
        .map(|_| ())
        .ok_or_else(|| hole_not_found(hole_id))
}

fn hole_not_found(hole_id: &str) -> ApiError {
    ApiError::NotFound(format!("炮孔{}不存在", hole_id))
}

fn connection_not_found(connection_id: &str) -> ApiError {
    ApiError::NotFound(format!("连接{}不存在", connection_id))
}

fn build_view(
    site: SiteKey,
    revision: u64,
    output: PipelineOutput,
    material_params: MaterialParams,
    load_violations: Vec<TopologyViolation>,
) -> NetworkView {
    NetworkView {
        site,
        revision,
        points: output.points,
        connections: output.connections,
        schedule: output.schedule,
        charges: output.charges,
        material_params,
        component_count: output.component_count,
        load_violations,
        updated_at: Utc::now(),
    }
}
