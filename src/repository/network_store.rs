// ==========================================
// 爆破起爆网络 - 网络持久化接口
// ==========================================
// NetworkStore: 编排器依赖的存储抽象
// - SqliteNetworkStore: 生产实现（replace_network 单事务）
// - MemoryNetworkStore: 内存实现（测试与临时站点）
// ==========================================
// 语义: save_* 为整站替换，不做增量 upsert
// ==========================================

use crate::domain::connection::BlastConnection;
use crate::domain::drill_point::DrillPoint;
use crate::domain::network::Network;
use crate::domain::types::SiteKey;
use crate::repository::blast_connection_repo::BlastConnectionRepository;
use crate::repository::drill_point_repo::DrillPointRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// NetworkStore Trait
// ==========================================
pub trait NetworkStore: Send + Sync {
    fn load_points(&self, site: SiteKey) -> RepositoryResult<Vec<DrillPoint>>;

    fn load_connections(&self, site: SiteKey) -> RepositoryResult<Vec<BlastConnection>>;

    fn save_points(&self, site: SiteKey, points: &[DrillPoint]) -> RepositoryResult<()>;

    fn save_connections(
        &self,
        site: SiteKey,
        connections: &[BlastConnection],
    ) -> RepositoryResult<()>;

    fn delete_all(&self, site: SiteKey) -> RepositoryResult<()>;

    /// 加载整站网络
    fn load_network(&self, site: SiteKey) -> RepositoryResult<Network> {
        Ok(Network::new(
            self.load_points(site)?,
            self.load_connections(site)?,
        ))
    }

    /// 整站替换
    ///
    /// 默认实现非原子；需要原子性的实现应覆盖此方法
    fn replace_network(&self, site: SiteKey, network: &Network) -> RepositoryResult<()> {
        self.save_points(site, &network.points)?;
        self.save_connections(site, &network.connections)
    }
}

// ==========================================
// SqliteNetworkStore - SQLite 实现
// ==========================================
pub struct SqliteNetworkStore {
    conn: Arc<Mutex<Connection>>,
    points: DrillPointRepository,
    connections: BlastConnectionRepository,
}

impl SqliteNetworkStore {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            points: DrillPointRepository::from_connection(conn.clone()),
            connections: BlastConnectionRepository::from_connection(conn.clone()),
            conn,
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl NetworkStore for SqliteNetworkStore {
    fn load_points(&self, site: SiteKey) -> RepositoryResult<Vec<DrillPoint>> {
        self.points.find_by_site(site)
    }

    fn load_connections(&self, site: SiteKey) -> RepositoryResult<Vec<BlastConnection>> {
        self.connections.find_by_site(site)
    }

    fn save_points(&self, site: SiteKey, points: &[DrillPoint]) -> RepositoryResult<()> {
        self.points.replace_site(site, points)?;
        Ok(())
    }

    fn save_connections(
        &self,
        site: SiteKey,
        connections: &[BlastConnection],
    ) -> RepositoryResult<()> {
        self.connections.replace_site(site, connections)?;
        Ok(())
    }

    fn delete_all(&self, site: SiteKey) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        BlastConnectionRepository::delete_by_site_tx(&tx, site)?;
        DrillPointRepository::delete_by_site_tx(&tx, site)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(())
    }

    fn load_network(&self, site: SiteKey) -> RepositoryResult<Network> {
        let conn = self.get_conn()?;
        let points = DrillPointRepository::find_by_site_tx(&conn, site)?;
        let connections = BlastConnectionRepository::find_by_site_tx(&conn, site)?;
        Ok(Network::new(points, connections))
    }

    fn replace_network(&self, site: SiteKey, network: &Network) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        BlastConnectionRepository::delete_by_site_tx(&tx, site)?;
        DrillPointRepository::delete_by_site_tx(&tx, site)?;
        let points = DrillPointRepository::insert_batch_tx(&tx, site, &network.points)?;
        let connections =
            BlastConnectionRepository::insert_batch_tx(&tx, site, &network.connections)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        debug!(site = %site, points, connections, "网络已持久化");
        Ok(())
    }
}

// ==========================================
// MemoryNetworkStore - 内存实现
// ==========================================
#[derive(Default)]
pub struct MemoryNetworkStore {
    sites: Mutex<HashMap<SiteKey, Network>>,
}

impl MemoryNetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_sites(&self) -> RepositoryResult<MutexGuard<'_, HashMap<SiteKey, Network>>> {
        self.sites
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl NetworkStore for MemoryNetworkStore {
    fn load_points(&self, site: SiteKey) -> RepositoryResult<Vec<DrillPoint>> {
        Ok(self
            .get_sites()?
            .get(&site)
            .map(|n| n.points.clone())
            .unwrap_or_default())
    }

    fn load_connections(&self, site: SiteKey) -> RepositoryResult<Vec<BlastConnection>> {
        Ok(self
            .get_sites()?
            .get(&site)
            .map(|n| n.connections.clone())
            .unwrap_or_default())
    }

    fn save_points(&self, site: SiteKey, points: &[DrillPoint]) -> RepositoryResult<()> {
        self.get_sites()?.entry(site).or_default().points = points.to_vec();
        Ok(())
    }

    fn save_connections(
        &self,
        site: SiteKey,
        connections: &[BlastConnection],
    ) -> RepositoryResult<()> {
        self.get_sites()?.entry(site).or_default().connections = connections.to_vec();
        Ok(())
    }

    fn delete_all(&self, site: SiteKey) -> RepositoryResult<()> {
        self.get_sites()?.remove(&site);
        Ok(())
    }

    fn replace_network(&self, site: SiteKey, network: &Network) -> RepositoryResult<()> {
        self.get_sites()?.insert(site, network.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::drill_point::HoleGeometry;
    use crate::domain::types::ConnectorKind;
    use chrono::NaiveDate;

    fn sqlite_store() -> SqliteNetworkStore {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteNetworkStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn sample_network() -> Network {
        let mut b = DrillPoint::new("B", 3.0, 0.0, HoleGeometry::default());
        b.is_completed = true;
        b.completed_at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0);
        Network::new(
            vec![DrillPoint::new("A", 0.0, 0.0, HoleGeometry::default()), b],
            vec![BlastConnection::new("c1", "A", "B", ConnectorKind::Connector, 42)],
        )
    }

    #[test]
    fn test_sqlite_replace_and_load() {
        let store = sqlite_store();
        let site = SiteKey::new(1, 7);
        store.replace_network(site, &sample_network()).unwrap();

        let loaded = store.load_network(site).unwrap();
        assert_eq!(loaded, sample_network());

        // 其他站点不受影响
        assert!(store.load_network(SiteKey::new(1, 8)).unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_replace_overwrites_previous() {
        let store = sqlite_store();
        let site = SiteKey::new(1, 1);
        store.replace_network(site, &sample_network()).unwrap();

        let smaller = Network::new(
            vec![DrillPoint::new("Z", 9.0, 9.0, HoleGeometry::default())],
            Vec::new(),
        );
        store.replace_network(site, &smaller).unwrap();

        let loaded = store.load_network(site).unwrap();
        assert_eq!(loaded.points.len(), 1);
        assert_eq!(loaded.points[0].id, "Z");
        assert!(loaded.connections.is_empty());
    }

    #[test]
    fn test_sqlite_failed_replace_keeps_previous() {
        let store = sqlite_store();
        let site = SiteKey::new(2, 1);
        store.replace_network(site, &sample_network()).unwrap();

        // 主键冲突导致事务回滚
        let mut broken = sample_network();
        broken.points.push(DrillPoint::new("A", 5.0, 5.0, HoleGeometry::default()));
        let err = store.replace_network(site, &broken).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        assert_eq!(store.load_network(site).unwrap(), sample_network());
    }

    #[test]
    fn test_sqlite_replace_inside_open_transaction_fails() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        // 外部已开启事务，嵌套 BEGIN 失败
        conn.execute_batch("BEGIN;").unwrap();
        let store = SqliteNetworkStore::from_connection(Arc::new(Mutex::new(conn)));

        let err = store
            .replace_network(SiteKey::new(4, 1), &sample_network())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DatabaseTransactionError(_)));
    }

    #[test]
    fn test_sqlite_delete_all() {
        let store = sqlite_store();
        let site = SiteKey::new(3, 3);
        store.replace_network(site, &sample_network()).unwrap();
        store.delete_all(site).unwrap();
        assert!(store.load_points(site).unwrap().is_empty());
        assert!(store.load_connections(site).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_default_replace() {
        let store = MemoryNetworkStore::new();
        let site = SiteKey::new(1, 1);
        store.save_points(site, &sample_network().points).unwrap();
        store
            .save_connections(site, &sample_network().connections)
            .unwrap();
        assert_eq!(store.load_network(site).unwrap(), sample_network());

        store.delete_all(site).unwrap();
        assert!(store.load_network(site).unwrap().is_empty());
    }
}
