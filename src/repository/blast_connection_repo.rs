// ==========================================
// 爆破起爆网络 - 起爆连接数据仓储
// ==========================================
// 表: blast_connection（主键 project_id + site_id + connection_id）
// 红线: Repository 不含业务逻辑；端点合法性由校验器负责
// ==========================================

use crate::domain::connection::BlastConnection;
use crate::domain::types::{ConnectorKind, SiteKey};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// BlastConnectionRepository - 起爆连接仓储
// ==========================================
pub struct BlastConnectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BlastConnectionRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询站点全部连接（按连接ID升序）
    pub fn find_by_site(&self, site: SiteKey) -> RepositoryResult<Vec<BlastConnection>> {
        let conn = self.get_conn()?;
        Self::find_by_site_tx(&conn, site)
    }

    /// 整体替换站点连接（事务化）
    pub fn replace_site(
        &self,
        site: SiteKey,
        connections: &[BlastConnection],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        Self::delete_by_site_tx(&tx, site)?;
        let count = Self::insert_batch_tx(&tx, site, connections)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(count)
    }

    // ==========================================
    // 事务内操作（由调用方持有事务）
    // ==========================================

    pub(crate) fn find_by_site_tx(
        conn: &Connection,
        site: SiteKey,
    ) -> RepositoryResult<Vec<BlastConnection>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT connection_id, from_hole_id, to_hole_id, connector, delay_ms
            FROM blast_connection
            WHERE project_id = ?1 AND site_id = ?2
            ORDER BY connection_id
            "#,
        )?;

        let rows = stmt.query_map(params![site.project_id, site.site_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut connections = Vec::new();
        for row in rows {
            let (id, from_hole_id, to_hole_id, connector, delay_ms) = row?;

            let connector = ConnectorKind::from_db_str(&connector).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "connector".to_string(),
                    message: format!("未知连接器类型: {} (connection={})", connector, id),
                }
            })?;
            let delay_ms = u32::try_from(delay_ms).map_err(|_| RepositoryError::FieldValueError {
                field: "delay_ms".to_string(),
                message: format!("延时超出范围: {} (connection={})", delay_ms, id),
            })?;

            connections.push(BlastConnection {
                id,
                from_hole_id,
                to_hole_id,
                connector,
                delay_ms,
            });
        }
        Ok(connections)
    }

    pub(crate) fn insert_batch_tx(
        conn: &Connection,
        site: SiteKey,
        connections: &[BlastConnection],
    ) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO blast_connection (
                project_id, site_id, connection_id,
                from_hole_id, to_hole_id, connector, delay_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;

        let mut count = 0;
        for c in connections {
            stmt.execute(params![
                site.project_id,
                site.site_id,
                c.id,
                c.from_hole_id,
                c.to_hole_id,
                c.connector.to_db_str(),
                c.delay_ms,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    pub(crate) fn delete_by_site_tx(conn: &Connection, site: SiteKey) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "DELETE FROM blast_connection WHERE project_id = ?1 AND site_id = ?2",
            params![site.project_id, site.site_id],
        )?;
        Ok(affected)
    }
}
