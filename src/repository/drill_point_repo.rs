// ==========================================
// 爆破起爆网络 - 炮孔数据仓储
// ==========================================
// 表: drill_point（主键 project_id + site_id + hole_id）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::drill_point::DrillPoint;
use crate::domain::types::SiteKey;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    hole_id, x, y, depth, diameter, burden, spacing, stemming, subdrill,
    is_completed, completed_at
"#;

// ==========================================
// DrillPointRepository - 炮孔仓储
// ==========================================
pub struct DrillPointRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DrillPointRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询站点全部炮孔（按炮孔ID升序）
    pub fn find_by_site(&self, site: SiteKey) -> RepositoryResult<Vec<DrillPoint>> {
        let conn = self.get_conn()?;
        Self::find_by_site_tx(&conn, site)
    }

    /// 整体替换站点炮孔（事务化）
    pub fn replace_site(&self, site: SiteKey, points: &[DrillPoint]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        Self::delete_by_site_tx(&tx, site)?;
        let count = Self::insert_batch_tx(&tx, site, points)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(count)
    }

    // ==========================================
    // 事务内操作（由调用方持有事务）
    // ==========================================

    pub(crate) fn find_by_site_tx(conn: &Connection, site: SiteKey) -> RepositoryResult<Vec<DrillPoint>> {
        let sql = format!(
            "SELECT {} FROM drill_point WHERE project_id = ?1 AND site_id = ?2 ORDER BY hole_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![site.project_id, site.site_id], map_row)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    }

    pub(crate) fn insert_batch_tx(
        conn: &Connection,
        site: SiteKey,
        points: &[DrillPoint],
    ) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO drill_point (
                project_id, site_id, hole_id, x, y,
                depth, diameter, burden, spacing, stemming, subdrill,
                is_completed, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )?;

        let mut count = 0;
        for p in points {
            stmt.execute(params![
                site.project_id,
                site.site_id,
                p.id,
                p.x,
                p.y,
                p.depth,
                p.diameter,
                p.burden,
                p.spacing,
                p.stemming,
                p.subdrill,
                p.is_completed,
                p.completed_at,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    pub(crate) fn delete_by_site_tx(conn: &Connection, site: SiteKey) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "DELETE FROM drill_point WHERE project_id = ?1 AND site_id = ?2",
            params![site.project_id, site.site_id],
        )?;
        Ok(affected)
    }
}

/// 映射数据库行到 DrillPoint
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DrillPoint> {
    Ok(DrillPoint {
        id: row.get(0)?,
        x: row.get(1)?,
        y: row.get(2)?,
        depth: row.get(3)?,
        diameter: row.get(4)?,
        burden: row.get(5)?,
        spacing: row.get(6)?,
        stemming: row.get(7)?,
        subdrill: row.get(8)?,
        is_completed: row.get(9)?,
        completed_at: row.get(10)?,
    })
}
