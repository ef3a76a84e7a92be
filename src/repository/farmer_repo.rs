// ==========================================
// 农场直销平台 - 农户/农场数据仓储
// ==========================================

use crate::common::sql_builder::{ComposedQuery, QuerySchema};
use crate::domain::farmer::{Farm, Farmer};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query_exec::{query_json_rows, JsonRow};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 农户列表白名单
pub const FARMER_SCHEMA: QuerySchema = QuerySchema {
    filterable: &["id", "name", "email", "phone", "location"],
    sortable: &["id", "name", "email", "location", "created_at"],
    projectable: &["id", "name", "email", "phone", "location", "created_at"],
    search_columns: &["name", "email"],
};

/// 农户列表基础查询
pub const FARMER_BASE_QUERY: &str = "SELECT * FROM farmers";

pub struct FarmerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FarmerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记农户
    ///
    /// # 返回
    /// - Ok(id): 新农户ID
    /// - Err(UniqueConstraintViolation): 邮箱已存在
    pub fn create_farmer(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        location: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO farmers (name, email, phone, location) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, phone, location],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 登记农场
    pub fn create_farm(
        &self,
        farmer_id: i64,
        name: &str,
        location: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO farms (farmer_id, name, location) VALUES (?1, ?2, ?3)",
            params![farmer_id, name, location],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, farmer_id: i64) -> RepositoryResult<Option<Farmer>> {
        let conn = self.get_conn()?;
        let farmer = conn
            .query_row(
                "SELECT id, name, email, phone, location, created_at FROM farmers WHERE id = ?1",
                params![farmer_id],
                |row| {
                    Ok(Farmer {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                        location: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(farmer)
    }

    /// 某农户名下的农场
    pub fn find_farms_by_farmer(&self, farmer_id: i64) -> RepositoryResult<Vec<Farm>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, farmer_id, name, location FROM farms WHERE farmer_id = ?1 ORDER BY id",
        )?;
        let farms = stmt
            .query_map(params![farmer_id], |row| {
                Ok(Farm {
                    id: row.get(0)?,
                    farmer_id: row.get(1)?,
                    name: row.get(2)?,
                    location: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(farms)
    }

    /// 执行组装好的列表查询
    pub fn list(&self, query: &ComposedQuery) -> RepositoryResult<Vec<JsonRow>> {
        let conn = self.get_conn()?;
        query_json_rows(&conn, query)
    }
}
