// ==========================================
// 农场直销平台 - 运行期配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id='global')
// ==========================================

use crate::common::sql_builder::{SqlDialect, DEFAULT_MAX_PAGE_LIMIT};
use crate::db::open_sqlite_connection;
use crate::domain::types::UnknownUnitPolicy;
use crate::engine::allocator::DEFAULT_MAX_COMMIT_RETRIES;
use crate::engine::unit_conversion::UnitTable;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 配置键
pub mod config_keys {
    /// 单位换算表 JSON: {"kg": 1, "crates": 20, ...}
    pub const UNIT_FACTORS: &str = "unit_factors";
    /// 未知单位策略: FAIL_OPEN / REJECT
    pub const UNKNOWN_UNIT_POLICY: &str = "unknown_unit_policy";
    /// 分页方言: LIMIT_OFFSET / OFFSET_FETCH
    pub const SQL_DIALECT: &str = "sql_dialect";
    /// 库存冲突时的最大重试次数
    pub const ALLOCATION_MAX_RETRIES: &str = "allocation_max_retries";
    /// 列表接口最大每页条数
    pub const MAX_PAGE_LIMIT: &str = "max_page_limit";
}

// ==========================================
// ServiceConfig - 业务配置（类型化）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub unit_table: UnitTable,
    pub unknown_unit_policy: UnknownUnitPolicy,
    pub sql_dialect: SqlDialect,
    pub allocation_max_retries: u32,
    pub max_page_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            unit_table: UnitTable::default(),
            unknown_unit_policy: UnknownUnitPolicy::Reject,
            sql_dialect: SqlDialect::LimitOffset,
            allocation_max_retries: DEFAULT_MAX_COMMIT_RETRIES,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
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

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 单位换算表
    ///
    /// 配置不存在或格式错误时回退默认表
    pub fn get_unit_table(&self) -> Result<UnitTable, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::UNIT_FACTORS)? {
            Some(v) => v,
            None => return Ok(UnitTable::default()),
        };

        match serde_json::from_str::<BTreeMap<String, f64>>(&raw) {
            Ok(map) if !map.is_empty() => Ok(UnitTable::from_pairs(map)),
            Ok(_) => Ok(UnitTable::default()),
            Err(e) => {
                tracing::warn!(error = %e, "unit_factors 配置格式错误，使用默认换算表");
                Ok(UnitTable::default())
            }
        }
    }

    /// 未知单位策略（默认 REJECT）
    pub fn get_unknown_unit_policy(&self) -> Result<UnknownUnitPolicy, Box<dyn Error>> {
        Ok(self
            .get_config_value(config_keys::UNKNOWN_UNIT_POLICY)?
            .map(|v| UnknownUnitPolicy::from_str(&v))
            .unwrap_or(UnknownUnitPolicy::Reject))
    }

    /// 分页方言（默认 LIMIT_OFFSET）
    pub fn get_sql_dialect(&self) -> Result<SqlDialect, Box<dyn Error>> {
        Ok(self
            .get_config_value(config_keys::SQL_DIALECT)?
            .map(|v| SqlDialect::from_str(&v))
            .unwrap_or(SqlDialect::LimitOffset))
    }

    fn get_u32_or(&self, key: &str, default: u32) -> Result<u32, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(default))
    }

    /// 加载完整业务配置
    pub fn load_service_config(&self) -> Result<ServiceConfig, Box<dyn Error>> {
        Ok(ServiceConfig {
            unit_table: self.get_unit_table()?,
            unknown_unit_policy: self.get_unknown_unit_policy()?,
            sql_dialect: self.get_sql_dialect()?,
            allocation_max_retries: self
                .get_u32_or(config_keys::ALLOCATION_MAX_RETRIES, DEFAULT_MAX_COMMIT_RETRIES)?,
            max_page_limit: self
                .get_u32_or(config_keys::MAX_PAGE_LIMIT, DEFAULT_MAX_PAGE_LIMIT)?
                .max(1),
        })
    }
}
