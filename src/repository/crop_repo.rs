// ==========================================
// 农场直销平台 - 作物库存数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 库存扣减与建单在同一事务内完成
// ==========================================

use crate::db::DATETIME_FORMAT;
use crate::domain::crop::{CropAvailability, CropStockRecord};
use crate::domain::order::{Allocation, Order};
use crate::domain::types::OrderStatus;
use crate::engine::allocator::{StockStore, KG_EPSILON};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Timelike, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// CropStockRepository - 作物库存仓储
// ==========================================
pub struct CropStockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CropStockRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记库存记录
    ///
    /// # 返回
    /// - Ok(id): 新库存记录ID
    pub fn create_stock(
        &self,
        farmer_id: i64,
        farm_id: i64,
        crop_name: &str,
        available_kg: f64,
    ) -> RepositoryResult<i64> {
        if !available_kg.is_finite() || available_kg < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity_available_kg".to_string(),
                message: format!("可售数量不能为负: {}", available_kg),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO crops (farmer_id, farm_id, crop_name, quantity_available_kg)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![farmer_id, farm_id, crop_name.trim(), available_kg],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按ID查询库存记录
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<CropStockRecord>> {
        let conn = self.get_conn()?;
        let record = conn
            .query_row(
                r#"SELECT id, farmer_id, farm_id, crop_name, quantity_available_kg
                   FROM crops WHERE id = ?1"#,
                params![id],
                map_stock_row,
            )
            .optional()?;
        Ok(record)
    }

    /// 可售作物汇总（仅 Σ可售 > 0）
    pub fn list_available(&self) -> RepositoryResult<Vec<CropAvailability>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT crop_name, SUM(quantity_available_kg) AS total_kg
            FROM crops
            GROUP BY crop_name
            HAVING SUM(quantity_available_kg) > 0
            ORDER BY crop_name
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CropAvailability {
                    crop_name: row.get(0)?,
                    total_availability_kg: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 某作物的可售总量
    ///
    /// # 返回
    /// - Ok(Some(kg)): 作物在目录中（无库存时为 0）
    /// - Ok(None): 未知作物
    pub fn total_availability(&self, crop_name: &str) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let (count, total): (i64, f64) = conn.query_row(
            r#"SELECT COUNT(*), COALESCE(SUM(quantity_available_kg), 0.0)
               FROM crops WHERE crop_name = ?1"#,
            params![crop_name.trim()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(if count == 0 { None } else { Some(total) })
    }

    /// 在事务内扣减单条库存并创建订单
    ///
    /// 调用方已在同一事务内读取并校验 `current_kg`。
    fn decrement_and_create_order(
        tx: &Transaction<'_>,
        buyer_id: &str,
        allocation: &Allocation,
        current_kg: f64,
        now: NaiveDateTime,
    ) -> RepositoryResult<Order> {
        let remaining = (current_kg - allocation.kg).max(0.0);
        let now_str = now.format(DATETIME_FORMAT).to_string();

        let affected = tx.execute(
            r#"UPDATE crops
               SET quantity_available_kg = ?1, updated_at = ?2
               WHERE id = ?3 AND quantity_available_kg + ?4 >= ?5"#,
            params![remaining, now_str, allocation.stock_id, KG_EPSILON, allocation.kg],
        )?;
        if affected == 0 {
            return Err(RepositoryError::StockConflict {
                stock_id: allocation.stock_id,
                requested_kg: allocation.kg,
                available_kg: current_kg,
            });
        }

        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            buyer_id: buyer_id.to_string(),
            farmer_id: allocation.farmer_id,
            farm_id: allocation.farm_id,
            crop_id: allocation.stock_id,
            crop_name: allocation.crop_name.clone(),
            quantity_kg: allocation.kg,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            r#"INSERT INTO orders (
                id, buyer_id, farmer_id, farm_id, crop_id, crop_name,
                quantity_kg, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                &order.id,
                &order.buyer_id,
                order.farmer_id,
                order.farm_id,
                order.crop_id,
                &order.crop_name,
                order.quantity_kg,
                order.status.to_db_str(),
                &now_str,
                &now_str,
            ],
        )?;

        Ok(order)
    }
}

impl StockStore for CropStockRepository {
    fn known_crops(&self, crop_names: &[String]) -> RepositoryResult<HashSet<String>> {
        if crop_names.is_empty() {
            return Ok(HashSet::new());
        }

        let placeholders = crop_names.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT DISTINCT crop_name FROM crops WHERE crop_name IN ({})",
            placeholders
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let names = stmt
            .query_map(params_from_iter(crop_names.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    fn fetch_available_stock(&self, crop_name: &str) -> RepositoryResult<Vec<CropStockRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, farmer_id, farm_id, crop_name, quantity_available_kg
            FROM crops
            WHERE crop_name = ?1 AND quantity_available_kg > 0
            ORDER BY quantity_available_kg DESC, farmer_id ASC, id ASC
            "#,
        )?;

        let records = stmt
            .query_map(params![crop_name], map_stock_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 原子提交
    ///
    /// IMMEDIATE 事务在开始时即获取写锁，期间其他连接的分配提交会排队等待；
    /// 记录按ID升序读取、校验、扣减。任一记录不足则整体回滚。
    fn commit_allocations(
        &self,
        buyer_id: &str,
        allocations: &[Allocation],
    ) -> RepositoryResult<Vec<Order>> {
        let mut sorted: Vec<&Allocation> = allocations.iter().filter(|a| a.kg > KG_EPSILON).collect();
        sorted.sort_by_key(|a| a.stock_id);

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = current_timestamp();

        let mut orders = Vec::with_capacity(sorted.len());
        for allocation in sorted {
            let current_kg: Option<f64> = tx
                .query_row(
                    "SELECT quantity_available_kg FROM crops WHERE id = ?1",
                    params![allocation.stock_id],
                    |row| row.get(0),
                )
                .optional()?;

            let current_kg = current_kg.ok_or_else(|| RepositoryError::NotFound {
                entity: "crops".to_string(),
                id: allocation.stock_id.to_string(),
            })?;

            if current_kg + KG_EPSILON < allocation.kg {
                // tx 未提交，drop 时回滚
                return Err(RepositoryError::StockConflict {
                    stock_id: allocation.stock_id,
                    requested_kg: allocation.kg,
                    available_kg: current_kg,
                });
            }

            orders.push(Self::decrement_and_create_order(
                &tx, buyer_id, allocation, current_kg, now,
            )?);
        }

        tx.commit()?;
        debug!(orders = orders.len(), "库存扣减与建单已提交");
        Ok(orders)
    }
}

/// 秒级精度（与存储格式一致）
pub(crate) fn current_timestamp() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

fn map_stock_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CropStockRecord> {
    Ok(CropStockRecord {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        farm_id: row.get(2)?,
        crop_name: row.get(3)?,
        available_kg: row.get(4)?,
    })
}
