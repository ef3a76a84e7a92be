// ==========================================
// 农场直销平台 - 订单数据仓储
// ==========================================
// 职责: 订单查询、状态流转、待确认订单删除（回补库存）
// 红线: 状态更新使用乐观条件 (WHERE status = 旧状态)
// ==========================================

use crate::common::sql_builder::{ComposedQuery, QuerySchema};
use crate::db::DATETIME_FORMAT;
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::repository::crop_repo::current_timestamp;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query_exec::{query_json_rows, JsonRow};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 订单列表白名单
pub const ORDER_SCHEMA: QuerySchema = QuerySchema {
    filterable: &["status", "buyer_id", "farmer_id", "farm_id", "crop_id", "crop_name"],
    sortable: &["created_at", "updated_at", "quantity_kg", "crop_name", "status"],
    projectable: &[
        "id",
        "buyer_id",
        "farmer_id",
        "farm_id",
        "crop_id",
        "crop_name",
        "quantity_kg",
        "status",
        "created_at",
        "updated_at",
    ],
    search_columns: &["crop_name", "status"],
};

/// 订单列表基础查询
pub const ORDER_BASE_QUERY: &str = "SELECT * FROM orders";

const ORDER_COLUMNS: &str = "id, buyer_id, farmer_id, farm_id, crop_id, crop_name, \
                             quantity_kg, status, created_at, updated_at";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        find_order(&conn, order_id)
    }

    /// 执行组装好的列表查询
    pub fn list(&self, query: &ComposedQuery) -> RepositoryResult<Vec<JsonRow>> {
        let conn = self.get_conn()?;
        query_json_rows(&conn, query)
    }

    /// 某买家的订单（按创建时间）
    pub fn list_by_buyer(&self, buyer_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE buyer_id = ?1 ORDER BY created_at, id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![buyer_id], map_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// 状态流转（乐观条件更新）
    ///
    /// # 参数
    /// - from: 调用方读取到的当前状态
    /// - to: 目标状态（调用方已校验合法性）
    ///
    /// # 返回
    /// - Err(NotFound): 订单不存在
    /// - Err(ConcurrentModification): 状态已被其他请求修改
    pub fn update_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepositoryResult<Order> {
        let conn = self.get_conn()?;
        let now = current_timestamp().format(DATETIME_FORMAT).to_string();

        let affected = conn.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![to.to_db_str(), now, order_id, from.to_db_str()],
        )?;

        if affected == 0 {
            return match find_order(&conn, order_id)? {
                None => Err(not_found(order_id)),
                Some(_) => Err(RepositoryError::ConcurrentModification {
                    entity: "orders".to_string(),
                    id: order_id.to_string(),
                }),
            };
        }

        find_order(&conn, order_id)?.ok_or_else(|| not_found(order_id))
    }

    /// 删除待确认订单并回补库存（同一事务）
    pub fn delete_pending(&self, order_id: &str) -> RepositoryResult<Order> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let order = find_order(&tx, order_id)?.ok_or_else(|| not_found(order_id))?;
        if !order.status.is_deletable() {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "仅待确认订单可删除: order_id={}, status={}",
                order_id, order.status
            )));
        }

        let now = current_timestamp().format(DATETIME_FORMAT).to_string();
        tx.execute(
            r#"UPDATE crops
               SET quantity_available_kg = quantity_available_kg + ?1, updated_at = ?2
               WHERE id = ?3"#,
            params![order.quantity_kg, now, order.crop_id],
        )?;
        tx.execute(
            "DELETE FROM orders WHERE id = ?1 AND status = ?2",
            params![order_id, OrderStatus::Pending.to_db_str()],
        )?;

        tx.commit()?;
        Ok(order)
    }
}

fn not_found(order_id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "orders".to_string(),
        id: order_id.to_string(),
    }
}

fn find_order(conn: &Connection, order_id: &str) -> RepositoryResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
    let order = conn
        .query_row(&sql, params![order_id], map_order_row)
        .optional()?;
    Ok(order)
}

fn map_order_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(7)?;
    let status = OrderStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("未知订单状态: {}", status).into(),
        )
    })?;

    Ok(Order {
        id: row.get(0)?,
        buyer_id: row.get(1)?,
        farmer_id: row.get(2)?,
        farm_id: row.get(3)?,
        crop_id: row.get(4)?,
        crop_name: row.get(5)?,
        quantity_kg: row.get(6)?,
        status,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
