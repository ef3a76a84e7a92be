// ==========================================
// 农场直销平台 - 订单 API
// ==========================================
// 职责: 自动下单、订单查询、状态流转、删除
// ==========================================

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::common::filter_spec::FilterSpec;
use crate::common::sql_builder::{FarmLinkFilters, SqlDialect};
use crate::domain::order::{AutoOrderSummary, Order, OrderRequestLine};
use crate::domain::types::OrderStatus;
use crate::engine::allocator::AutoOrderAllocator;
use crate::perf::PerfGuard;
use crate::repository::crop_repo::CropStockRepository;
use crate::repository::order_repo::{OrderRepository, ORDER_BASE_QUERY, ORDER_SCHEMA};
use crate::repository::query_exec::JsonRow;

// ==========================================
// OrderApi - 订单 API
// ==========================================
pub struct OrderApi {
    allocator: Arc<AutoOrderAllocator<CropStockRepository>>,
    order_repo: Arc<OrderRepository>,
    sql_dialect: SqlDialect,
    max_page_limit: u32,
}

impl OrderApi {
    /// 创建新的OrderApi实例
    ///
    /// # 参数
    /// - allocator: 自动下单分配引擎
    /// - order_repo: 订单仓储
    /// - sql_dialect: 列表分页方言
    /// - max_page_limit: 列表最大每页条数
    pub fn new(
        allocator: Arc<AutoOrderAllocator<CropStockRepository>>,
        order_repo: Arc<OrderRepository>,
        sql_dialect: SqlDialect,
        max_page_limit: u32,
    ) -> Self {
        Self {
            allocator,
            order_repo,
            sql_dialect,
            max_page_limit,
        }
    }

    /// 自动下单
    ///
    /// # 参数
    /// - buyer_id: 下单人（请求头 X-User-Id）
    /// - lines: 请求行
    ///
    /// # 返回
    /// - Ok(summary): 已创建订单 + 缺口（部分满足不是错误）
    /// - Err(ApiError::OrderValidationError): 任一行不合法，未写入任何数据
    pub fn place_auto_order(
        &self,
        buyer_id: &str,
        lines: &[OrderRequestLine],
    ) -> ApiResult<AutoOrderSummary> {
        let _perf = PerfGuard::new("order.place_auto_order");

        let buyer_id = buyer_id.trim();
        if buyer_id.is_empty() {
            return Err(ApiError::InvalidInput("缺少下单人标识".to_string()));
        }

        let summary = self.allocator.place_auto_order(buyer_id, lines)?;
        info!(
            buyer_id,
            orders_created = summary.orders_created,
            unfulfilled = summary.unfulfilled_requests.len(),
            "自动下单完成"
        );
        Ok(summary)
    }

    /// 订单列表（过滤/搜索/排序/投影/分页）
    pub fn list_orders<K, V>(&self, pairs: &[(K, V)]) -> ApiResult<Vec<JsonRow>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let _perf = PerfGuard::new("order.list_orders");

        let spec = FilterSpec::from_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
        let query = FarmLinkFilters::new(ORDER_BASE_QUERY, &spec, &ORDER_SCHEMA)
            .dialect(self.sql_dialect)
            .max_limit(self.max_page_limit)
            .compose()?;

        Ok(self.order_repo.list(&query)?)
    }

    /// 查询单个订单
    pub fn get_order(&self, order_id: &str) -> ApiResult<Order> {
        self.order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", order_id)))
    }

    /// 订单状态流转（仅允许逐级前进）
    pub fn update_order_status(&self, order_id: &str, new_status: &str) -> ApiResult<Order> {
        let _perf = PerfGuard::new("order.update_status");

        let target = OrderStatus::parse(new_status)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知订单状态: {}", new_status)))?;
        let current = self.get_order(order_id)?;

        if !current.status.can_transition_to(target) {
            warn!(order_id, from = %current.status, to = %target, "非法状态转换");
            return Err(ApiError::InvalidStateTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            });
        }

        let updated = self
            .order_repo
            .update_status(order_id, current.status, target)?;
        info!(order_id, from = %current.status, to = %target, "订单状态已更新");
        Ok(updated)
    }

    /// 删除待确认订单（库存回补）
    pub fn delete_order(&self, order_id: &str) -> ApiResult<Order> {
        let _perf = PerfGuard::new("order.delete");

        let deleted = self.order_repo.delete_pending(order_id)?;
        info!(
            order_id,
            crop_id = deleted.crop_id,
            restored_kg = deleted.quantity_kg,
            "订单已删除，库存已回补"
        );
        Ok(deleted)
    }
}
