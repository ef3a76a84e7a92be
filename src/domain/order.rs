// ==========================================
// 农场直销平台 - 订单领域模型
// ==========================================
// 职责: 自动下单请求、分配结果、订单实体
// 红线: Σ分配量 + 缺口 == 请求量（按行守恒）
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// OrderRequestLine - 下单请求行
// ==========================================
// 每次调用构造，分配结束即丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequestLine {
    pub crop: String,   // 作物名称
    pub quantity: f64,  // 请求数量 (原始单位, > 0)
    pub unit: String,   // 单位符号
}

impl OrderRequestLine {
    pub fn new(crop: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            crop: crop.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

// ==========================================
// Allocation - 单条分配
// ==========================================
// (农户/农场/库存记录, 公斤数)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub stock_id: i64,
    pub farmer_id: i64,
    pub farm_id: i64,
    pub crop_name: String,
    pub kg: f64,
}

// ==========================================
// LineAllocation - 单行分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub line_index: usize,
    pub crop: String,
    pub unit: String,
    pub requested_kg: f64,
    pub allocations: Vec<Allocation>,
    pub shortfall_kg: f64,
}

impl LineAllocation {
    /// 已分配公斤数
    pub fn allocated_kg(&self) -> f64 {
        self.allocations.iter().map(|a| a.kg).sum()
    }

    /// 是否完全满足
    pub fn is_fulfilled(&self) -> bool {
        self.shortfall_kg <= 0.0
    }
}

// ==========================================
// AllocationPlan - 一次调用的完整分配方案
// ==========================================
// lines: 按请求行的分配结果
// per_stock: 按库存记录合并后的扣减量（每条对应一张订单）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub lines: Vec<LineAllocation>,
    pub per_stock: Vec<Allocation>,
}

impl AllocationPlan {
    pub fn is_empty(&self) -> bool {
        self.per_stock.is_empty()
    }
}

// ==========================================
// Order - 订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,              // 订单ID (UUID)
    pub buyer_id: String,        // 买家/管理员
    pub farmer_id: i64,          // 农户
    pub farm_id: i64,            // 农场
    pub crop_id: i64,            // 作物库存记录
    pub crop_name: String,       // 作物名称（冗余，便于列表展示）
    pub quantity_kg: f64,        // 数量 (公斤)
    pub status: OrderStatus,     // 状态
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// 自动下单汇总
// ==========================================

/// 未满足的请求（缺口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfulfilledRequest {
    pub crop: String,
    pub shortfall: f64,     // 原始单位
    pub shortfall_kg: f64,  // 公斤
    pub unit_display: String,
}

/// 自动下单结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoOrderSummary {
    pub orders_created: usize,
    pub orders: Vec<Order>,
    pub unfulfilled_requests: Vec<UnfulfilledRequest>,
}
