// ==========================================
// 农场直销平台 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 买家按作物下单，系统自动在农户库存间分配
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 公共组件 - 列表查询解析与 SQL 组装
pub mod common;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 单位换算与自动分配
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderStatus, UnknownUnitPolicy};

// 领域实体
pub use domain::{
    AutoOrderSummary, CropAvailability, CropStockRecord, Farm, Farmer, Order, OrderRequestLine,
    UnfulfilledRequest,
};

// 引擎
pub use engine::{AutoOrderAllocator, StockStore, UnitConverter, UnitTable};

// 查询组装
pub use common::{FarmLinkFilters, FilterSpec, SqlDialect};

// API
pub use api::{CropApi, FarmerApi, OrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "农场直销平台";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
