// ==========================================
// 农场直销平台 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、状态枚举
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod crop;
pub mod farmer;
pub mod order;
pub mod types;

// 重导出核心类型
pub use crop::{sort_candidates, CropAvailability, CropStockRecord};
pub use farmer::{Farm, Farmer};
pub use order::{
    Allocation, AllocationPlan, AutoOrderSummary, LineAllocation, Order, OrderRequestLine,
    UnfulfilledRequest,
};
pub use types::{OrderStatus, UnknownUnitPolicy};
