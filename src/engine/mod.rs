// ==========================================
// 农场直销平台 - 引擎层
// ==========================================
// 职责: 单位换算、自动下单分配
// 红线: 引擎只通过 StockStore 访问持久化
// ==========================================

pub mod allocator;
pub mod unit_conversion;

pub use allocator::{
    allocate, AllocatorError, AllocatorResult, AutoOrderAllocator, LineProblem, NormalizedLine,
    ProblemKind, StockStore,
};
pub use unit_conversion::{UnitConverter, UnitTable, UNIT_KG};
