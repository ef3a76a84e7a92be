// ==========================================
// 农场直销平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod crop_repo;
pub mod error;
pub mod farmer_repo;
pub mod order_repo;
pub mod query_exec;

// 重导出核心仓储
pub use crop_repo::CropStockRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use farmer_repo::{FarmerRepository, FARMER_SCHEMA};
pub use order_repo::{OrderRepository, ORDER_SCHEMA};
pub use query_exec::{query_json_rows, JsonRow};
