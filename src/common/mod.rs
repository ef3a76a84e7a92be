// ==========================================
// 农场直销平台 - 公共组件
// ==========================================
// 列表查询参数解析 + SQL 组装
// ==========================================

pub mod filter_spec;
pub mod sql_builder;

pub use filter_spec::{FilterSpec, SortSpec};
pub use sql_builder::{ComposedQuery, FarmLinkFilters, QueryError, QueryResult, QuerySchema, SqlDialect};
