// ==========================================
// 农场直销平台 - 应用层
// ==========================================
// 职责: 组装应用状态，对外提供 HTTP 接口
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::build_router;
pub use state::AppState;
