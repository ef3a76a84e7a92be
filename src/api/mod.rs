// ==========================================
// 农场直销平台 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 HTTP 处理器调用
// ==========================================

pub mod crop_api;
pub mod error;
pub mod farmer_api;
pub mod order_api;

// 重导出核心类型
pub use crop_api::CropApi;
pub use error::{ApiError, ApiResult};
pub use farmer_api::FarmerApi;
pub use order_api::OrderApi;
