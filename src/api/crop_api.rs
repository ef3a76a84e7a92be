// ==========================================
// 农场直销平台 - 作物 API
// ==========================================
// 职责: 可售作物汇总、单作物可售量
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::crop::CropAvailability;
use crate::repository::crop_repo::CropStockRepository;

pub struct CropApi {
    crop_repo: Arc<CropStockRepository>,
}

impl CropApi {
    pub fn new(crop_repo: Arc<CropStockRepository>) -> Self {
        Self { crop_repo }
    }

    /// 可售作物列表（Σ可售 > 0，按名称排序）
    pub fn list_available(&self) -> ApiResult<Vec<CropAvailability>> {
        Ok(self.crop_repo.list_available()?)
    }

    /// 单作物可售总量
    ///
    /// 目录中存在但无库存的作物返回 0；未知作物返回 NotFound。
    pub fn availability_details(&self, crop_name: &str) -> ApiResult<CropAvailability> {
        let crop_name = crop_name.trim();
        if crop_name.is_empty() {
            return Err(ApiError::InvalidInput("作物名称不能为空".to_string()));
        }

        match self.crop_repo.total_availability(crop_name)? {
            Some(total) => Ok(CropAvailability {
                crop_name: crop_name.to_string(),
                total_availability_kg: total,
            }),
            None => Err(ApiError::NotFound(format!("作物({})不存在", crop_name))),
        }
    }
}
