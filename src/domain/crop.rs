// ==========================================
// 农场直销平台 - 作物库存领域模型
// ==========================================
// 库存记录由农场/作物子系统维护
// 分配引擎只读取并在事务内扣减
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CropStockRecord - 作物库存记录
// ==========================================
// 唯一键: (farmer_id, farm_id, crop_name)
// 单位: 内部统一以公斤计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropStockRecord {
    pub id: i64,            // 库存记录ID (crops.id)
    pub farmer_id: i64,     // 农户ID
    pub farm_id: i64,       // 农场ID
    pub crop_name: String,  // 作物名称
    pub available_kg: f64,  // 可售数量 (公斤)
}

// ==========================================
// CropAvailability - 作物可售汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropAvailability {
    pub crop_name: String,
    pub total_availability_kg: f64,
}

/// 候选库存排序规则
///
/// 可售量降序 → 农户ID升序 → 记录ID升序。
/// 优先消耗大库存，减少拆单数量，并保证结果可复现。
pub fn sort_candidates(records: &mut [CropStockRecord]) {
    records.sort_by(|a, b| {
        b.available_kg
            .partial_cmp(&a.available_kg)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.farmer_id.cmp(&b.farmer_id))
            .then_with(|| a.id.cmp(&b.id))
    });
}
