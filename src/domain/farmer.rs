// ==========================================
// 农场直销平台 - 农户/农场领域模型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Farmer - 农户
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Farm - 农场
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: i64,
    pub farmer_id: i64,
    pub name: String,
    pub location: Option<String>,
}
