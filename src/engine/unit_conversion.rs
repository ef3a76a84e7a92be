// ==========================================
// 农场直销平台 - 单位换算引擎
// ==========================================
// 职责: 单位符号 → 公斤换算系数，正向/反向换算
// 红线: 纯函数，无副作用
// ==========================================
// 换算表可注入（按部署配置），不使用进程级全局常量
// ==========================================

use crate::domain::types::UnknownUnitPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 公斤单位符号
pub const UNIT_KG: &str = "kg";

// ==========================================
// UnitTable - 单位换算表
// ==========================================
/// 单位符号 → 每单位折合公斤数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    factors: BTreeMap<String, f64>,
}

impl Default for UnitTable {
    /// 默认换算表
    ///
    /// | 符号 | 含义 | 公斤 |
    /// |------|------|------|
    /// | kg | 公斤 | 1 |
    /// | heads | 颗 | 4 |
    /// | bags_10kg | 10 公斤袋 | 10 |
    /// | bags_7kg | 7 公斤袋 | 7 |
    /// | crates | 箱 | 20 |
    /// | units | 件 | 4 |
    /// | bunches | 把 | 0.5 |
    fn default() -> Self {
        Self::from_pairs([
            (UNIT_KG, 1.0),
            ("heads", 4.0),
            ("bags_10kg", 10.0),
            ("bags_7kg", 7.0),
            ("crates", 20.0),
            ("units", 4.0),
            ("bunches", 0.5),
        ])
    }
}

impl UnitTable {
    /// 由 (符号, 系数) 列表构造
    ///
    /// 非正数或非有限的系数会被丢弃（否则反向换算会除零）。
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let factors = pairs
            .into_iter()
            .filter(|(_, factor)| factor.is_finite() && *factor > 0.0)
            .map(|(symbol, factor)| (symbol.into(), factor))
            .collect();
        Self { factors }
    }

    /// 查询已登记的系数
    pub fn get(&self, unit: &str) -> Option<f64> {
        self.factors.get(unit).copied()
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.factors.contains_key(unit)
    }

    /// 已登记的单位符号（有序）
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(String::as_str)
    }
}

// ==========================================
// UnitConverter - 单位换算器
// ==========================================
#[derive(Debug, Clone)]
pub struct UnitConverter {
    table: UnitTable,
    policy: UnknownUnitPolicy,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(UnitTable::default(), UnknownUnitPolicy::Reject)
    }
}

impl UnitConverter {
    pub fn new(table: UnitTable, policy: UnknownUnitPolicy) -> Self {
        Self { table, policy }
    }

    pub fn table(&self) -> &UnitTable {
        &self.table
    }

    pub fn policy(&self) -> UnknownUnitPolicy {
        self.policy
    }

    /// 单位是否可被换算（已登记，或 FAIL_OPEN 策略）
    pub fn accepts(&self, unit: &str) -> bool {
        self.table.contains(unit) || self.policy == UnknownUnitPolicy::FailOpen
    }

    /// 换算系数
    ///
    /// # 返回
    /// - Some(factor): 已登记单位；或 FAIL_OPEN 下的未知单位（系数 1）
    /// - None: REJECT 下的未知单位
    pub fn factor(&self, unit: &str) -> Option<f64> {
        match self.table.get(unit) {
            Some(factor) => Some(factor),
            None => match self.policy {
                UnknownUnitPolicy::FailOpen => Some(1.0),
                UnknownUnitPolicy::Reject => None,
            },
        }
    }

    /// 原始单位 → 公斤
    pub fn to_kilograms(&self, quantity: f64, unit: &str) -> Option<f64> {
        self.factor(unit).map(|factor| quantity * factor)
    }

    /// 公斤 → 原始单位
    pub fn from_kilograms(&self, quantity_kg: f64, unit: &str) -> Option<f64> {
        self.factor(unit).map(|factor| quantity_kg / factor)
    }
}
