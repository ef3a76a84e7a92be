// ==========================================
// 农场直销平台 - 自动下单分配引擎
// ==========================================
// 输入: 下单请求行 [{crop, quantity, unit}]
// 输出: 订单 + 缺口汇总
// ==========================================
// 流程:
// 1) 校验 + 单位归一为公斤（任一行不合法则整批拒绝，不触碰库存）
// 2) 按作物拉取候选库存（可售量降序 → 农户ID升序）
// 3) 贪心分配: 每条记录消耗 min(剩余请求, 可售)
// 4) 剩余未满足部分记为缺口（按原始单位回显）
// 5) 单事务提交: 重新校验库存 → 扣减 → 每条库存记录一张订单
// ==========================================
// 红线: 缺货不是错误，部分满足是正常输出
// ==========================================

use crate::domain::crop::{sort_candidates, CropStockRecord};
use crate::domain::order::{
    Allocation, AllocationPlan, AutoOrderSummary, LineAllocation, Order, OrderRequestLine,
    UnfulfilledRequest,
};
use crate::engine::unit_conversion::UnitConverter;
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// 公斤比较容差
pub const KG_EPSILON: f64 = 1e-9;

/// 默认提交重试次数（库存冲突时）
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 3;

// ==========================================
// StockStore - 库存存储协作方
// ==========================================
/// 分配引擎依赖的持久化接口
///
/// `commit_allocations` 必须是原子的：要么全部扣减并建单，要么全部回滚。
/// 实现方需在事务内按库存ID升序重新读取记录，任一记录不足即返回
/// `RepositoryError::StockConflict`。
pub trait StockStore: Send + Sync {
    /// 返回 `crop_names` 中存在于作物目录的名称
    fn known_crops(&self, crop_names: &[String]) -> RepositoryResult<HashSet<String>>;

    /// 查询某作物所有可售量 > 0 的库存记录
    fn fetch_available_stock(&self, crop_name: &str) -> RepositoryResult<Vec<CropStockRecord>>;

    /// 原子扣减库存并为每条分配创建一张待确认订单
    fn commit_allocations(
        &self,
        buyer_id: &str,
        allocations: &[Allocation],
    ) -> RepositoryResult<Vec<Order>>;
}

// ==========================================
// 错误类型
// ==========================================

/// 校验问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemKind {
    NonPositiveQuantity,
    /// 换算为公斤后溢出（非有限值）
    QuantityOutOfRange,
    UnknownCrop,
    UnknownUnit,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::NonPositiveQuantity => write!(f, "NON_POSITIVE_QUANTITY"),
            ProblemKind::QuantityOutOfRange => write!(f, "QUANTITY_OUT_OF_RANGE"),
            ProblemKind::UnknownCrop => write!(f, "UNKNOWN_CROP"),
            ProblemKind::UnknownUnit => write!(f, "UNKNOWN_UNIT"),
        }
    }
}

/// 单行校验问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProblem {
    pub line_index: usize,
    pub crop: String,
    pub kind: ProblemKind,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum AllocatorError {
    #[error("下单请求为空")]
    EmptyRequest,

    #[error("下单请求校验失败: {}", summarize_problems(.0))]
    Validation(Vec<LineProblem>),

    /// 提交失败，已整体回滚；调用方应重新发起整个分配
    #[error("订单持久化失败: {message}")]
    Persistence { message: String, retryable: bool },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn summarize_problems(problems: &[LineProblem]) -> String {
    problems
        .iter()
        .map(|p| format!("第{}行({}): {}", p.line_index + 1, p.crop, p.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type AllocatorResult<T> = Result<T, AllocatorError>;

// ==========================================
// NormalizedLine - 归一化后的请求行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLine {
    pub line_index: usize,
    pub crop: String,
    pub unit: String,
    pub requested_kg: f64,
}

// ==========================================
// AutoOrderAllocator - 自动下单分配引擎
// ==========================================
pub struct AutoOrderAllocator<S: StockStore> {
    store: Arc<S>,
    converter: UnitConverter,
    max_commit_retries: u32,
}

impl<S: StockStore> AutoOrderAllocator<S> {
    pub fn new(store: Arc<S>, converter: UnitConverter) -> Self {
        Self {
            store,
            converter,
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
        }
    }

    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 自动下单
    ///
    /// 校验失败时不做任何写入；库存冲突时重新规划并重试，
    /// 超过重试次数后返回可重试的 `Persistence` 错误。
    #[instrument(skip(self, lines), fields(buyer_id = %buyer_id, lines = lines.len()))]
    pub fn place_auto_order(
        &self,
        buyer_id: &str,
        lines: &[OrderRequestLine],
    ) -> AllocatorResult<AutoOrderSummary> {
        let normalized = self.validate(lines)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let plan = self.plan(&normalized)?;

            if plan.is_empty() {
                info!("无可用库存，未创建订单");
                return Ok(self.summarize(&plan, Vec::new()));
            }

            match self.store.commit_allocations(buyer_id, &plan.per_stock) {
                Ok(orders) => {
                    info!(
                        attempt,
                        orders_created = orders.len(),
                        "自动下单提交成功"
                    );
                    return Ok(self.summarize(&plan, orders));
                }
                Err(RepositoryError::StockConflict {
                    stock_id,
                    requested_kg,
                    available_kg,
                }) if attempt <= self.max_commit_retries => {
                    warn!(
                        attempt,
                        stock_id,
                        requested_kg,
                        available_kg,
                        "库存已变化，重新规划分配"
                    );
                }
                Err(e) => {
                    warn!(attempt, error = %e, "自动下单提交失败，已回滚");
                    return Err(AllocatorError::Persistence {
                        message: e.to_string(),
                        retryable: true,
                    });
                }
            }
        }
    }

    /// 步骤1: 校验并归一化
    ///
    /// 收集全部问题后一次性返回，不做部分处理。
    pub fn validate(&self, lines: &[OrderRequestLine]) -> AllocatorResult<Vec<NormalizedLine>> {
        if lines.is_empty() {
            return Err(AllocatorError::EmptyRequest);
        }

        let distinct: Vec<String> = lines
            .iter()
            .map(|l| l.crop.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let known = self.store.known_crops(&distinct)?;

        let mut problems = Vec::new();
        let mut normalized = Vec::with_capacity(lines.len());

        for (line_index, line) in lines.iter().enumerate() {
            let crop = line.crop.trim().to_string();
            let unit = line.unit.trim().to_string();
            let mut line_ok = true;

            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                problems.push(LineProblem {
                    line_index,
                    crop: crop.clone(),
                    kind: ProblemKind::NonPositiveQuantity,
                    reason: format!("数量必须为正数: {}", line.quantity),
                });
                line_ok = false;
            }

            if crop.is_empty() || !known.contains(&crop) {
                problems.push(LineProblem {
                    line_index,
                    crop: crop.clone(),
                    kind: ProblemKind::UnknownCrop,
                    reason: format!("未知作物: '{}'", crop),
                });
                line_ok = false;
            }

            let requested_kg = self.converter.to_kilograms(line.quantity, &unit);
            match requested_kg {
                None => {
                    problems.push(LineProblem {
                        line_index,
                        crop: crop.clone(),
                        kind: ProblemKind::UnknownUnit,
                        reason: format!("未知单位: '{}'", unit),
                    });
                    line_ok = false;
                }
                Some(kg) if line.quantity.is_finite() && !kg.is_finite() => {
                    problems.push(LineProblem {
                        line_index,
                        crop: crop.clone(),
                        kind: ProblemKind::QuantityOutOfRange,
                        reason: format!("数量超出范围: {} {}", line.quantity, unit),
                    });
                    line_ok = false;
                }
                Some(_) => {}
            }

            if let (true, Some(requested_kg)) = (line_ok, requested_kg) {
                normalized.push(NormalizedLine {
                    line_index,
                    crop,
                    unit,
                    requested_kg,
                });
            }
        }

        if !problems.is_empty() {
            warn!(problems = problems.len(), "下单请求校验失败");
            return Err(AllocatorError::Validation(problems));
        }

        Ok(normalized)
    }

    /// 步骤2-4: 拉取候选库存并生成分配方案（不写库）
    pub fn plan(&self, lines: &[NormalizedLine]) -> AllocatorResult<AllocationPlan> {
        let mut candidates: HashMap<String, Vec<CropStockRecord>> = HashMap::new();
        for line in lines {
            if candidates.contains_key(&line.crop) {
                continue;
            }
            let records = self.store.fetch_available_stock(&line.crop)?;
            debug!(crop = %line.crop, candidates = records.len(), "候选库存");
            candidates.insert(line.crop.clone(), records);
        }

        Ok(allocate(lines, candidates))
    }

    /// 汇总输出（缺口按原始单位回显）
    fn summarize(&self, plan: &AllocationPlan, orders: Vec<Order>) -> AutoOrderSummary {
        let unfulfilled_requests = plan
            .lines
            .iter()
            .filter(|line| !line.is_fulfilled())
            .map(|line| UnfulfilledRequest {
                crop: line.crop.clone(),
                shortfall: self
                    .converter
                    .from_kilograms(line.shortfall_kg, &line.unit)
                    .unwrap_or(line.shortfall_kg),
                shortfall_kg: line.shortfall_kg,
                unit_display: line.unit.clone(),
            })
            .collect();

        AutoOrderSummary {
            orders_created: orders.len(),
            orders,
            unfulfilled_requests,
        }
    }
}

// ==========================================
// 贪心分配（纯函数）
// ==========================================

/// 在给定候选库存上执行贪心分配
///
/// 同一作物的多行请求共享同一份库存视图：后一行只能看到前一行消耗后的余量。
/// 同一库存记录被多行消耗时，`per_stock` 中合并为一条。
pub fn allocate(
    lines: &[NormalizedLine],
    mut candidates: HashMap<String, Vec<CropStockRecord>>,
) -> AllocationPlan {
    for records in candidates.values_mut() {
        records.retain(|r| r.available_kg > KG_EPSILON);
        sort_candidates(records);
    }

    let mut line_results = Vec::with_capacity(lines.len());
    let mut per_stock: BTreeMap<i64, Allocation> = BTreeMap::new();

    for line in lines {
        let mut remaining = line.requested_kg;
        let mut allocations = Vec::new();

        if let Some(records) = candidates.get_mut(&line.crop) {
            for record in records.iter_mut() {
                if remaining <= KG_EPSILON {
                    break;
                }
                let take = remaining.min(record.available_kg);
                if take <= KG_EPSILON {
                    continue;
                }

                record.available_kg -= take;
                remaining -= take;

                let allocation = Allocation {
                    stock_id: record.id,
                    farmer_id: record.farmer_id,
                    farm_id: record.farm_id,
                    crop_name: record.crop_name.clone(),
                    kg: take,
                };
                per_stock
                    .entry(record.id)
                    .and_modify(|a| a.kg += take)
                    .or_insert_with(|| allocation.clone());
                allocations.push(allocation);
            }
        }

        let shortfall_kg = if remaining > KG_EPSILON { remaining } else { 0.0 };
        line_results.push(LineAllocation {
            line_index: line.line_index,
            crop: line.crop.clone(),
            unit: line.unit.clone(),
            requested_kg: line.requested_kg,
            allocations,
            shortfall_kg,
        });
    }

    AllocationPlan {
        lines: line_results,
        per_stock: per_stock.into_values().collect(),
    }
}
