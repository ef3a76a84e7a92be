// ==========================================
// 农场直销平台 - 农户 API
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::common::filter_spec::FilterSpec;
use crate::common::sql_builder::{FarmLinkFilters, SqlDialect};
use crate::perf::PerfGuard;
use crate::repository::farmer_repo::{FarmerRepository, FARMER_BASE_QUERY, FARMER_SCHEMA};
use crate::repository::query_exec::JsonRow;

pub struct FarmerApi {
    farmer_repo: Arc<FarmerRepository>,
    sql_dialect: SqlDialect,
    max_page_limit: u32,
}

impl FarmerApi {
    pub fn new(farmer_repo: Arc<FarmerRepository>, sql_dialect: SqlDialect, max_page_limit: u32) -> Self {
        Self {
            farmer_repo,
            sql_dialect,
            max_page_limit,
        }
    }

    /// 农户列表
    ///
    /// # 参数
    /// - pairs: 查询串 (key, value)，支持 page/sort/limit/fields/search 及等值过滤
    pub fn list_farmers<K, V>(&self, pairs: &[(K, V)]) -> ApiResult<Vec<JsonRow>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let _perf = PerfGuard::new("farmer.list");

        let spec = FilterSpec::from_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
        let query = FarmLinkFilters::new(FARMER_BASE_QUERY, &spec, &FARMER_SCHEMA)
            .dialect(self.sql_dialect)
            .max_limit(self.max_page_limit)
            .compose()?;

        Ok(self.farmer_repo.list(&query)?)
    }
}
