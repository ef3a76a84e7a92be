// ==========================================
// 农场直销平台 - 列表查询 SQL 组装器
// ==========================================
// 职责: base query + FilterSpec → 参数化 SELECT
// 流水线: filter → search → sort → limit_fields → paginate
// 约束: 列名一律白名单校验；用户输入一律参数绑定
// ==========================================

use crate::common::filter_spec::FilterSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 未指定排序时的默认排序
pub const DEFAULT_ORDER_BY: &str = "created_at DESC";

/// 搜索参数名
pub const SEARCH_PARAM: &str = ":search";

/// 默认最大每页条数
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 500;

// ==========================================
// SqlDialect - 分页语法方言
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlDialect {
    /// `LIMIT m OFFSET n`（SQLite / PostgreSQL / MySQL）
    LimitOffset,
    /// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`（SQL Server / Oracle / ANSI）
    OffsetFetch,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::LimitOffset => write!(f, "LIMIT_OFFSET"),
            SqlDialect::OffsetFetch => write!(f, "OFFSET_FETCH"),
        }
    }
}

impl SqlDialect {
    /// 从字符串解析方言（无法识别时回退 LIMIT_OFFSET）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "OFFSET_FETCH" => SqlDialect::OffsetFetch,
            _ => SqlDialect::LimitOffset,
        }
    }
}

// ==========================================
// QuerySchema - 列白名单
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct QuerySchema {
    /// 允许等值过滤的列
    pub filterable: &'static [&'static str],
    /// 允许排序的列
    pub sortable: &'static [&'static str],
    /// 允许投影的列
    pub projectable: &'static [&'static str],
    /// 全文搜索匹配的列
    pub search_columns: &'static [&'static str],
}

// ==========================================
// 错误类型
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("不支持的过滤字段: {0}")]
    UnknownFilterColumn(String),

    #[error("不支持的排序字段: {0}")]
    UnknownSortColumn(String),

    #[error("无效的排序方向: {0}（应为 asc 或 desc）")]
    InvalidSortDirection(String),

    #[error("不支持的返回字段: {0}")]
    UnknownField(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

// ==========================================
// ComposedQuery - 组装结果
// ==========================================
/// SQL + 命名参数（参数名含前缀冒号，如 `:search`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub sql: String,
    pub params: Vec<(String, String)>,
}

// ==========================================
// FarmLinkFilters - 流式组装器
// ==========================================
/// 列表查询组装器
///
/// # 示例
/// ```
/// use farm_link::common::filter_spec::FilterSpec;
/// use farm_link::common::sql_builder::{FarmLinkFilters, QuerySchema, SqlDialect};
///
/// const SCHEMA: QuerySchema = QuerySchema {
///     filterable: &["location"],
///     sortable: &["name", "created_at"],
///     projectable: &["id", "name", "email"],
///     search_columns: &["name", "email"],
/// };
///
/// let spec = FilterSpec::from_pairs([("search", "john"), ("sort", "name,asc"), ("page", "2"), ("limit", "10")]);
/// let query = FarmLinkFilters::new("SELECT * FROM farmers", &spec, &SCHEMA)
///     .dialect(SqlDialect::OffsetFetch)
///     .filter().unwrap()
///     .search()
///     .sort().unwrap()
///     .limit_fields().unwrap()
///     .paginate()
///     .build();
///
/// assert_eq!(
///     query.sql,
///     "SELECT * FROM farmers WHERE (name LIKE :search OR email LIKE :search) ORDER BY name asc OFFSET 10 ROWS FETCH NEXT 10 ROWS ONLY"
/// );
/// assert_eq!(query.params, vec![(":search".to_string(), "%john%".to_string())]);
/// ```
#[derive(Debug, Clone)]
pub struct FarmLinkFilters<'a> {
    sql: String,
    spec: &'a FilterSpec,
    schema: &'a QuerySchema,
    dialect: SqlDialect,
    max_limit: u32,
    params: Vec<(String, String)>,
    has_where: bool,
}

impl<'a> FarmLinkFilters<'a> {
    /// 创建组装器
    ///
    /// base_query 不应包含 ORDER BY / LIMIT；可以已含 WHERE（后续条件以 AND 追加）。
    pub fn new(base_query: &str, spec: &'a FilterSpec, schema: &'a QuerySchema) -> Self {
        let sql = base_query.trim().to_string();
        let has_where = sql.to_uppercase().contains(" WHERE ");
        Self {
            sql,
            spec,
            schema,
            dialect: SqlDialect::LimitOffset,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
            params: Vec::new(),
            has_where,
        }
    }

    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn max_limit(mut self, max_limit: u32) -> Self {
        self.max_limit = max_limit.max(1);
        self
    }

    /// 完整流水线（固定顺序）
    pub fn compose(self) -> QueryResult<ComposedQuery> {
        Ok(self
            .filter()?
            .search()
            .sort()?
            .limit_fields()?
            .paginate()
            .build())
    }

    /// 等值过滤: `WHERE k1 = :k1 AND k2 = :k2`
    pub fn filter(mut self) -> QueryResult<Self> {
        let spec = self.spec;
        if spec.filters.is_empty() {
            return Ok(self);
        }

        let mut predicates = Vec::with_capacity(spec.filters.len());
        for (key, value) in &spec.filters {
            if !self.schema.filterable.contains(&key.as_str()) {
                return Err(QueryError::UnknownFilterColumn(key.clone()));
            }
            predicates.push(format!("{} = :{}", key, key));
            self.params.push((format!(":{}", key), value.clone()));
        }

        self.push_condition(&predicates.join(" AND "));
        Ok(self)
    }

    /// 全文搜索: `(name LIKE :search OR email LIKE :search)`，搜索词参数绑定
    pub fn search(mut self) -> Self {
        let spec = self.spec;
        let term = match &spec.search {
            Some(term) if !self.schema.search_columns.is_empty() => term.clone(),
            _ => return self,
        };

        let predicate = self
            .schema
            .search_columns
            .iter()
            .map(|col| format!("{} LIKE {}", col, SEARCH_PARAM))
            .collect::<Vec<_>>()
            .join(" OR ");

        self.push_condition(&format!("({})", predicate));
        self.params
            .push((SEARCH_PARAM.to_string(), format!("%{}%", term)));
        self
    }

    /// 排序: `ORDER BY <col> <dir>`，缺省 `ORDER BY created_at DESC`
    pub fn sort(mut self) -> QueryResult<Self> {
        let spec = self.spec;
        let order_by = match &spec.sort {
            Some(sort) => {
                if !self.schema.sortable.contains(&sort.column.as_str()) {
                    return Err(QueryError::UnknownSortColumn(sort.column.clone()));
                }
                let direction = match &sort.direction {
                    Some(d) => {
                        let lower = d.to_lowercase();
                        if lower != "asc" && lower != "desc" {
                            return Err(QueryError::InvalidSortDirection(d.clone()));
                        }
                        lower
                    }
                    None => "asc".to_string(),
                };
                format!("{} {}", sort.column, direction)
            }
            None => DEFAULT_ORDER_BY.to_string(),
        };

        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(&order_by);
        Ok(self)
    }

    /// 字段投影: 把 `SELECT *` 替换为显式列清单
    pub fn limit_fields(mut self) -> QueryResult<Self> {
        let spec = self.spec;
        let fields = match &spec.fields {
            Some(fields) => fields,
            None => return Ok(self),
        };

        for field in fields {
            if !self.schema.projectable.contains(&field.as_str()) {
                return Err(QueryError::UnknownField(field.clone()));
            }
        }

        if let Some(pos) = self.sql.find("SELECT *") {
            let star = pos + "SELECT ".len();
            self.sql.replace_range(star..star + 1, &fields.join(", "));
        }
        Ok(self)
    }

    /// 分页: offset = (page - 1) * limit
    pub fn paginate(mut self) -> Self {
        let limit = self.spec.limit.clamp(1, self.max_limit);
        let offset = self.spec.offset_for(limit);

        let clause = match self.dialect {
            SqlDialect::LimitOffset => format!(" LIMIT {} OFFSET {}", limit, offset),
            SqlDialect::OffsetFetch => {
                format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit)
            }
        };
        self.sql.push_str(&clause);
        self
    }

    pub fn build(self) -> ComposedQuery {
        ComposedQuery {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push_condition(&mut self, condition: &str) {
        if self.has_where {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.has_where = true;
        }
        self.sql.push_str(condition);
    }
}

// ==========================================
// 单元测试
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    const FARMERS: QuerySchema = QuerySchema {
        filterable: &["location", "name", "email"],
        sortable: &["id", "name", "email", "created_at"],
        projectable: &["id", "name", "email", "location"],
        search_columns: &["name", "email"],
    };

    fn compose(spec: &FilterSpec, dialect: SqlDialect) -> QueryResult<ComposedQuery> {
        FarmLinkFilters::new("SELECT * FROM farmers", spec, &FARMERS)
            .dialect(dialect)
            .compose()
    }

    #[test]
    fn test_search_sort_paginate_offset_fetch() {
        let spec = FilterSpec::from_pairs([
            ("search", "john"),
            ("sort", "name,asc"),
            ("page", "2"),
            ("limit", "10"),
        ]);
        let query = compose(&spec, SqlDialect::OffsetFetch).unwrap();

        assert_eq!(
            query.sql,
            "SELECT * FROM farmers WHERE (name LIKE :search OR email LIKE :search) ORDER BY name asc OFFSET 10 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(query.params, vec![(":search".to_string(), "%john%".to_string())]);
    }

    #[test]
    fn test_no_spec_defaults() {
        let spec = FilterSpec::default();
        let query = compose(&spec, SqlDialect::LimitOffset).unwrap();

        assert_eq!(
            query.sql,
            "SELECT * FROM farmers ORDER BY created_at DESC LIMIT 100 OFFSET 0"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_filters_then_search_joined_with_and() {
        let spec = FilterSpec::from_pairs([
            ("location", "Nakuru"),
            ("name", "John"),
            ("search", "o'brien"),
        ]);
        let query = compose(&spec, SqlDialect::LimitOffset).unwrap();

        assert_eq!(
            query.sql,
            "SELECT * FROM farmers WHERE location = :location AND name = :name AND (name LIKE :search OR email LIKE :search) ORDER BY created_at DESC LIMIT 100 OFFSET 0"
        );
        assert_eq!(
            query.params,
            vec![
                (":location".to_string(), "Nakuru".to_string()),
                (":name".to_string(), "John".to_string()),
                (":search".to_string(), "%o'brien%".to_string()),
            ]
        );
        // 搜索词不进入 SQL 文本
        assert!(!query.sql.contains("brien"));
    }

    #[test]
    fn test_base_query_with_where_appends_and() {
        let spec = FilterSpec::from_pairs([("location", "Eldoret")]);
        let query = FarmLinkFilters::new("SELECT * FROM farmers WHERE active = 1", &spec, &FARMERS)
            .compose()
            .unwrap();

        assert!(query
            .sql
            .starts_with("SELECT * FROM farmers WHERE active = 1 AND location = :location"));
    }

    #[test]
    fn test_field_projection_replaces_wildcard() {
        let spec = FilterSpec::from_pairs([("fields", "id,name"), ("limit", "5")]);
        let query = compose(&spec, SqlDialect::LimitOffset).unwrap();

        assert_eq!(
            query.sql,
            "SELECT id, name FROM farmers ORDER BY created_at DESC LIMIT 5 OFFSET 0"
        );
    }

    #[test]
    fn test_unknown_filter_column_rejected() {
        let spec = FilterSpec::from_pairs([("password_hash", "x")]);
        assert_eq!(
            compose(&spec, SqlDialect::LimitOffset).unwrap_err(),
            QueryError::UnknownFilterColumn("password_hash".to_string())
        );

        let spec = FilterSpec::from_pairs([("name; DROP TABLE farmers", "x")]);
        assert!(matches!(
            compose(&spec, SqlDialect::LimitOffset),
            Err(QueryError::UnknownFilterColumn(_))
        ));
    }

    #[test]
    fn test_unknown_sort_column_and_direction_rejected() {
        let spec = FilterSpec::from_pairs([("sort", "1; --,asc")]);
        assert!(matches!(
            compose(&spec, SqlDialect::LimitOffset),
            Err(QueryError::UnknownSortColumn(_))
        ));

        let spec = FilterSpec::from_pairs([("sort", "name,sideways")]);
        assert_eq!(
            compose(&spec, SqlDialect::LimitOffset).unwrap_err(),
            QueryError::InvalidSortDirection("sideways".to_string())
        );
    }

    #[test]
    fn test_sort_direction_normalized() {
        let spec = FilterSpec::from_pairs([("sort", "email,DESC")]);
        let query = compose(&spec, SqlDialect::LimitOffset).unwrap();
        assert!(query.sql.contains("ORDER BY email desc"));

        let spec = FilterSpec::from_pairs([("sort", "email")]);
        let query = compose(&spec, SqlDialect::LimitOffset).unwrap();
        assert!(query.sql.contains("ORDER BY email asc"));
    }

    #[test]
    fn test_unknown_projection_field_rejected() {
        let spec = FilterSpec::from_pairs([("fields", "id,secret")]);
        assert_eq!(
            compose(&spec, SqlDialect::LimitOffset).unwrap_err(),
            QueryError::UnknownField("secret".to_string())
        );
    }

    #[test]
    fn test_limit_clamped_to_max() {
        let spec = FilterSpec::from_pairs([("limit", "100000"), ("page", "3")]);
        let query = FarmLinkFilters::new("SELECT * FROM farmers", &spec, &FARMERS)
            .max_limit(50)
            .compose()
            .unwrap();
        assert!(query.sql.ends_with("LIMIT 50 OFFSET 100"));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let spec = FilterSpec::from_pairs([
            ("location", "Nakuru"),
            ("search", "ann"),
            ("sort", "id,desc"),
            ("fields", "id,email"),
            ("page", "4"),
            ("limit", "25"),
        ]);
        let first = compose(&spec, SqlDialect::OffsetFetch).unwrap();
        let second = compose(&spec, SqlDialect::OffsetFetch).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!(SqlDialect::from_str("offset_fetch"), SqlDialect::OffsetFetch);
        assert_eq!(SqlDialect::from_str("LIMIT_OFFSET"), SqlDialect::LimitOffset);
        assert_eq!(SqlDialect::from_str("bogus"), SqlDialect::LimitOffset);
    }
}
