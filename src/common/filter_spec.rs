// ==========================================
// 农场直销平台 - 列表查询参数解析
// ==========================================
// 职责: 把查询串 (key, value) 列表解析为 FilterSpec
// 保留键: page / sort / limit / fields / search
// 其余键按出现顺序成为等值过滤条件
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认页码
pub const DEFAULT_PAGE: u32 = 1;

/// 默认每页条数
pub const DEFAULT_LIMIT: u32 = 100;

/// 排序参数（`sort=column,direction`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: Option<String>,
}

// ==========================================
// FilterSpec - 列表查询规格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// 等值过滤（保持输入顺序，重复键以最后一次取值为准）
    pub filters: Vec<(String, String)>,
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
    pub fields: Option<Vec<String>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            sort: None,
            fields: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl FilterSpec {
    /// 从有序 (key, value) 列表解析
    ///
    /// - page/limit 非数字或 < 1 时回退默认值
    /// - 空 search / 空 fields 视为未提供
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = FilterSpec::default();

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            if key.is_empty() {
                continue;
            }

            match key {
                "page" => spec.page = parse_positive(value, DEFAULT_PAGE),
                "limit" => spec.limit = parse_positive(value, DEFAULT_LIMIT),
                "search" => {
                    spec.search = if value.is_empty() {
                        None
                    } else {
                        Some(value.to_string())
                    }
                }
                "sort" => spec.sort = parse_sort(value),
                "fields" => {
                    let fields: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect();
                    spec.fields = if fields.is_empty() { None } else { Some(fields) };
                }
                _ => {
                    if let Some(existing) = spec.filters.iter_mut().find(|(k, _)| k == key) {
                        existing.1 = value.to_string();
                    } else {
                        spec.filters.push((key.to_string(), value.to_string()));
                    }
                }
            }
        }

        spec
    }

    /// 偏移量 = (page - 1) * limit
    pub fn offset(&self) -> u64 {
        self.offset_for(self.limit)
    }

    /// 按给定每页条数（如经上限截断后）计算偏移量
    pub fn offset_for(&self, limit: u32) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(limit.max(1))
    }
}

fn parse_positive(value: &str, default: u32) -> u32 {
    match value.parse::<i64>() {
        Ok(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => default,
    }
}

fn parse_sort(value: &str) -> Option<SortSpec> {
    let mut parts = value.splitn(2, ',');
    let column = parts.next().map(str::trim).unwrap_or_default();
    if column.is_empty() {
        return None;
    }
    let direction = parts
        .next()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from);

    Some(SortSpec {
        column: column.to_string(),
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys_split_from_filters() {
        let spec = FilterSpec::from_pairs([
            ("location", "Nakuru"),
            ("page", "2"),
            ("search", "john"),
            ("name", "John"),
            ("sort", "name,asc"),
            ("limit", "10"),
            ("fields", "id, name,,email"),
        ]);

        assert_eq!(
            spec.filters,
            vec![
                ("location".to_string(), "Nakuru".to_string()),
                ("name".to_string(), "John".to_string()),
            ]
        );
        assert_eq!(spec.search.as_deref(), Some("john"));
        assert_eq!(
            spec.sort,
            Some(SortSpec {
                column: "name".to_string(),
                direction: Some("asc".to_string())
            })
        );
        assert_eq!(
            spec.fields,
            Some(vec!["id".to_string(), "name".to_string(), "email".to_string()])
        );
        assert_eq!(spec.page, 2);
        assert_eq!(spec.limit, 10);
        assert_eq!(spec.offset(), 10);
    }

    #[test]
    fn test_offset_uses_clamped_limit() {
        let spec = FilterSpec::from_pairs([("page", "3"), ("limit", "100000")]);
        assert_eq!(spec.offset(), 200_000);
        assert_eq!(spec.offset_for(50), 100);
    }

    #[test]
    fn test_pagination_defaults_for_bad_values() {
        for (page, limit) in [("0", "0"), ("-3", "-1"), ("abc", "1.5"), ("", "")] {
            let spec = FilterSpec::from_pairs([("page", page), ("limit", limit)]);
            assert_eq!(spec.page, DEFAULT_PAGE, "page={}", page);
            assert_eq!(spec.limit, DEFAULT_LIMIT, "limit={}", limit);
            assert_eq!(spec.offset(), 0);
        }
    }

    #[test]
    fn test_duplicate_filter_key_keeps_first_position() {
        let spec = FilterSpec::from_pairs([("status", "PENDING"), ("crop_name", "Kale"), ("status", "DISPATCHED")]);
        assert_eq!(
            spec.filters,
            vec![
                ("status".to_string(), "DISPATCHED".to_string()),
                ("crop_name".to_string(), "Kale".to_string()),
            ]
        );
    }

    #[test]
    fn test_sort_without_direction() {
        let spec = FilterSpec::from_pairs([("sort", "email")]);
        assert_eq!(spec.sort.unwrap().direction, None);

        let spec = FilterSpec::from_pairs([("sort", ",desc")]);
        assert!(spec.sort.is_none());
    }

    #[test]
    fn test_empty_search_and_fields_ignored() {
        let spec = FilterSpec::from_pairs([("search", "  "), ("fields", " , ")]);
        assert!(spec.search.is_none());
        assert!(spec.fields.is_none());
        assert!(spec.filters.is_empty());
    }
}
