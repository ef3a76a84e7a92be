// ==========================================
// 农场直销平台 - 组装查询执行
// ==========================================
// 职责: 执行 FarmLinkFilters 产出的参数化 SQL
// 投影列可变，结果按列名映射为 JSON 对象
// ==========================================

use crate::common::sql_builder::ComposedQuery;
use crate::repository::error::RepositoryResult;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ToSql};
use serde_json::{Map, Value};

/// 一行结果（列名 → 值）
pub type JsonRow = Map<String, Value>;

/// 执行组装好的查询
pub fn query_json_rows(conn: &Connection, query: &ComposedQuery) -> RepositoryResult<Vec<JsonRow>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let named: Vec<(&str, &dyn ToSql)> = query
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let rows = stmt
        .query_map(named.as_slice(), |row| {
            let mut map = JsonRow::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                map.insert(column.clone(), value_to_json(row.get_ref(idx)?));
            }
            Ok(map)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}
