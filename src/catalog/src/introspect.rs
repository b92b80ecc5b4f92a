// Copyright 2024 The Tablewave Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bulk schema introspector (spec.md §4.6): reconstructs the full
//! table/column/PK/FK catalog of one schema in four fixed catalog queries,
//! independent of table count.

use std::collections::HashMap;

use thiserror::Error;
use tiberius::Client;
use futures::io::{AsyncRead, AsyncWrite};

use tablewave_common::model::{ColumnInfo, ForeignKeyInfo, SqlTypeCode, TableMetadata};

use crate::sort::resolve_sort_strategy;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("catalog query `{query}` failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: tiberius::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, IntrospectError>;

/// System tables excluded from discovery regardless of the filter policy
/// in `tablewave_catalog::filter`, unless `includeSystemTables` is set
/// (spec.md §4.6).
const SYSTEM_PREFIXES: &[&str] = &["sys", "msreplication", "spt_", "__"];
const SYSTEM_EXACT: &[&str] = &["sysdiagrams", "dtproperties"];

fn is_system_table(name: &str) -> bool {
    SYSTEM_EXACT.contains(&name)
        || SYSTEM_PREFIXES.iter().any(|p| name.starts_with(p))
        || name.contains('$')
}

/// The four bulk mappings C6 is responsible for producing.
#[derive(Debug, Default)]
pub struct BulkCatalog {
    pub primary_keys: HashMap<String, Vec<String>>,
    pub foreign_keys: HashMap<String, Vec<ForeignKeyInfo>>,
    pub columns: HashMap<String, Vec<ColumnInfo>>,
    pub row_counts: HashMap<String, i64>,
}

impl BulkCatalog {
    pub fn primary_keys_for(&self, table: &str) -> &[String] {
        self.primary_keys.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn foreign_keys_for(&self, table: &str) -> &[ForeignKeyInfo] {
        self.foreign_keys.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn columns_for(&self, table: &str) -> &[ColumnInfo] {
        self.columns.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn row_count_for(&self, table: &str) -> i64 {
        *self.row_counts.get(table).unwrap_or(&-1)
    }
}

/// Discovers base table names in `schema`, in catalog order.
pub async fn discover_tables<S>(
    client: &mut Client<S>,
    schema: &str,
    include_system_tables: bool,
) -> Result<Vec<String>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    const QUERY: &str = "discover_tables";
    let sql = "SELECT t.name AS table_name \
               FROM sys.tables t \
               WHERE SCHEMA_NAME(t.schema_id) = @P1 AND t.type = 'U' \
               ORDER BY t.name";
    let rows = client
        .query(sql, &[&schema])
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?
        .into_first_result()
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.get::<&str, _>("table_name").map(str::to_owned))
        .filter(|name| include_system_tables || !is_system_table(name))
        .collect())
}

/// One catalog query joining the PK constraint view to its column-usage
/// view, ordered by table then ordinal.
async fn extract_primary_keys<S>(client: &mut Client<S>, schema: &str) -> Result<HashMap<String, Vec<String>>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    const QUERY: &str = "extract_primary_keys";
    let sql = "SELECT t.name AS table_name, c.name AS column_name \
               FROM sys.indexes i \
               INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
               INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
               INNER JOIN sys.tables t ON i.object_id = t.object_id \
               WHERE i.is_primary_key = 1 AND SCHEMA_NAME(t.schema_id) = @P1 \
               ORDER BY t.name, ic.key_ordinal";
    let rows = client
        .query(sql, &[&schema])
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?
        .into_first_result()
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?;

    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let table: &str = row.get("table_name").unwrap_or_default();
        let column: &str = row.get("column_name").unwrap_or_default();
        out.entry(table.to_owned()).or_default().push(column.to_owned());
    }
    Ok(out)
}

/// One catalog query over the server's foreign-key system views.
async fn extract_foreign_keys<S>(
    client: &mut Client<S>,
    schema: &str,
) -> Result<HashMap<String, Vec<ForeignKeyInfo>>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    const QUERY: &str = "extract_foreign_keys";
    let sql = "SELECT OBJECT_NAME(fkc.constraint_object_id) AS constraint_name, \
               parent_table.name AS table_name, \
               parent_column.name AS column_name, \
               SCHEMA_NAME(referenced_table.schema_id) AS referenced_schema, \
               referenced_table.name AS referenced_table, \
               referenced_column.name AS referenced_column, \
               fkc.constraint_column_id AS key_sequence \
               FROM sys.foreign_key_columns AS fkc \
               INNER JOIN sys.tables AS parent_table ON fkc.parent_object_id = parent_table.object_id \
               INNER JOIN sys.tables AS referenced_table ON fkc.referenced_object_id = referenced_table.object_id \
               INNER JOIN sys.columns AS parent_column \
                   ON fkc.parent_object_id = parent_column.object_id AND fkc.parent_column_id = parent_column.column_id \
               INNER JOIN sys.columns AS referenced_column \
                   ON fkc.referenced_object_id = referenced_column.object_id \
                   AND fkc.referenced_column_id = referenced_column.column_id \
               WHERE SCHEMA_NAME(parent_table.schema_id) = @P1 \
               ORDER BY table_name, constraint_name, key_sequence";
    let rows = client
        .query(sql, &[&schema])
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?
        .into_first_result()
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?;

    let mut out: HashMap<String, Vec<ForeignKeyInfo>> = HashMap::new();
    for row in rows {
        let table: &str = row.get("table_name").unwrap_or_default();
        let key_sequence: i32 = row.get("key_sequence").unwrap_or(1);
        let fk = ForeignKeyInfo {
            constraint_name: row.get::<&str, _>("constraint_name").unwrap_or_default().to_owned(),
            local_column: row.get::<&str, _>("column_name").unwrap_or_default().to_owned(),
            referenced_schema: row.get::<&str, _>("referenced_schema").unwrap_or_default().to_owned(),
            referenced_table: row.get::<&str, _>("referenced_table").unwrap_or_default().to_owned(),
            referenced_column: row.get::<&str, _>("referenced_column").unwrap_or_default().to_owned(),
            key_sequence: key_sequence as u32,
        };
        out.entry(table.to_owned()).or_default().push(fk);
    }
    Ok(out)
}

/// One query over the columns catalog, translating `sys.types` type names
/// to the closed [`SqlTypeCode`] dispatch set.
async fn extract_columns<S>(client: &mut Client<S>, schema: &str) -> Result<HashMap<String, Vec<ColumnInfo>>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    const QUERY: &str = "extract_columns";
    let sql = "SELECT t.name AS table_name, c.name AS column_name, ty.name AS type_name, \
               c.max_length AS max_length, c.is_nullable AS is_nullable, \
               COLUMNPROPERTY(c.object_id, c.name, 'IsIdentity') AS is_identity, \
               c.column_id AS ordinal \
               FROM sys.columns c \
               INNER JOIN sys.tables t ON c.object_id = t.object_id \
               INNER JOIN sys.types ty ON c.user_type_id = ty.user_type_id \
               WHERE SCHEMA_NAME(t.schema_id) = @P1 \
               ORDER BY t.name, c.column_id";
    let rows = client
        .query(sql, &[&schema])
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?
        .into_first_result()
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?;

    let mut out: HashMap<String, Vec<ColumnInfo>> = HashMap::new();
    for row in rows {
        let table: &str = row.get("table_name").unwrap_or_default();
        let type_name: &str = row.get("type_name").unwrap_or_default();
        let column = ColumnInfo {
            name: row.get::<&str, _>("column_name").unwrap_or_default().to_owned(),
            sql_type_code: SqlTypeCode::from_type_name(type_name),
            type_name: type_name.to_owned(),
            size: row.get::<i16, _>("max_length").unwrap_or(0) as i64,
            nullable: row.get("is_nullable").unwrap_or(true),
            auto_increment: row.get::<i32, _>("is_identity").unwrap_or(0) != 0,
            ordinal: row.get::<i32, _>("ordinal").unwrap_or(0) as u32,
        };
        out.entry(table.to_owned()).or_default().push(column);
    }
    Ok(out)
}

/// One query over the partitions catalog, summing `rows` over heap/clustered
/// index ids (0, 1).
async fn extract_row_counts<S>(client: &mut Client<S>, schema: &str) -> Result<HashMap<String, i64>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    const QUERY: &str = "extract_row_counts";
    let sql = "SELECT t.name AS table_name, SUM(p.rows) AS estimated_rows \
               FROM sys.tables t \
               INNER JOIN sys.partitions p ON t.object_id = p.object_id \
               WHERE SCHEMA_NAME(t.schema_id) = @P1 AND p.index_id IN (0, 1) \
               GROUP BY t.name";
    let rows = client
        .query(sql, &[&schema])
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?
        .into_first_result()
        .await
        .map_err(|source| IntrospectError::Query { query: QUERY, source })?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let table: &str = row.get("table_name")?;
            let count: i64 = row.get("estimated_rows").unwrap_or(0);
            Some((table.to_owned(), count))
        })
        .collect())
}

/// Runs all four bulk catalog queries. A constant four round trips,
/// independent of table count — the dominant win over a per-table design
/// (spec.md §4.6, "Why bulk").
pub async fn extract_bulk_catalog<S>(client: &mut Client<S>, schema: &str) -> Result<BulkCatalog>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    Ok(BulkCatalog {
        primary_keys: extract_primary_keys(client, schema).await?,
        foreign_keys: extract_foreign_keys(client, schema).await?,
        columns: extract_columns(client, schema).await?,
        row_counts: extract_row_counts(client, schema).await?,
    })
}

/// Assembles [`TableMetadata`] for each discovered table, attaching the
/// sort strategy resolved by C5. Missing entries in any bulk mapping
/// default to empty lists / `-1` (spec.md §4.6).
pub fn assemble_table_metadata(
    tables: &[String],
    schema: &str,
    catalog: &BulkCatalog,
) -> Vec<TableMetadata> {
    tables
        .iter()
        .map(|table| {
            let columns = catalog.columns_for(table).to_vec();
            let primary_key_columns = catalog.primary_keys_for(table).to_vec();
            let sort_strategy = resolve_sort_strategy(&columns, &primary_key_columns);
            TableMetadata {
                table_name: table.clone(),
                schema_name: schema.to_owned(),
                primary_key_columns,
                foreign_keys: catalog.foreign_keys_for(table).to_vec(),
                columns,
                sort_strategy,
                estimated_row_count: catalog.row_count_for(table),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewave_common::model::SortStrategy;

    #[test]
    fn is_system_table_matches_defaults() {
        assert!(is_system_table("sysdiagrams"));
        assert!(is_system_table("sysjobs"));
        assert!(is_system_table("spt_values"));
        assert!(is_system_table("__migrations"));
        assert!(is_system_table("foo$bar"));
        assert!(!is_system_table("orders"));
    }

    #[test]
    fn assemble_fills_missing_entries_with_defaults() {
        let catalog = BulkCatalog::default();
        let metadata = assemble_table_metadata(&["orphan".to_owned()], "dbo", &catalog);
        assert_eq!(metadata.len(), 1);
        let md = &metadata[0];
        assert!(md.primary_key_columns.is_empty());
        assert!(md.foreign_keys.is_empty());
        assert!(md.columns.is_empty());
        assert_eq!(md.estimated_row_count, -1);
        assert!(matches!(md.sort_strategy, SortStrategy::NoSort));
    }
}
