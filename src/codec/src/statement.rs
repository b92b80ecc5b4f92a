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

//! Statement builder (spec.md §4.2): composes `SELECT` and `INSERT`
//! statements from table metadata, the row's sort strategy and a row
//! cursor.

use itertools::Itertools;
use tablewave_common::model::{SqlTypeCode, TableMetadata};

use crate::value::{encode_literal, ColumnValue};

/// One column/value pair as reported by the live cursor, in the cursor's
/// own column order. The INSERT's column list mirrors this order (not the
/// metadata's), so a mismatched projection cannot desynchronize columns
/// from values (spec.md §4.2).
pub struct CursorColumn<'a> {
    pub name: &'a str,
    pub sql_type_code: SqlTypeCode,
    pub value: ColumnValue,
}

fn quote_ident(name: &str) -> String {
    format!("[{name}]")
}

fn qualified_table(metadata: &TableMetadata) -> String {
    if metadata.schema_name.is_empty() {
        quote_ident(&metadata.table_name)
    } else {
        format!("{}.{}", quote_ident(&metadata.schema_name), quote_ident(&metadata.table_name))
    }
}

/// `SELECT [TOP n] [c1], [c2], ... FROM [schema].[table] [ORDER BY ...]`.
/// `TOP` is emitted only when `row_limit > 0`; `ORDER BY` only when the
/// table's sort strategy produces a non-empty clause.
pub fn build_select(metadata: &TableMetadata, row_limit: i64) -> String {
    let columns = metadata
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .join(", ");

    let top_clause = if row_limit > 0 {
        format!("TOP {row_limit} ")
    } else {
        String::new()
    };

    let order_by = metadata.sort_strategy.order_by_clause();
    let order_clause = if order_by.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {order_by}")
    };

    format!(
        "SELECT {top_clause}{columns} FROM {}{order_clause}",
        qualified_table(metadata)
    )
}

/// `INSERT INTO [schema].[table] ([c1], [c2], ...) VALUES (v1, v2, ...);`
pub fn build_insert(metadata: &TableMetadata, row: &[CursorColumn<'_>]) -> String {
    let columns = row.iter().map(|c| quote_ident(c.name)).join(", ");
    let values = row
        .iter()
        .map(|c| encode_literal(&c.value, c.sql_type_code))
        .join(", ");

    format!(
        "INSERT INTO {} ({columns}) VALUES ({values});",
        qualified_table(metadata)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewave_common::model::{ColumnInfo, SortStrategy};

    fn metadata(sort_strategy: SortStrategy) -> TableMetadata {
        TableMetadata {
            table_name: "orders".into(),
            schema_name: "dbo".into(),
            primary_key_columns: vec!["id".into()],
            foreign_keys: vec![],
            columns: vec![
                ColumnInfo {
                    name: "id".into(),
                    sql_type_code: SqlTypeCode::Integer,
                    type_name: "int".into(),
                    size: 4,
                    nullable: false,
                    auto_increment: true,
                    ordinal: 0,
                },
                ColumnInfo {
                    name: "customer".into(),
                    sql_type_code: SqlTypeCode::NVarChar,
                    type_name: "nvarchar".into(),
                    size: 100,
                    nullable: true,
                    ordinal: 1,
                    auto_increment: false,
                },
            ],
            sort_strategy,
            estimated_row_count: 10,
        }
    }

    #[test]
    fn select_includes_top_and_order_by() {
        let md = metadata(SortStrategy::PrimaryKeyBased { key_columns: vec!["id".into()] });
        let sql = build_select(&md, 10);
        assert_eq!(
            sql,
            "SELECT TOP 10 [id], [customer] FROM [dbo].[orders] ORDER BY [id] DESC"
        );
    }

    #[test]
    fn select_omits_top_when_row_limit_is_zero() {
        let md = metadata(SortStrategy::NoSort);
        let sql = build_select(&md, 0);
        assert_eq!(sql, "SELECT [id], [customer] FROM [dbo].[orders]");
    }

    #[test]
    fn select_omits_schema_when_empty() {
        let mut md = metadata(SortStrategy::NoSort);
        md.schema_name = String::new();
        let sql = build_select(&md, 0);
        assert!(sql.contains("FROM [orders]"));
    }

    #[test]
    fn insert_mirrors_cursor_column_order() {
        let md = metadata(SortStrategy::NoSort);
        let row = vec![
            CursorColumn {
                name: "customer",
                sql_type_code: SqlTypeCode::NVarChar,
                value: ColumnValue::Text("Acme".into()),
            },
            CursorColumn {
                name: "id",
                sql_type_code: SqlTypeCode::Integer,
                value: ColumnValue::Numeric("7".into()),
            },
        ];
        let sql = build_insert(&md, &row);
        assert_eq!(
            sql,
            "INSERT INTO [dbo].[orders] ([customer], [id]) VALUES (N'Acme', 7);"
        );
    }
}
