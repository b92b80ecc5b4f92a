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

//! The read-only catalog model built once during introspection (see
//! `tablewave_catalog`) and consumed by every later phase.

use std::time::Duration;

/// The closed set of SQL Server type categories the value codec dispatches
/// on. Derived from `sys.types.system_type_id` by the bulk extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTypeCode {
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    Date,
    Time,
    Timestamp,
    TimestampWithTimeZone,
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    Float,
    Binary,
    VarBinary,
    LongVarBinary,
    Other,
}

impl SqlTypeCode {
    pub fn is_string(self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::NChar | Self::NVarChar | Self::Text | Self::NText
        )
    }

    pub fn is_date_time(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::Timestamp | Self::TimestampWithTimeZone
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::TinyInt
                | Self::SmallInt
                | Self::Integer
                | Self::BigInt
                | Self::Numeric
                | Self::Real
                | Self::Float
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Self::Binary | Self::VarBinary | Self::LongVarBinary)
    }

    /// Maps a `sys.types` type name (lowercased) to its dispatch category.
    /// Unknown names fall back to `Other`, which the codec treats as a
    /// quoted string.
    pub fn from_type_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "char" => Self::Char,
            "varchar" => Self::VarChar,
            "nchar" => Self::NChar,
            "nvarchar" | "sysname" => Self::NVarChar,
            "text" => Self::Text,
            "ntext" => Self::NText,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" | "datetime2" | "smalldatetime" => Self::Timestamp,
            "datetimeoffset" => Self::TimestampWithTimeZone,
            "bit" => Self::Bit,
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "int" => Self::Integer,
            "bigint" => Self::BigInt,
            "numeric" | "decimal" | "smallmoney" | "money" => Self::Numeric,
            "real" => Self::Real,
            "float" => Self::Float,
            "binary" => Self::Binary,
            "varbinary" => Self::VarBinary,
            "image" => Self::LongVarBinary,
            _ => Self::Other,
        }
    }
}

/// A single column of a table, as reconstructed by the bulk extractor.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type_code: SqlTypeCode,
    pub type_name: String,
    pub size: i64,
    pub nullable: bool,
    pub auto_increment: bool,
    pub ordinal: u32,
}

impl ColumnInfo {
    pub fn is_date_time(&self) -> bool {
        self.sql_type_code.is_date_time()
    }

    pub fn is_numeric(&self) -> bool {
        self.sql_type_code.is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.sql_type_code.is_string()
    }
}

/// One column of a (possibly composite) foreign key constraint.
#[derive(Debug, Clone)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub local_column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub key_sequence: u32,
}

/// The kind of date/time column a [`SortStrategy::DateTimeBased`] sorts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    Updated,
    Created,
    Generic,
}

/// The deterministic row ordering chosen for a table, dispatched
/// exhaustively to produce an (possibly empty) `ORDER BY` fragment.
#[derive(Debug, Clone)]
pub enum SortStrategy {
    DateTimeBased { column_name: String, kind: DateTimeKind },
    PrimaryKeyBased { key_columns: Vec<String> },
    NoSort,
}

impl SortStrategy {
    /// Renders the `ORDER BY ...` clause body (without the `ORDER BY`
    /// keyword itself). Empty for [`SortStrategy::NoSort`].
    pub fn order_by_clause(&self) -> String {
        match self {
            Self::DateTimeBased { column_name, .. } => format!("[{column_name}] DESC"),
            Self::PrimaryKeyBased { key_columns } => key_columns
                .iter()
                .map(|c| format!("[{c}] DESC"))
                .collect::<Vec<_>>()
                .join(", "),
            Self::NoSort => String::new(),
        }
    }
}

/// Full per-table catalog entry, built once during introspection and
/// treated as read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub table_name: String,
    pub schema_name: String,
    pub primary_key_columns: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub columns: Vec<ColumnInfo>,
    pub sort_strategy: SortStrategy,
    pub estimated_row_count: i64,
}

impl TableMetadata {
    pub fn has_composite_key(&self) -> bool {
        self.primary_key_columns.len() > 1
    }
}

/// The outcome of exporting a single table.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub table_name: String,
    pub row_count: u64,
    pub duration: Duration,
}

/// Non-fatal conditions surfaced to the operator without aborting the run.
#[derive(Debug, Clone)]
pub enum ExportWarning {
    /// `table` could not be placed in the acyclic level ordering because it
    /// participates in a foreign-key cycle; exported in the final wave.
    Cycle(String),
    /// `table` has no primary key; [`SortStrategy::NoSort`] was used unless
    /// a date/time column was found.
    NoPrimaryKey(String),
    /// `table` has neither a usable date/time column nor a primary key;
    /// rows were exported in server order.
    NoSortStrategy(String),
}

/// Aggregate statistics and warnings for one completed (or aborted) run,
/// rendered by the report writer.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub database_name: String,
    pub schema_name: String,
    pub row_limit: i64,
    pub table_count: usize,
    pub phase_durations: Vec<(String, Duration)>,
    pub results: Vec<ExportResult>,
    pub warnings: Vec<ExportWarning>,
}

impl RunSummary {
    pub fn new(database_name: impl Into<String>, schema_name: impl Into<String>, row_limit: i64) -> Self {
        Self {
            database_name: database_name.into(),
            schema_name: schema_name.into(),
            row_limit,
            table_count: 0,
            phase_durations: Vec::new(),
            results: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.results.iter().map(|r| r.row_count).sum()
    }

    pub fn total_duration(&self) -> Duration {
        self.phase_durations.iter().map(|(_, d)| *d).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_metadata_composite_key() {
        let md = TableMetadata {
            table_name: "orders".into(),
            schema_name: "dbo".into(),
            primary_key_columns: vec!["id".into(), "region".into()],
            foreign_keys: vec![],
            columns: vec![],
            sort_strategy: SortStrategy::NoSort,
            estimated_row_count: 0,
        };
        assert!(md.has_composite_key());
    }

    #[test]
    fn sort_strategy_clauses() {
        assert_eq!(
            SortStrategy::DateTimeBased {
                column_name: "updated_at".into(),
                kind: DateTimeKind::Updated,
            }
            .order_by_clause(),
            "[updated_at] DESC"
        );
        assert_eq!(
            SortStrategy::PrimaryKeyBased {
                key_columns: vec!["id".into(), "region".into()],
            }
            .order_by_clause(),
            "[id] DESC, [region] DESC"
        );
        assert_eq!(SortStrategy::NoSort.order_by_clause(), "");
    }

    #[test]
    fn sql_type_code_from_name() {
        assert_eq!(SqlTypeCode::from_type_name("NVARCHAR"), SqlTypeCode::NVarChar);
        assert_eq!(SqlTypeCode::from_type_name("datetime2"), SqlTypeCode::Timestamp);
        assert_eq!(SqlTypeCode::from_type_name("totally_unknown"), SqlTypeCode::Other);
    }
}
