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

//! Sort-strategy resolver (spec.md §4.5): picks a deterministic row
//! ordering for a table from its column/PK metadata.

use tablewave_common::model::{ColumnInfo, DateTimeKind, SortStrategy};

/// Resolves the sort strategy for a table. `warn_no_sort` is called (rather
/// than logging directly) so callers can collect [`tablewave_common::ExportWarning`]s.
pub fn resolve_sort_strategy(
    columns: &[ColumnInfo],
    primary_key_columns: &[String],
) -> SortStrategy {
    if let Some(strategy) = date_time_strategy(columns) {
        return strategy;
    }
    if !primary_key_columns.is_empty() {
        return SortStrategy::PrimaryKeyBased {
            key_columns: primary_key_columns.to_vec(),
        };
    }
    SortStrategy::NoSort
}

fn date_time_strategy(columns: &[ColumnInfo]) -> Option<SortStrategy> {
    let date_columns: Vec<&ColumnInfo> = columns.iter().filter(|c| c.is_date_time()).collect();
    if date_columns.is_empty() {
        return None;
    }

    let find = |needles: &[&str]| -> Option<&ColumnInfo> {
        date_columns
            .iter()
            .find(|c| {
                let lower = c.name.to_ascii_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .copied()
    };

    if let Some(col) = find(&["updated", "modify", "modified"]) {
        return Some(SortStrategy::DateTimeBased {
            column_name: col.name.clone(),
            kind: DateTimeKind::Updated,
        });
    }
    if let Some(col) = find(&["created", "insert"]) {
        return Some(SortStrategy::DateTimeBased {
            column_name: col.name.clone(),
            kind: DateTimeKind::Created,
        });
    }
    Some(SortStrategy::DateTimeBased {
        column_name: date_columns[0].name.clone(),
        kind: DateTimeKind::Generic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewave_common::model::SqlTypeCode;

    fn col(name: &str, code: SqlTypeCode, ordinal: u32) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            sql_type_code: code,
            type_name: "".into(),
            size: 0,
            nullable: true,
            auto_increment: false,
            ordinal,
        }
    }

    #[test]
    fn updated_at_wins_over_created_at() {
        // spec.md §8 boundary scenario 3
        let columns = vec![
            col("id", SqlTypeCode::Integer, 0),
            col("created_at", SqlTypeCode::Timestamp, 1),
            col("updated_at", SqlTypeCode::Timestamp, 2),
        ];
        let strategy = resolve_sort_strategy(&columns, &["id".into()]);
        match strategy {
            SortStrategy::DateTimeBased { column_name, kind } => {
                assert_eq!(column_name, "updated_at");
                assert_eq!(kind, DateTimeKind::Updated);
            }
            other => panic!("expected DateTimeBased(Updated), got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_primary_key() {
        let columns = vec![col("id", SqlTypeCode::Integer, 0)];
        let strategy = resolve_sort_strategy(&columns, &["id".into()]);
        assert!(matches!(strategy, SortStrategy::PrimaryKeyBased { .. }));
    }

    #[test]
    fn falls_back_to_no_sort() {
        let columns = vec![col("payload", SqlTypeCode::VarChar, 0)];
        let strategy = resolve_sort_strategy(&columns, &[]);
        assert!(matches!(strategy, SortStrategy::NoSort));
    }

    #[test]
    fn generic_date_column_when_no_name_hint() {
        let columns = vec![col("effective_date", SqlTypeCode::Date, 0)];
        let strategy = resolve_sort_strategy(&columns, &[]);
        match strategy {
            SortStrategy::DateTimeBased { kind, .. } => assert_eq!(kind, DateTimeKind::Generic),
            other => panic!("expected DateTimeBased(Generic), got {other:?}"),
        }
    }
}
