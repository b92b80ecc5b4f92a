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

//! FK-depth level assignment (spec.md §4.8): a BFS from the zero-dependency
//! roots. Tables on a cycle are never reached and are assigned the sentinel
//! level and grouped into a final wave, one [`ExportWarning::Cycle`] per
//! such table. Self-references and references outside the export set are
//! ignored, as are FKs pointing at tables not in the export set.

use std::collections::{HashMap, HashSet, VecDeque};

use tablewave_common::model::{ExportWarning, TableMetadata};

/// Tables on a cycle never reach a finite level; they collect into one
/// final wave instead of blocking the run.
const CYCLE_LEVEL: usize = usize::MAX;

/// Computes each table's FK-depth level and groups tables into waves,
/// ascending by level. Returns the waves (each a list of table names) and
/// one [`ExportWarning::Cycle`] per table that never reached a finite level.
pub fn compute_waves(tables: &[TableMetadata]) -> (Vec<Vec<String>>, Vec<ExportWarning>) {
    let export_set: HashSet<&str> = tables.iter().map(|t| t.table_name.as_str()).collect();

    // dependents[u] = tables t such that t -> u (t depends on u), i.e. the
    // reverse edges we need to propagate levels forward from level 0.
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut remaining_deps: HashMap<&str, usize> = HashMap::new();

    for table in tables {
        let deps: HashSet<&str> = table
            .foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(|referenced| *referenced != table.table_name && export_set.contains(referenced))
            .collect();
        remaining_deps.insert(table.table_name.as_str(), deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(table.table_name.as_str());
        }
    }

    let mut level: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&str> = remaining_deps
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    for root in &queue {
        level.insert(root, 0);
    }

    while let Some(table) = queue.pop_front() {
        let table_level = level[table];
        if let Some(children) = dependents.get(table) {
            for child in children {
                let remaining = remaining_deps.get_mut(child).expect("known table");
                *remaining -= 1;
                let candidate = table_level + 1;
                let existing = level.entry(child).or_insert(0);
                *existing = (*existing).max(candidate);
                if *remaining == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    let mut warnings = Vec::new();
    let mut by_level: HashMap<usize, Vec<String>> = HashMap::new();
    for table in tables {
        let assigned = *level.get(table.table_name.as_str()).unwrap_or(&CYCLE_LEVEL);
        if assigned == CYCLE_LEVEL {
            warnings.push(ExportWarning::Cycle(table.table_name.clone()));
        }
        by_level.entry(assigned).or_default().push(table.table_name.clone());
    }

    let mut finite_levels: Vec<usize> = by_level.keys().copied().filter(|l| *l != CYCLE_LEVEL).collect();
    finite_levels.sort_unstable();

    let mut waves: Vec<Vec<String>> = finite_levels
        .into_iter()
        .map(|l| by_level.remove(&l).unwrap_or_default())
        .collect();
    if let Some(cycle_wave) = by_level.remove(&CYCLE_LEVEL) {
        waves.push(cycle_wave);
    }

    (waves, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewave_common::model::{ForeignKeyInfo, SortStrategy};

    fn table(name: &str, fk_targets: &[&str]) -> TableMetadata {
        TableMetadata {
            table_name: name.to_owned(),
            schema_name: "dbo".to_owned(),
            primary_key_columns: vec!["id".to_owned()],
            foreign_keys: fk_targets
                .iter()
                .map(|target| ForeignKeyInfo {
                    constraint_name: format!("fk_{name}_{target}"),
                    local_column: format!("{target}_id"),
                    referenced_schema: "dbo".to_owned(),
                    referenced_table: (*target).to_owned(),
                    referenced_column: "id".to_owned(),
                    key_sequence: 1,
                })
                .collect(),
            columns: vec![],
            sort_strategy: SortStrategy::NoSort,
            estimated_row_count: 0,
        }
    }

    #[test]
    fn linear_chain_produces_ordered_waves() {
        // spec.md §8 scenario 1: A, B(fk->A), C(fk->B), D (no FKs)
        let tables = vec![
            table("A", &[]),
            table("B", &["A"]),
            table("C", &["B"]),
            table("D", &[]),
        ];
        let (waves, warnings) = compute_waves(&tables);
        assert!(warnings.is_empty());
        assert_eq!(waves.len(), 3);
        let mut wave0 = waves[0].clone();
        wave0.sort();
        assert_eq!(wave0, vec!["A".to_owned(), "D".to_owned()]);
        assert_eq!(waves[1], vec!["B".to_owned()]);
        assert_eq!(waves[2], vec!["C".to_owned()]);
    }

    #[test]
    fn cycle_lands_in_final_wave_with_warnings() {
        // spec.md §8 scenario 2: X(fk->Y), Y(fk->X)
        let tables = vec![table("X", &["Y"]), table("Y", &["X"])];
        let (waves, warnings) = compute_waves(&tables);
        assert_eq!(waves.len(), 1);
        let mut last = waves[0].clone();
        last.sort();
        assert_eq!(last, vec!["X".to_owned(), "Y".to_owned()]);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn self_reference_is_ignored() {
        let tables = vec![table("A", &["A"])];
        let (waves, warnings) = compute_waves(&tables);
        assert!(warnings.is_empty());
        assert_eq!(waves, vec![vec!["A".to_owned()]]);
    }

    #[test]
    fn reference_outside_export_set_is_ignored() {
        let tables = vec![table("A", &["NotExported"])];
        let (waves, warnings) = compute_waves(&tables);
        assert!(warnings.is_empty());
        assert_eq!(waves, vec![vec!["A".to_owned()]]);
    }

    #[test]
    fn empty_schema_has_no_waves() {
        let (waves, warnings) = compute_waves(&[]);
        assert!(waves.is_empty());
        assert!(warnings.is_empty());
    }
}
