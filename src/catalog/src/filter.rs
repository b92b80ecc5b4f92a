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

//! Table exclusion policy (spec.md §4.4). Evaluated cheapest-first; the
//! first matching category wins. Immutable after construction.

use regex::Regex;

const DEFAULT_EXACT: &[&str] = &["sysdiagrams", "dtproperties", "sysconstraints", "syssegments"];
const DEFAULT_PREFIXES: &[&str] = &["sys", "INFORMATION_SCHEMA", "__", "msreplication", "spt_"];
const DEFAULT_WILDCARDS: &[&str] = &[
    "*_backup", "*_history", "*_audit", "*_log", "tmp_*", "staging_*",
];
const DEFAULT_REGEXES: &[&str] = &[r"^\$.*", r".*_\d{8}$", r".*_\d{8}_\d{6}$"];

/// Configuration for [`TableFilter`]; an empty `Vec` in any field falls
/// back to that category's built-in default.
#[derive(Debug, Clone, Default)]
pub struct TableFilterConfig {
    pub exact: Vec<String>,
    pub prefixes: Vec<String>,
    pub wildcards: Vec<String>,
    pub regexes: Vec<String>,
    pub exclude_empty_tables: bool,
}

pub struct TableFilter {
    exact: std::collections::HashSet<String>,
    prefixes: Vec<String>,
    wildcards: Vec<Regex>,
    regexes: Vec<Regex>,
    exclude_empty_tables: bool,
}

impl TableFilter {
    pub fn new(config: TableFilterConfig) -> Self {
        let exact = if config.exact.is_empty() {
            DEFAULT_EXACT.iter().map(|s| s.to_string()).collect()
        } else {
            config.exact.into_iter().collect()
        };

        let prefixes = if config.prefixes.is_empty() {
            DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect()
        } else {
            config.prefixes
        };

        let wildcard_patterns = if config.wildcards.is_empty() {
            DEFAULT_WILDCARDS.iter().map(|s| s.to_string()).collect()
        } else {
            config.wildcards
        };
        let wildcards = wildcard_patterns
            .iter()
            .map(|p| Regex::new(&wildcard_to_regex(p)).expect("built-in wildcard compiles"))
            .collect();

        let regex_patterns = if config.regexes.is_empty() {
            DEFAULT_REGEXES.iter().map(|s| s.to_string()).collect()
        } else {
            config.regexes
        };
        let regexes = regex_patterns
            .iter()
            .map(|p| Regex::new(p).expect("configured regex compiles"))
            .collect();

        Self {
            exact,
            prefixes,
            wildcards,
            regexes,
            exclude_empty_tables: config.exclude_empty_tables,
        }
    }

    /// `true` if `table_name` should be included in the export set.
    pub fn should_include(&self, table_name: &str, estimated_row_count: i64) -> bool {
        if table_name.trim().is_empty() {
            return false;
        }
        if self.exact.contains(table_name) {
            return false;
        }
        if self.prefixes.iter().any(|p| table_name.starts_with(p.as_str())) {
            return false;
        }
        if self.wildcards.iter().any(|re| re.is_match(table_name)) {
            return false;
        }
        if self.regexes.iter().any(|re| re.is_match(table_name)) {
            return false;
        }
        if self.exclude_empty_tables && estimated_row_count == 0 {
            return false;
        }
        true
    }
}

/// Translates a `*`/`?` glob into an anchored regex.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_excluded() {
        let filter = TableFilter::new(TableFilterConfig::default());
        assert!(!filter.should_include("", 10));
        assert!(!filter.should_include("   ", 10));
    }

    #[test]
    fn default_policy_seed_scenario() {
        // spec.md §8 boundary scenario 5
        let filter = TableFilter::new(TableFilterConfig::default());
        let inputs = [
            "audit_log",
            "users",
            "users_backup",
            "sysjobs",
            "tmp_import",
            "orders_20240101",
        ];
        let kept: Vec<_> = inputs
            .iter()
            .filter(|name| filter.should_include(name, 100))
            .collect();
        assert_eq!(kept, vec![&"users"]);
    }

    #[test]
    fn custom_list_overrides_defaults() {
        let filter = TableFilter::new(TableFilterConfig {
            exact: vec!["quarantine".into()],
            ..Default::default()
        });
        // sysdiagrams is a *default* exact match, but an explicit (non-empty)
        // exact list replaces the default entirely.
        assert!(filter.should_include("sysdiagrams", 5));
        assert!(!filter.should_include("quarantine", 5));
    }

    #[test]
    fn exclude_empty_tables_policy() {
        let filter = TableFilter::new(TableFilterConfig {
            exclude_empty_tables: true,
            ..Default::default()
        });
        assert!(!filter.should_include("orders", 0));
        assert!(filter.should_include("orders", 1));
    }
}
