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

//! Value codec (spec.md §4.1): formats a single column value as a T-SQL
//! literal safe to paste into a `VALUES` list. Stateless and thread-safe.

use tablewave_common::model::SqlTypeCode;

/// A single driver-reported column value, decoupled from any particular
/// driver crate so the codec stays a pure function of (value, type).
/// Numeric/date-time variants already carry the driver's canonical textual
/// representation, per spec.md §4.1.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    /// Canonical decimal text for any numeric type (int family, float,
    /// decimal/numeric).
    Numeric(String),
    Text(String),
    /// Canonical textual form for DATE/TIME/TIMESTAMP/TIMESTAMPTZ.
    DateTime(String),
    Binary(Vec<u8>),
}

const MAX_INLINE_BINARY_BYTES: usize = 8000;

/// Encodes `value` as a T-SQL literal under the dispatch rules for
/// `sql_type_code`. `NULL` is returned for [`ColumnValue::Null`]
/// regardless of type.
pub fn encode_literal(value: &ColumnValue, sql_type_code: SqlTypeCode) -> String {
    if matches!(value, ColumnValue::Null) {
        return "NULL".to_owned();
    }

    match sql_type_code {
        t if t.is_string() => encode_string(value),
        t if t.is_date_time() => encode_date_time(value),
        SqlTypeCode::Bit => encode_bit(value),
        t if t.is_numeric() => encode_numeric(value),
        t if t.is_binary() => encode_binary(value),
        SqlTypeCode::Other => encode_string(value),
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\'', "''")
}

/// CRLF, LF and CR each collapse to a single ASCII space.
fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn as_text(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Text(s) => s.clone(),
        ColumnValue::DateTime(s) => s.clone(),
        ColumnValue::Numeric(s) => s.clone(),
        ColumnValue::Bool(b) => b.to_string(),
        ColumnValue::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ColumnValue::Null => String::new(),
    }
}

fn encode_string(value: &ColumnValue) -> String {
    let raw = as_text(value);
    let normalized = normalize_newlines(&raw);
    format!("N'{}'", escape_quotes(&normalized))
}

fn encode_date_time(value: &ColumnValue) -> String {
    format!("'{}'", escape_quotes(&as_text(value)))
}

fn encode_bit(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Bool(true) => "1".to_owned(),
        ColumnValue::Bool(false) => "0".to_owned(),
        ColumnValue::Numeric(s) => if s == "0" { "0".to_owned() } else { "1".to_owned() },
        other => as_text(other),
    }
}

fn encode_numeric(value: &ColumnValue) -> String {
    as_text(value)
}

fn encode_binary(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Binary(bytes) => {
            if bytes.len() > MAX_INLINE_BINARY_BYTES {
                "NULL /* Binary data too large */".to_owned()
            } else {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                for b in bytes {
                    out.push_str(&format!("{b:02x}"));
                }
                out
            }
        }
        other => encode_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_always_null() {
        assert_eq!(encode_literal(&ColumnValue::Null, SqlTypeCode::VarChar), "NULL");
        assert_eq!(encode_literal(&ColumnValue::Null, SqlTypeCode::Integer), "NULL");
        assert_eq!(encode_literal(&ColumnValue::Null, SqlTypeCode::VarBinary), "NULL");
    }

    #[test]
    fn string_escaping_and_newline_collapse() {
        // spec.md §8 boundary scenario 4
        let value = ColumnValue::Text("O'Reilly\nInc".to_owned());
        assert_eq!(
            encode_literal(&value, SqlTypeCode::VarChar),
            "N'O''Reilly Inc'"
        );
    }

    #[test]
    fn crlf_and_cr_collapse_to_space() {
        let value = ColumnValue::Text("a\r\nb\rc".to_owned());
        assert_eq!(encode_literal(&value, SqlTypeCode::NVarChar), "N'a b c'");
    }

    #[test]
    fn bit_encodes_as_0_or_1() {
        assert_eq!(encode_literal(&ColumnValue::Bool(true), SqlTypeCode::Bit), "1");
        assert_eq!(encode_literal(&ColumnValue::Bool(false), SqlTypeCode::Bit), "0");
    }

    #[test]
    fn numeric_passes_through_unquoted() {
        let value = ColumnValue::Numeric("42.50".to_owned());
        assert_eq!(encode_literal(&value, SqlTypeCode::Numeric), "42.50");
    }

    #[test]
    fn small_binary_is_hex_encoded() {
        let value = ColumnValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(encode_literal(&value, SqlTypeCode::VarBinary), "0xdeadbeef");
    }

    #[test]
    fn oversized_binary_falls_back_to_sentinel() {
        let value = ColumnValue::Binary(vec![0u8; 10_000]);
        assert_eq!(
            encode_literal(&value, SqlTypeCode::VarBinary),
            "NULL /* Binary data too large */"
        );
    }

    #[test]
    fn date_time_is_single_quoted_without_n_prefix() {
        let value = ColumnValue::DateTime("2024-01-15 10:30:00".to_owned());
        assert_eq!(
            encode_literal(&value, SqlTypeCode::Timestamp),
            "'2024-01-15 10:30:00'"
        );
    }
}
