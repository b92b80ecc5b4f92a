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

//! Run configuration. Immutable once constructed; [`ExportConfig::from_parts`]
//! is the only constructor and validates every field up front so the rest
//! of the pipeline can assume it is well-formed.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_ROW_LIMIT: i64 = 200;
const DEFAULT_BATCH_SIZE: i64 = 1000;
const DEFAULT_SCHEMA: &str = "dbo";
const DEFAULT_OUTPUT_DIR: &str = "./exports";

/// Partially-specified configuration as read from a TOML file. Every field
/// is optional; missing fields fall back to [`ExportConfig`]'s defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub db_host: Option<String>,
    pub db_port: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub schema_name: Option<String>,
    pub row_limit: Option<i64>,
    pub batch_size: Option<i64>,
    pub parallel_threads: Option<i64>,
    pub output_directory: Option<String>,
    pub include_system_tables: Option<bool>,
    pub generate_create_statements: Option<bool>,
    pub generate_drop_statements: Option<bool>,
}

/// Validated, immutable run configuration (spec.md §6). Lifetime spans one
/// run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub schema_name: String,
    pub row_limit: i64,
    pub batch_size: i64,
    pub parallel_threads: usize,
    pub output_directory: PathBuf,
    pub include_system_tables: bool,
    pub generate_create_statements: bool,
    pub generate_drop_statements: bool,
}

impl ExportConfig {
    /// Merges `file` under CLI-provided overrides (all of which are
    /// `Option`s so callers can pass only what the user actually set) and
    /// validates the result. CLI fields win over file fields, which win
    /// over built-in defaults, per SPEC_FULL §4.0.1.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        file: ConfigFile,
        db_host: Option<String>,
        db_port: Option<String>,
        db_name: Option<String>,
        db_user: Option<String>,
        db_password: Option<String>,
        schema_name: Option<String>,
        row_limit: Option<i64>,
        batch_size: Option<i64>,
        parallel_threads: Option<i64>,
        output_directory: Option<String>,
        include_system_tables: Option<bool>,
        generate_create_statements: Option<bool>,
        generate_drop_statements: Option<bool>,
    ) -> Result<Self, ConfigError> {
        let db_host = db_host.or(file.db_host).unwrap_or_default();
        if db_host.trim().is_empty() {
            return Err(ConfigError::invalid("dbHost", "must not be empty"));
        }

        let db_port_str = db_port.or(file.db_port).unwrap_or_default();
        let db_port: u16 = db_port_str
            .parse()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ConfigError::invalid("dbPort", format!("`{db_port_str}` is not a port in 1..65535")))?;

        let db_name = db_name.or(file.db_name).unwrap_or_default();
        if db_name.trim().is_empty() {
            return Err(ConfigError::invalid("dbName", "must not be empty"));
        }

        let db_user = db_user.or(file.db_user).unwrap_or_default();
        if db_user.trim().is_empty() {
            return Err(ConfigError::invalid("dbUser", "must not be empty"));
        }

        let db_password = db_password.or(file.db_password).unwrap_or_default();

        let schema_name = schema_name
            .or(file.schema_name)
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_owned());
        if schema_name.trim().is_empty() {
            return Err(ConfigError::invalid("schemaName", "must not be empty"));
        }

        let row_limit = row_limit.or(file.row_limit).unwrap_or(DEFAULT_ROW_LIMIT);
        if !(1..=1_000_000).contains(&row_limit) {
            return Err(ConfigError::invalid(
                "rowLimit",
                format!("{row_limit} is out of range 1..1000000"),
            ));
        }

        let batch_size = batch_size.or(file.batch_size).unwrap_or(DEFAULT_BATCH_SIZE);
        if !(1..=10_000).contains(&batch_size) {
            return Err(ConfigError::invalid(
                "batchSize",
                format!("{batch_size} is out of range 1..10000"),
            ));
        }

        let default_threads = std::thread::available_parallelism()
            .map(|n| n.get() as i64)
            .unwrap_or(4);
        let parallel_threads = parallel_threads
            .or(file.parallel_threads)
            .unwrap_or(default_threads);
        if !(1..=32).contains(&parallel_threads) {
            return Err(ConfigError::invalid(
                "parallelThreads",
                format!("{parallel_threads} is out of range 1..32"),
            ));
        }

        let output_directory = output_directory
            .or(file.output_directory)
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_owned());
        if output_directory.trim().is_empty() {
            return Err(ConfigError::invalid("outputDirectory", "must not be empty"));
        }

        Ok(Self {
            db_host,
            db_port,
            db_name,
            db_user,
            db_password,
            schema_name,
            row_limit,
            batch_size,
            parallel_threads: parallel_threads as usize,
            output_directory: PathBuf::from(output_directory),
            include_system_tables: include_system_tables
                .or(file.include_system_tables)
                .unwrap_or(false),
            generate_create_statements: generate_create_statements
                .or(file.generate_create_statements)
                .unwrap_or(false),
            generate_drop_statements: generate_drop_statements
                .or(file.generate_drop_statements)
                .unwrap_or(false),
        })
    }

    /// Builds the `sqlserver://` connection string described in spec.md §6.
    /// `ApplicationIntent=ReadOnly` requests the read-only session property
    /// required by §4.7 at the protocol level (the TDS LOGIN7 read-only
    /// intent flag); isolation level and autocommit are set explicitly on
    /// each session after connecting, since those are per-session `SET`
    /// statements rather than login-time properties.
    pub fn connection_string(&self) -> String {
        format!(
            "sqlserver://{}:{};databaseName={};encrypt=false;trustServerCertificate=true;\
             integratedSecurity=false;user={};password={};loginTimeout=30;ApplicationIntent=ReadOnly",
            self.db_host, self.db_port, self.db_name, self.db_user, self.db_password
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_parts() -> (
        ConfigFile,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    ) {
        (
            ConfigFile::default(),
            Some("db.internal".into()),
            Some("1433".into()),
            Some("Northwind".into()),
            Some("sa".into()),
            Some("swordfish".into()),
            None,
        )
    }

    #[test]
    fn rejects_empty_host() {
        let err = ExportConfig::from_parts(
            ConfigFile::default(),
            Some(String::new()),
            Some("1433".into()),
            Some("db".into()),
            Some("sa".into()),
            Some(String::new()),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "dbHost", .. }));
    }

    #[test]
    fn rejects_out_of_range_port() {
        let (file, _, _, name, user, pass, schema) = valid_parts();
        let err = ExportConfig::from_parts(
            file,
            Some("db.internal".into()),
            Some("70000".into()),
            name,
            user,
            pass,
            schema,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "dbPort", .. }));
    }

    #[test]
    fn rejects_out_of_range_row_limit() {
        let (file, host, port, name, user, pass, schema) = valid_parts();
        let err = ExportConfig::from_parts(
            file,
            host,
            port,
            name,
            user,
            pass,
            schema,
            Some(0),
            None,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "rowLimit", .. }));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let (file, host, port, name, user, pass, schema) = valid_parts();
        let cfg = ExportConfig::from_parts(
            file, host, port, name, user, pass, schema, None, None, None, None, None, None, None,
        )
        .unwrap();
        assert_eq!(cfg.schema_name, "dbo");
        assert_eq!(cfg.row_limit, 200);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.output_directory, PathBuf::from("./exports"));
    }

    #[test]
    fn connection_string_contains_expected_fields() {
        let (file, host, port, name, user, pass, schema) = valid_parts();
        let cfg = ExportConfig::from_parts(
            file, host, port, name, user, pass, schema, None, None, None, None, None, None, None,
        )
        .unwrap();
        let conn = cfg.connection_string();
        assert!(conn.starts_with("sqlserver://db.internal:1433;"));
        assert!(conn.contains("databaseName=Northwind"));
        assert!(conn.contains("trustServerCertificate=true"));
    }
}
