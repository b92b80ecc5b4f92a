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

//! Command-line surface. Layered configuration (SPEC_FULL §4.0.1):
//! built-in defaults < `--config` TOML file < `TABLEWAVE_*` env vars <
//! explicit CLI flags, narrowest wins. `clap`'s `env` feature handles the
//! env-var layer directly on each field; the file layer is merged
//! separately in [`Opts::load_config_file`].

use std::path::PathBuf;

use clap::Parser;
use tablewave_common::config::ConfigFile;
use tablewave_common::{ExportConfig, ExportError};

#[derive(Parser, Debug)]
#[command(name = "tablewave", about = "Export a SQL Server schema to portable INSERT statements")]
pub struct Opts {
    /// Path to an optional TOML config file, merged under CLI/env overrides.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TABLEWAVE_DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "TABLEWAVE_DB_PORT")]
    pub db_port: Option<String>,

    #[arg(long, env = "TABLEWAVE_DB_NAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "TABLEWAVE_DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "TABLEWAVE_DB_PASSWORD")]
    pub db_password: Option<String>,

    #[arg(long, env = "TABLEWAVE_SCHEMA_NAME")]
    pub schema_name: Option<String>,

    #[arg(long, env = "TABLEWAVE_ROW_LIMIT")]
    pub row_limit: Option<i64>,

    #[arg(long, env = "TABLEWAVE_BATCH_SIZE")]
    pub batch_size: Option<i64>,

    #[arg(long, env = "TABLEWAVE_PARALLEL_THREADS")]
    pub parallel_threads: Option<i64>,

    #[arg(long, env = "TABLEWAVE_OUTPUT_DIRECTORY")]
    pub output_directory: Option<String>,

    #[arg(long, env = "TABLEWAVE_INCLUDE_SYSTEM_TABLES")]
    pub include_system_tables: Option<bool>,

    /// Declared, not used by the core (SPEC_FULL §9): accepted and
    /// validated, ignored by the orchestrator.
    #[arg(long, env = "TABLEWAVE_GENERATE_CREATE_STATEMENTS")]
    pub generate_create_statements: Option<bool>,

    #[arg(long, env = "TABLEWAVE_GENERATE_DROP_STATEMENTS")]
    pub generate_drop_statements: Option<bool>,
}

impl Opts {
    /// Reads and parses `--config`, if given. An unreadable or malformed
    /// file is a configuration error, not a silently-ignored default.
    pub fn load_config_file(&self) -> Result<ConfigFile, ExportError> {
        let Some(path) = &self.config else {
            return Ok(ConfigFile::default());
        };
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| tablewave_common::error::ConfigError::invalid("config", e.to_string()).into())
    }

    /// Merges the file layer under this layer's explicit overrides and
    /// validates the result.
    pub fn into_export_config(self, file: ConfigFile) -> Result<ExportConfig, ExportError> {
        ExportConfig::from_parts(
            file,
            self.db_host,
            self.db_port,
            self.db_name,
            self.db_user,
            self.db_password,
            self.schema_name,
            self.row_limit,
            self.batch_size,
            self.parallel_threads,
            self.output_directory,
            self.include_system_tables,
            self.generate_create_statements,
            self.generate_drop_statements,
        )
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_surface_is_well_formed() {
        Opts::command().debug_assert();
    }

    #[test]
    fn missing_config_flag_yields_default_file() {
        let opts = Opts::parse_from(["tablewave", "--db-host", "db", "--db-name", "n", "--db-user", "sa"]);
        let file = opts.load_config_file().unwrap();
        assert!(file.db_host.is_none());
    }

    #[test]
    fn config_file_is_parsed_when_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablewave.toml");
        std::fs::write(&path, "db_host = \"file-host\"\nrow_limit = 50\n").unwrap();

        let opts = Opts::parse_from(["tablewave", "--config", path.to_str().unwrap()]);
        let file = opts.load_config_file().unwrap();
        assert_eq!(file.db_host.as_deref(), Some("file-host"));
        assert_eq!(file.row_limit, Some(50));
    }

    #[test]
    fn malformed_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablewave.toml");
        std::fs::write(&path, "not valid toml = [").unwrap();

        let opts = Opts::parse_from(["tablewave", "--config", path.to_str().unwrap()]);
        let err = opts.load_config_file().unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablewave.toml");
        std::fs::write(&path, "db_host = \"file-host\"\ndb_name = \"file-db\"\ndb_user = \"file-user\"\n").unwrap();

        let opts = Opts::parse_from([
            "tablewave",
            "--config",
            path.to_str().unwrap(),
            "--db-host",
            "cli-host",
        ]);
        let file = opts.load_config_file().unwrap();
        let config = opts.into_export_config(file).unwrap();
        assert_eq!(config.db_host, "cli-host");
        assert_eq!(config.db_name, "file-db");
    }
}
