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

//! Error kinds shared across crates. Each crate that can fail defines its
//! own narrow error enum (`ConfigError` below, `IntrospectError` in
//! `tablewave_catalog`, `SchedulerError` in `tablewave_scheduler`, ...);
//! [`ExportError`] aggregates them at the orchestrator boundary, the same
//! role the teacher's `RwError`/`ErrorCode` plays at the meta/batch seam.

use thiserror::Error;

/// Field-level configuration validation failure (spec error kind 1).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level error aggregate returned by the orchestrator. Carries enough
/// context for `main` to print a useful message and exit non-zero without
/// panicking.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("connectivity error: {0}")]
    Connectivity(#[source] anyhow::Error),
    #[error("schema introspection failed: {0}")]
    Introspection(#[source] anyhow::Error),
    #[error("export of table `{table}` failed: {source}")]
    TableExport {
        table: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
