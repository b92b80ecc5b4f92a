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

//! Shared domain types, configuration, error kinds and logging setup used by
//! every `tablewave` crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod timestamp;

pub use config::ExportConfig;
pub use error::{ExportError, Result};
pub use model::{
    ColumnInfo, ExportResult, ExportWarning, ForeignKeyInfo, RunSummary, SortStrategy,
    SqlTypeCode, TableMetadata,
};
