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

//! Bulk schema introspection (C6), table filtering (C4) and sort-strategy
//! resolution (C5).

pub mod filter;
pub mod introspect;
pub mod sort;

pub use filter::{TableFilter, TableFilterConfig};
pub use introspect::{assemble_table_metadata, discover_tables, extract_bulk_catalog, BulkCatalog, IntrospectError};
pub use sort::resolve_sort_strategy;
