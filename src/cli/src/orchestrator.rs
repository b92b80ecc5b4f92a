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

//! Orchestrator (spec.md §4.9, C10): sequences the six run phases and
//! collects per-table statistics. Explicit wiring, leaves-first: no
//! service locator, no dependency-injection container (spec.md §9).

use std::time::Instant;

use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use tablewave_catalog::{assemble_table_metadata, discover_tables, extract_bulk_catalog, TableFilter, TableFilterConfig};
use tablewave_common::model::RunSummary;
use tablewave_common::{ExportConfig, ExportError};
use tablewave_scheduler::{run_export_phase, ConnectionPool};
use tablewave_sink::Sink;

/// Isolation and autocommit are per-session `SET` statements rather than
/// login-time properties, so they are issued once right after connecting
/// (spec.md §4.7, C7); read-only is requested at login time via
/// `ApplicationIntent=ReadOnly` in [`ExportConfig::connection_string`].
/// Note: unlike JDBC/ODBC, TDS has no separate per-query "fetch size"
/// knob (spec.md §4.8) — the `TOP rowLimit` in every `buildSelect` query
/// already bounds the cursor, so there is nothing further to tune here.
const SESSION_INIT_SQL: &str = "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED; SET IMPLICIT_TRANSACTIONS ON;";

async fn connect(config: &ExportConfig) -> Result<Client<Compat<TcpStream>>, ExportError> {
    let mut tiberius_config = Config::from_ado_string(&config.connection_string())
        .map_err(|e| ExportError::Connectivity(e.into()))?;
    tiberius_config.authentication(AuthMethod::sql_server(&config.db_user, &config.db_password));
    tiberius_config.trust_cert();

    let tcp = TcpStream::connect(tiberius_config.get_addr())
        .await
        .map_err(|e| ExportError::Connectivity(e.into()))?;
    tcp.set_nodelay(true).map_err(|e| ExportError::Connectivity(e.into()))?;

    let mut client = Client::connect(tiberius_config, tcp.compat_write())
        .await
        .map_err(|e| ExportError::Connectivity(e.into()))?;

    client
        .simple_query(SESSION_INIT_SQL)
        .await
        .map_err(|e| ExportError::Connectivity(e.into()))?
        .into_results()
        .await
        .map_err(|e| ExportError::Connectivity(e.into()))?;

    Ok(client)
}

/// Runs the full export: opens the primary session and pool, introspects
/// and filters the schema, initializes the sink, drives the scheduled
/// parallel export, then closes out and returns a [`RunSummary`] for the
/// report writer.
pub async fn run(config: &ExportConfig, timestamp: &str) -> Result<RunSummary, ExportError> {
    let mut summary = RunSummary::new(config.db_name.clone(), config.schema_name.clone(), config.row_limit);

    if config.generate_create_statements || config.generate_drop_statements {
        debug!(
            create = config.generate_create_statements,
            drop = config.generate_drop_statements,
            "DDL generation flags are accepted but not implemented by the core; ignoring"
        );
    }

    // Phase 1: open the primary session and the pool.
    let phase_started = Instant::now();
    let mut primary = connect(config).await?;
    let mut pool_sessions = Vec::with_capacity(config.parallel_threads);
    for _ in 0..config.parallel_threads {
        pool_sessions.push(connect(config).await?);
    }
    let pool = ConnectionPool::new(pool_sessions);
    summary.phase_durations.push(("open_sessions".to_owned(), phase_started.elapsed()));

    // Phase 2: bulk introspection.
    let phase_started = Instant::now();
    let table_names = discover_tables(&mut primary, &config.schema_name, config.include_system_tables)
        .await
        .map_err(|e| ExportError::Introspection(e.into()))?;
    let catalog = extract_bulk_catalog(&mut primary, &config.schema_name)
        .await
        .map_err(|e| ExportError::Introspection(e.into()))?;
    let all_tables = assemble_table_metadata(&table_names, &config.schema_name, &catalog);
    summary.phase_durations.push(("introspection".to_owned(), phase_started.elapsed()));

    // Phase 3: filter.
    let phase_started = Instant::now();
    let filter = TableFilter::new(TableFilterConfig::default());
    let filtered_tables: Vec<_> = all_tables
        .into_iter()
        .filter(|table| filter.should_include(&table.table_name, table.estimated_row_count))
        .collect();
    for table in &filtered_tables {
        if table.primary_key_columns.is_empty() {
            summary
                .warnings
                .push(tablewave_common::model::ExportWarning::NoPrimaryKey(table.table_name.clone()));
        }
        if matches!(table.sort_strategy, tablewave_common::model::SortStrategy::NoSort) {
            summary
                .warnings
                .push(tablewave_common::model::ExportWarning::NoSortStrategy(table.table_name.clone()));
        }
    }
    summary.table_count = filtered_tables.len();
    summary.phase_durations.push(("filter".to_owned(), phase_started.elapsed()));

    // Phase 4: initialize the sink.
    let phase_started = Instant::now();
    let sink = Sink::create(
        &config.output_directory,
        timestamp,
        &config.db_name,
        filtered_tables.len(),
        config.row_limit,
    )
    .await?;
    summary.phase_durations.push(("init_sink".to_owned(), phase_started.elapsed()));

    // Phase 5: scheduled parallel export.
    let phase_started = Instant::now();
    let export_outcome =
        run_export_phase(&filtered_tables, &pool, &sink, config.row_limit, config.batch_size).await;
    summary.phase_durations.push(("export".to_owned(), phase_started.elapsed()));

    let (results, cycle_warnings) = match export_outcome {
        Ok(outcome) => outcome,
        Err(source) => {
            return Err(ExportError::TableExport {
                table: "<wave>".to_owned(),
                source: source.into(),
            })
        }
    };
    summary.warnings.extend(cycle_warnings);
    summary.results = results;

    // Phase 6: close sink, compute statistics, emit report (report
    // rendering itself lives in `tablewave_sink::report`; the caller
    // writes it after this function returns the summary).
    let phase_started = Instant::now();
    sink.close(summary.table_count, timestamp).await?;
    summary.phase_durations.push(("finalize".to_owned(), phase_started.elapsed()));

    info!(
        tables = summary.table_count,
        rows = summary.total_rows(),
        "export run complete"
    );

    Ok(summary)
}
