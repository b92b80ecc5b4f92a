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

//! Per-table worker (spec.md §4.8/§4.9, C9): acquires a pooled session,
//! drives one SELECT cursor, batches emitted `INSERT`s to the sink, and
//! always releases the session, even on error.

use std::time::{Duration, Instant};

use futures::TryStreamExt;
use thiserror::Error;
use tiberius::Row;
use futures::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use tablewave_codec::statement::{build_insert, build_select, CursorColumn};
use tablewave_codec::value::ColumnValue;
use tablewave_common::model::{ColumnInfo, ExportResult, SqlTypeCode, TableMetadata};
use tablewave_sink::Sink;

use crate::pool::ConnectionPool;

/// A single query is capped at this long (spec.md §4.8: 300 s per query).
const QUERY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("query against `{table}` failed: {source}")]
    Query {
        table: String,
        #[source]
        source: tiberius::error::Error,
    },
    #[error("query against `{table}` exceeded the {}s timeout", QUERY_TIMEOUT.as_secs())]
    Timeout { table: String },
    #[error("writing exported rows for `{table}` failed: {source}")]
    Sink {
        table: String,
        #[source]
        source: std::io::Error,
    },
}

/// Best-effort decode of one cursor column into the driver-decoupled
/// [`ColumnValue`], dispatched on the column's [`SqlTypeCode`]. `NULL` is
/// represented uniformly regardless of the underlying SQL type.
fn decode_column(row: &Row, idx: usize, column: &ColumnInfo) -> ColumnValue {
    match column.sql_type_code {
        SqlTypeCode::Bit => row
            .get::<bool, _>(idx)
            .map(ColumnValue::Bool)
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::TinyInt => row
            .get::<u8, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::SmallInt => row
            .get::<i16, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Integer => row
            .get::<i32, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::BigInt => row
            .get::<i64, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Real => row
            .get::<f32, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Float => row
            .get::<f64, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Numeric => row
            .get::<rust_decimal::Decimal, _>(idx)
            .map(|v| ColumnValue::Numeric(v.to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Date => row
            .get::<chrono::NaiveDate, _>(idx)
            .map(|v| ColumnValue::DateTime(v.format("%Y-%m-%d").to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Time => row
            .get::<chrono::NaiveTime, _>(idx)
            .map(|v| ColumnValue::DateTime(v.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Timestamp => row
            .get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| ColumnValue::DateTime(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::TimestampWithTimeZone => row
            .get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| ColumnValue::DateTime(v.format("%Y-%m-%d %H:%M:%S%.f %:z").to_string()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Binary | SqlTypeCode::VarBinary | SqlTypeCode::LongVarBinary => row
            .get::<&[u8], _>(idx)
            .map(|v| ColumnValue::Binary(v.to_vec()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Char
        | SqlTypeCode::VarChar
        | SqlTypeCode::NChar
        | SqlTypeCode::NVarChar
        | SqlTypeCode::Text
        | SqlTypeCode::NText => row
            .get::<&str, _>(idx)
            .map(|v| ColumnValue::Text(v.to_owned()))
            .unwrap_or(ColumnValue::Null),
        SqlTypeCode::Other => decode_other_column(row, idx),
    }
}

/// Types with no dedicated [`SqlTypeCode`] variant (`uniqueidentifier`,
/// `sql_variant`, `hierarchyid`, ...) still need a textual rendering per
/// spec.md §4.1's catch-all ("fall back to quoted string"). `uniqueidentifier`
/// is the common case — GUID primary/foreign keys — so it is tried
/// explicitly before falling back to a raw-bytes hex rendering and, only if
/// nothing decodes at all, to `NULL`.
fn decode_other_column(row: &Row, idx: usize) -> ColumnValue {
    if let Some(v) = row.get::<&str, _>(idx) {
        return ColumnValue::Text(v.to_owned());
    }
    if let Some(v) = row.get::<Uuid, _>(idx) {
        return ColumnValue::Text(v.to_string().to_uppercase());
    }
    if let Some(v) = row.get::<&[u8], _>(idx) {
        let hex: String = v.iter().map(|b| format!("{b:02x}")).collect();
        return ColumnValue::Text(format!("0x{hex}"));
    }
    ColumnValue::Null
}

/// Runs `exportTable` for one table: opens a cursor on `buildSelect(...)`,
/// iterates rows until exhausted or `rowCount >= rowLimit`, batches
/// rendered `INSERT`s into chunks of `batchSize`, and hands each chunk to
/// the sink. The caller's pooled session is borrowed, not owned, so the
/// lease's release/discard stays the caller's responsibility.
pub async fn export_table<S>(
    client: &mut tiberius::Client<S>,
    sink: &Sink,
    metadata: &TableMetadata,
    row_limit: i64,
    batch_size: i64,
) -> Result<ExportResult, SchedulerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    let select_sql = build_select(metadata, row_limit);

    sink.write_table_header(&metadata.schema_name, &metadata.table_name)
        .await
        .map_err(|source| SchedulerError::Sink { table: metadata.table_name.clone(), source })?;

    let query = client.query(&select_sql, &[]);
    let stream = tokio::time::timeout(QUERY_TIMEOUT, query)
        .await
        .map_err(|_| SchedulerError::Timeout { table: metadata.table_name.clone() })?
        .map_err(|source| SchedulerError::Query { table: metadata.table_name.clone(), source })?
        .into_row_stream();
    tokio::pin!(stream);

    let mut row_count: u64 = 0;
    let mut pending_statements: Vec<String> = Vec::with_capacity(batch_size.max(1) as usize);

    loop {
        if row_limit > 0 && row_count >= row_limit as u64 {
            break;
        }
        let next = tokio::time::timeout(QUERY_TIMEOUT, stream.try_next())
            .await
            .map_err(|_| SchedulerError::Timeout { table: metadata.table_name.clone() })?
            .map_err(|source| SchedulerError::Query { table: metadata.table_name.clone(), source })?;
        let Some(row) = next else { break };

        let cursor_row: Vec<CursorColumn<'_>> = metadata
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| CursorColumn {
                name: &column.name,
                sql_type_code: column.sql_type_code,
                value: decode_column(&row, idx, column),
            })
            .collect();

        pending_statements.push(build_insert(metadata, &cursor_row));
        row_count += 1;

        if pending_statements.len() as i64 >= batch_size.max(1) {
            sink.write_insert_batch(&pending_statements)
                .await
                .map_err(|source| SchedulerError::Sink { table: metadata.table_name.clone(), source })?;
            pending_statements.clear();
        }
    }

    if !pending_statements.is_empty() {
        sink.write_insert_batch(&pending_statements)
            .await
            .map_err(|source| SchedulerError::Sink { table: metadata.table_name.clone(), source })?;
    }

    sink.write_table_footer()
        .await
        .map_err(|source| SchedulerError::Sink { table: metadata.table_name.clone(), source })?;

    Ok(ExportResult {
        table_name: metadata.table_name.clone(),
        row_count,
        duration: started.elapsed(),
    })
}

/// Ties `export_table` to a borrowed pool lease: acquires, runs the
/// export, and releases on success or discards on a broken-session error.
pub async fn export_table_pooled<S>(
    pool: &ConnectionPool<S>,
    sink: &Sink,
    metadata: &TableMetadata,
    row_limit: i64,
    batch_size: i64,
) -> Result<ExportResult, SchedulerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut lease = pool.acquire().await;
    let outcome = export_table(lease.session_mut(), sink, metadata, row_limit, batch_size).await;
    match &outcome {
        Ok(_) => pool.release(lease).await,
        Err(SchedulerError::Query { .. } | SchedulerError::Timeout { .. }) => pool.discard(lease),
        Err(SchedulerError::Sink { .. }) => pool.release(lease).await,
    }
    outcome
}
