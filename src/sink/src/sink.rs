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

//! The export sink (spec.md §4.3): a single append-only
//! `export_<ts>.sql` artifact. Not concurrency-safe on its own; writers
//! serialize through the internal mutex, which is the "single dedicated
//! writer" option spec.md §5 allows.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// An append-only SQL export artifact. Cheap to clone (an `Arc` internally
/// would be typical, but callers hold a single instance behind `Arc` at the
/// orchestrator level instead, matching the teacher's `Arc<Manager>` idiom).
pub struct Sink {
    inner: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl Sink {
    /// Creates `export_<timestamp>.sql` under `output_directory` (created
    /// if missing) and writes the file header.
    pub async fn create(
        output_directory: &Path,
        timestamp: &str,
        database_name: &str,
        table_count: usize,
        row_limit: i64,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(output_directory).await?;
        let path = output_directory.join(format!("export_{timestamp}.sql"));
        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);

        let header = format!(
            "-- tablewave export\n\
             -- database: {database_name}\n\
             -- generated: {timestamp}\n\
             -- tables: {table_count}\n\
             -- row limit: {row_limit}\n\
             SET NOCOUNT ON;\n\
             GO\n\n"
        );
        writer.write_all(header.as_bytes()).await?;
        writer.flush().await?;

        Ok(Self {
            inner: Mutex::new(writer),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the comment-block header for one table.
    pub async fn write_table_header(&self, schema_name: &str, table_name: &str) -> std::io::Result<()> {
        let mut guard = self.inner.lock().await;
        let header = format!("-- ==========================================\n\
             -- Table: {schema_name}.{table_name}\n\
             -- ==========================================\n");
        guard.write_all(header.as_bytes()).await
    }

    /// Appends one already-rendered chunk of `INSERT` statements.
    pub async fn write_insert_batch(&self, statements: &[String]) -> std::io::Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let mut guard = self.inner.lock().await;
        for statement in statements {
            guard.write_all(statement.as_bytes()).await?;
            guard.write_all(b"\n").await?;
        }
        Ok(())
    }

    /// Closes out one table's section with a batch separator.
    pub async fn write_table_footer(&self) -> std::io::Result<()> {
        let mut guard = self.inner.lock().await;
        guard.write_all(b"GO\n\n").await
    }

    /// Writes the file footer banner and flushes to disk.
    pub async fn close(&self, total_tables: usize, timestamp: &str) -> std::io::Result<()> {
        let mut guard = self.inner.lock().await;
        let footer = format!(
            "-- export complete: {total_tables} tables, finished {timestamp}\n"
        );
        guard.write_all(footer.as_bytes()).await?;
        guard.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_header_body_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::create(dir.path(), "20260730_090503", "Northwind", 1, 10)
            .await
            .unwrap();

        sink.write_table_header("dbo", "orders").await.unwrap();
        sink.write_insert_batch(&["INSERT INTO [dbo].[orders] ([id]) VALUES (1);".to_owned()])
            .await
            .unwrap();
        sink.write_table_footer().await.unwrap();
        sink.close(1, "20260730_090504").await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert!(contents.contains("SET NOCOUNT ON;"));
        assert!(contents.contains("Table: dbo.orders"));
        assert!(contents.contains("INSERT INTO [dbo].[orders]"));
        assert!(contents.contains("GO\n"));
        assert!(contents.contains("export complete: 1 tables"));
    }

    #[tokio::test]
    async fn empty_schema_produces_valid_header_and_footer_only() {
        // spec.md §8 boundary scenario 6
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::create(dir.path(), "20260730_090503", "Empty", 0, 10)
            .await
            .unwrap();
        sink.close(0, "20260730_090503").await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert!(contents.contains("tables: 0"));
        assert!(contents.contains("export complete: 0 tables"));
        assert!(!contents.contains("INSERT INTO"));
    }
}
