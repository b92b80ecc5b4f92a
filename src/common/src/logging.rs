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

//! Logger setup for the `tablewave` binary: a compact stdout layer plus a
//! structured file layer under `logs/export_<ts>.log` (spec.md §6).

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;

pub struct LoggerSettings {
    pub colorful: bool,
    pub log_dir: std::path::PathBuf,
    pub log_file_name: String,
}

impl LoggerSettings {
    pub fn new(log_dir: impl Into<std::path::PathBuf>, timestamp: &str) -> Self {
        Self {
            colorful: console_colors_enabled(),
            log_dir: log_dir.into(),
            log_file_name: format!("export_{timestamp}.log"),
        }
    }
}

fn console_colors_enabled() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Configures third-party crates to only log at WARN and above; `tablewave`
/// crates default to DEBUG. Mirrors the teacher's `configure_*_targets_fmt`
/// helpers in `src/utils/runtime/src/lib.rs`.
fn configure_targets(targets: filter::Targets) -> filter::Targets {
    targets
        .with_target("tiberius", Level::INFO)
        .with_target("tokio_util", Level::WARN)
        .with_target("h2", Level::WARN)
        .with_target("hyper", Level::WARN)
        .with_default(Level::DEBUG)
}

/// Initializes the global `tracing` subscriber. Returns a guard that must
/// be kept alive for the duration of the process so buffered file writes
/// are flushed on drop.
pub fn init_logger(settings: LoggerSettings) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.log_dir)?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(settings.colorful)
        .with_filter(configure_targets(filter::Targets::new()));

    let file_appender = tracing_appender::rolling::never(&settings.log_dir, &settings.log_file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(configure_targets(filter::Targets::new()));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// The log file path this session will write to, for surfacing in the
/// final report.
pub fn log_file_path(settings: &LoggerSettings) -> std::path::PathBuf {
    Path::new(&settings.log_dir).join(&settings.log_file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_embeds_the_run_timestamp() {
        let settings = LoggerSettings::new("logs", "20260730_101500");
        assert_eq!(settings.log_file_name, "export_20260730_101500.log");
    }

    #[test]
    fn log_file_path_joins_dir_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggerSettings::new(dir.path().to_path_buf(), "20260730_101500");
        assert_eq!(log_file_path(&settings), dir.path().join("export_20260730_101500.log"));
    }
}
