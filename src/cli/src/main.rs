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

mod opts;
mod orchestrator;

use clap::Parser;
use chrono::Utc;

use tablewave_common::logging::{init_logger, LoggerSettings};
use tablewave_common::timestamp::format_run_timestamp;
use tablewave_sink::write_report;

use opts::Opts;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    std::process::exit(exit_code);
}

/// Exit codes (SPEC_FULL §6): `0` success, `1` any `ExportError`.
async fn run() -> i32 {
    let opts = Opts::parse();
    let timestamp = format_run_timestamp(Utc::now());

    let config = match opts
        .load_config_file()
        .and_then(|file| opts.into_export_config(file))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };

    let log_settings = LoggerSettings::new(config.output_directory.join("logs"), &timestamp);
    let _guard = match init_logger(log_settings) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            return 1;
        }
    };

    let started_at = Utc::now().to_rfc3339();
    let run_result = orchestrator::run(&config, &timestamp).await;
    let finished_at = Utc::now().to_rfc3339();

    match run_result {
        Ok(summary) => {
            if let Err(err) = write_report(&config.output_directory, &timestamp, &summary, &started_at, &finished_at).await {
                eprintln!("failed to write report: {err}");
                return 1;
            }
            tracing::info!(duration = finished_at.as_str(), "tablewave export finished");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "tablewave export failed");
            1
        }
    }
}
