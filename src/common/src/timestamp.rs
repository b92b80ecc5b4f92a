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

//! One run produces three timestamped artifacts (the SQL export, the text
//! report, the log file); all three share the same `YYYYMMDD_HHMMSS` token
//! so an operator can correlate them.

use chrono::{DateTime, Utc};

pub fn format_run_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_as_compact_local_style_stamp() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 30, 9, 5, 3).unwrap();
        assert_eq!(format_run_timestamp(ts), "20260730_090503");
    }
}
