// Floe - Rust client library for Apache Iceberg tables
// Copyright 2025 The Floe Authors
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

use crate::error::ValidationErr;
use crate::metadata::Properties;
use std::time::Duration;

pub const COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
pub const COMMIT_MIN_RETRY_WAIT_MS: &str = "commit.retry.min-wait-ms";
pub const COMMIT_MAX_RETRY_WAIT_MS: &str = "commit.retry.max-wait-ms";
pub const COMMIT_TOTAL_RETRY_TIME_MS: &str = "commit.retry.total-timeout-ms";

/// Bounds of the optimistic retry loop
///
/// Only commit conflicts are retried. The wait before retry `n` (1-based)
/// is `min_wait_ms * 2^(n-1)`, capped at `max_wait_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub num_retries: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// No retry starts once this much time has passed since the first attempt
    pub total_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            num_retries: 4,
            min_wait_ms: 100,
            max_wait_ms: 60_000,
            total_timeout_ms: 1_800_000,
        }
    }
}

fn parse<T: std::str::FromStr>(properties: &Properties, key: &str) -> Result<Option<T>, ValidationErr> {
    match properties.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValidationErr::invalid(format!("table property {key} has invalid value {v:?}"))),
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retries() -> Self {
        RetryPolicy {
            num_retries: 0,
            ..Default::default()
        }
    }

    /// Overrides fields set by the `commit.retry.*` table properties
    pub fn with_properties(self, properties: &Properties) -> Result<Self, ValidationErr> {
        let policy = RetryPolicy {
            num_retries: parse(properties, COMMIT_NUM_RETRIES)?.unwrap_or(self.num_retries),
            min_wait_ms: parse(properties, COMMIT_MIN_RETRY_WAIT_MS)?.unwrap_or(self.min_wait_ms),
            max_wait_ms: parse(properties, COMMIT_MAX_RETRY_WAIT_MS)?.unwrap_or(self.max_wait_ms),
            total_timeout_ms: parse(properties, COMMIT_TOTAL_RETRY_TIME_MS)?.unwrap_or(self.total_timeout_ms),
        };
        if policy.min_wait_ms > policy.max_wait_ms {
            return Err(ValidationErr::invalid(format!(
                "{COMMIT_MIN_RETRY_WAIT_MS} ({}) exceeds {COMMIT_MAX_RETRY_WAIT_MS} ({})",
                policy.min_wait_ms, policy.max_wait_ms
            )));
        }
        Ok(policy)
    }

    /// Default policy adjusted by table properties
    pub fn from_properties(properties: &Properties) -> Result<Self, ValidationErr> {
        RetryPolicy::default().with_properties(properties)
    }

    /// Wait before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.min_wait_ms.saturating_mul(factor).min(self.max_wait_ms))
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }
}
