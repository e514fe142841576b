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

//! Commit engine
//!
//! A commit turns a base metadata version plus a [`TableChange`] into a new
//! metadata file and swaps the catalog pointer to it. The catalog's
//! compare-and-swap is the only point where concurrent writers meet; a
//! writer that loses the race reloads the table, asks its
//! [`UpdateProducer`] for a fresh change and tries again.

mod engine;
pub mod location;
mod retry;
mod snapshot;

pub use engine::{
    METADATA_PREVIOUS_VERSIONS_MAX, commit, commit_with_retry, create_table, drop_table,
    load_metadata, register_table,
};
pub use retry::{
    COMMIT_MAX_RETRY_WAIT_MS, COMMIT_MIN_RETRY_WAIT_MS, COMMIT_NUM_RETRIES,
    COMMIT_TOTAL_RETRY_TIME_MS, RetryPolicy,
};
pub use snapshot::{AVRO_COMPRESSION_CODEC, AppendFiles, DeleteFiles, OverwriteFiles};

use crate::error::Error;
use crate::io::FileIO;
use crate::metadata::{TableMetadata, TableRequirement, TableUpdate};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::future::Future;

/// Changes one commit attempt makes to a table
///
/// `staged_files` are written before the new metadata file. They must live
/// at fresh locations, since a file from a losing attempt is deleted.
#[derive(Debug, Clone, Default)]
pub struct TableChange {
    pub requirements: Vec<TableRequirement>,
    pub updates: Vec<TableUpdate>,
    /// `(location, content)` of manifests and manifest lists referenced by `updates`
    pub staged_files: Vec<(String, Bytes)>,
}

impl TableChange {
    pub fn new(updates: Vec<TableUpdate>) -> Self {
        TableChange {
            updates,
            ..Default::default()
        }
    }

    pub fn with_requirement(mut self, requirement: TableRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_staged_file(mut self, location: impl Into<String>, content: Bytes) -> Self {
        self.staged_files.push((location.into(), content));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Derives the change to commit from the table's current metadata
///
/// Called once per attempt with freshly loaded metadata, so implementations
/// must compute their change from `base` rather than from state captured
/// during an earlier attempt. `attempt` starts at 1.
#[async_trait]
pub trait UpdateProducer: fmt::Debug + Send + Sync {
    async fn produce(&self, base: &TableMetadata, io: &dyn FileIO, attempt: u32) -> Result<TableChange, Error>;
}

/// A fixed change, reapplied unchanged on every attempt
#[async_trait]
impl UpdateProducer for TableChange {
    async fn produce(&self, _base: &TableMetadata, _io: &dyn FileIO, _attempt: u32) -> Result<TableChange, Error> {
        Ok(self.clone())
    }
}

/// Producer computing updates with a closure
pub struct ComputeWith<F>(F);

impl<F> fmt::Debug for ComputeWith<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputeWith")
    }
}

/// Wraps `f` as an [`UpdateProducer`]
pub fn compute_with<F, Fut>(f: F) -> ComputeWith<F>
where
    F: Fn(TableMetadata, u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TableChange, Error>> + Send,
{
    ComputeWith(f)
}

#[async_trait]
impl<F, Fut> UpdateProducer for ComputeWith<F>
where
    F: Fn(TableMetadata, u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TableChange, Error>> + Send,
{
    async fn produce(&self, base: &TableMetadata, _io: &dyn FileIO, attempt: u32) -> Result<TableChange, Error> {
        (self.0)(base.clone(), attempt).await
    }
}
