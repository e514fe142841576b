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

//! Client method for CommitTable operation

use crate::builders::{CommitTable, CommitTableBldr};
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::commit::UpdateProducer;
use std::sync::Arc;

impl CatalogClient {
    /// Commits a change to a table, retrying on concurrent updates
    ///
    /// # Arguments
    ///
    /// * `ident` - Table to commit to
    /// * `producer` - Derives the change from each freshly loaded version,
    ///   for example [`AppendFiles`](crate::commit::AppendFiles)
    ///
    /// # Optional Parameters
    ///
    /// * `retry_policy` - Overrides the client's retry policy
    ///
    /// Fails with `CommitConflict` once retries are exhausted.
    pub fn commit_table(&self, ident: TableIdent, producer: impl UpdateProducer + 'static) -> CommitTableBldr {
        let producer: Arc<dyn UpdateProducer> = Arc::new(producer);
        CommitTable::builder().client(self.clone()).ident(ident).producer(producer)
    }
}
