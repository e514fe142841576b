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

use crate::cleanup_guard::CleanupGuard;
use crate::utils::{rand_ident, test_schema};
use floe::builders::CatalogApi;
use floe::catalog::{MemoryCatalog, TableIdent};
use floe::client::CatalogClient;
use floe::commit::RetryPolicy;
use floe::io::{FileIO, LocalFileIO, MemoryFileIO};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct TestContext {
    pub client: CatalogClient,
    pub catalog: MemoryCatalog,
    pub file_io: Arc<dyn FileIO>,
    pub warehouse: String,
    /// Set when the tables live on the local filesystem
    pub local_root: Option<PathBuf>,
}

impl TestContext {
    /// Builds a context around a fresh in-memory catalog
    ///
    /// Table files go to memory unless `FLOE_TEST_WAREHOUSE` names a
    /// directory, in which case each context gets its own subdirectory
    /// there. Retries use short waits so conflict tests stay fast;
    /// `FLOE_TEST_NUM_RETRIES` overrides the retry count.
    pub fn new_from_env() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let num_retries: u32 = std::env::var("FLOE_TEST_NUM_RETRIES")
            .unwrap_or("8".into())
            .parse()
            .unwrap_or(8);
        log::debug!("FLOE_TEST_NUM_RETRIES={num_retries}");
        let retry_policy = RetryPolicy {
            num_retries,
            min_wait_ms: 1,
            max_wait_ms: 20,
            ..RetryPolicy::default()
        };

        let run = uuid::Uuid::new_v4().simple().to_string();
        let catalog = MemoryCatalog::new();
        match std::env::var("FLOE_TEST_WAREHOUSE") {
            Ok(dir) if !dir.is_empty() => {
                let root = PathBuf::from(dir).join(format!("run-{run}"));
                std::fs::create_dir_all(&root).unwrap();
                let warehouse = root.to_str().unwrap().to_string();
                log::debug!("FLOE_TEST_WAREHOUSE={warehouse}");
                let client = CatalogClient::builder()
                    .catalog(catalog.clone())
                    .file_io(LocalFileIO::new())
                    .warehouse(warehouse.clone())
                    .retry_policy(retry_policy)
                    .build()
                    .unwrap();
                Self {
                    file_io: client.file_io().clone(),
                    client,
                    catalog,
                    warehouse,
                    local_root: Some(root),
                }
            }
            _ => {
                let warehouse = format!("mem://warehouse-{run}");
                let client = CatalogClient::builder()
                    .catalog(catalog.clone())
                    .file_io(MemoryFileIO::new())
                    .warehouse(warehouse.clone())
                    .retry_policy(retry_policy)
                    .build()
                    .unwrap();
                Self {
                    file_io: client.file_io().clone(),
                    client,
                    catalog,
                    warehouse,
                    local_root: None,
                }
            }
        }
    }

    /// Creates a table with [`test_schema`] under a random identifier.
    ///
    /// The returned guard drops and purges the table when cleaned up.
    ///
    /// # Example
    /// ```ignore
    /// let (ident, guard) = ctx.create_table_helper().await;
    /// // ... use the table ...
    /// guard.cleanup().await;
    /// ```
    pub async fn create_table_helper(&self) -> (TableIdent, CleanupGuard) {
        let ident = rand_ident();
        self.client
            .create_table(ident.clone(), test_schema())
            .build()
            .send()
            .await
            .unwrap();
        let guard = CleanupGuard::new(self.client.clone(), ident.clone());
        (ident, guard)
    }
}
