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

use floe::builders::CatalogApi;
use floe::catalog::TableIdent;
use floe::client::CatalogClient;

/// Drops and purges a test table
pub struct CleanupGuard {
    client: CatalogClient,
    ident: TableIdent,
}

impl CleanupGuard {
    #[allow(dead_code)]
    pub fn new(client: CatalogClient, ident: TableIdent) -> Self {
        Self { client, ident }
    }

    pub async fn cleanup(&self) {
        cleanup(self.client.clone(), &self.ident).await;
    }
}

pub async fn cleanup(client: CatalogClient, ident: &TableIdent) {
    tokio::select!(
        _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {
            eprintln!("Cleanup timeout after 60s while dropping table {ident}");
        },
        outcome = client.drop_table(ident.clone()).purge(true).build().send() => {
            match outcome {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    eprintln!("Error dropping table '{ident}':\n{e}");
                }
            }
        }
    );
}
