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

//! Common helper functions for table integration tests

use floe::builders::CatalogApi;
use floe::catalog::TableIdent;
use floe::client::CatalogClient;
use floe::commit::{AppendFiles, DeleteFiles};
use floe::manifest::DataFile;
use floe::response::{CommitTableResponse, HasTable, LoadTableResponse};

pub async fn append_files(client: &CatalogClient, ident: &TableIdent, files: Vec<DataFile>) -> CommitTableResponse {
    client
        .commit_table(ident.clone(), AppendFiles::new().add_files(files))
        .build()
        .send()
        .await
        .unwrap()
}

pub async fn delete_paths(client: &CatalogClient, ident: &TableIdent, paths: &[&str]) -> CommitTableResponse {
    client
        .commit_table(
            ident.clone(),
            DeleteFiles::new().delete_files(paths.iter().map(|p| p.to_string())),
        )
        .build()
        .send()
        .await
        .unwrap()
}

pub async fn load(client: &CatalogClient, ident: &TableIdent) -> LoadTableResponse {
    client.load_table(ident.clone()).build().send().await.unwrap()
}

/// Sorted paths of the live data files in the current snapshot
pub async fn live_paths<R: HasTable>(resp: &R) -> Vec<String> {
    let mut paths: Vec<String> = resp
        .table()
        .all_data_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.file_path)
        .collect();
    paths.sort();
    paths
}
