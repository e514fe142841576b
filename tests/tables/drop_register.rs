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

use crate::common::{append_files, live_paths, load};
use floe::builders::CatalogApi;
use floe::catalog::{MetadataLocation, TableIdent};
use floe::error::Error;
use floe::response::HasTable;
use floe_common::test_context::TestContext;
use floe_common::utils::{rand_data_file, rand_ident};

#[floe_macros::test]
async fn drop_and_register(ctx: TestContext, ident: TableIdent) {
    let location = load(&ctx.client, &ident).await.metadata().location().to_string();
    let file = rand_data_file(&location, 5);
    let committed = append_files(&ctx.client, &ident, vec![file.clone()]).await;

    let dropped = ctx.client.drop_table(ident.clone()).build().send().await.unwrap();
    assert_eq!(dropped.metadata_location(), committed.metadata_location());
    assert!(!dropped.purged());
    let exists = ctx.client.table_exists(ident.clone()).build().send().await.unwrap();
    assert!(!exists.exists());
    // files stay behind for a later registration
    assert!(ctx.file_io.exists(dropped.metadata_location().as_str()).await.unwrap());

    let registered = ctx
        .client
        .register_table(ident.clone(), dropped.metadata_location().clone())
        .build()
        .send()
        .await
        .unwrap();
    let metadata = registered.metadata().unwrap();
    assert_eq!(metadata.uuid(), committed.metadata().uuid());
    assert_eq!(metadata.current_snapshot_id(), committed.metadata().current_snapshot_id());

    let loaded = load(&ctx.client, &ident).await;
    assert_eq!(loaded.metadata_location(), committed.metadata_location());
    assert_eq!(live_paths(&loaded).await, vec![file.file_path]);
}

#[floe_macros::test]
async fn register_existing_ident(ctx: TestContext, ident: TableIdent) {
    let current = load(&ctx.client, &ident).await.metadata_location().clone();
    let err = ctx
        .client
        .register_table(ident, current)
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TableAlreadyExists { .. }), "{err}");
}

#[floe_macros::test(no_table)]
async fn register_missing_file(ctx: TestContext) {
    let ident = rand_ident();
    let missing =
        MetadataLocation::new(format!("{}/gone/metadata/00001-missing.metadata.json", ctx.warehouse)).unwrap();

    let err = ctx
        .client
        .register_table(ident.clone(), missing.clone())
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }), "{err}");
    assert!(!ctx.client.table_exists(ident.clone()).build().send().await.unwrap().exists());

    // without validation the binding is made and the failure surfaces on load
    let resp = ctx
        .client
        .register_table(ident.clone(), missing)
        .validate(false)
        .build()
        .send()
        .await
        .unwrap();
    assert!(resp.metadata().is_none());
    let err = ctx.client.load_table(ident).build().send().await.unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }), "{err}");
}

#[floe_macros::test(no_cleanup)]
async fn drop_with_purge(ctx: TestContext, ident: TableIdent) {
    let location = load(&ctx.client, &ident).await.metadata().location().to_string();
    let committed = append_files(&ctx.client, &ident, vec![rand_data_file(&location, 1)]).await;
    let snapshot = committed.metadata().current_snapshot().unwrap().clone();
    let manifests = committed.table().manifests().await.unwrap();
    assert_eq!(manifests.len(), 1);

    let dropped = ctx
        .client
        .drop_table(ident.clone())
        .purge(true)
        .build()
        .send()
        .await
        .unwrap();
    assert!(dropped.purged());

    let io = &ctx.file_io;
    assert!(!io.exists(dropped.metadata_location().as_str()).await.unwrap());
    assert!(!io.exists(&snapshot.manifest_list).await.unwrap());
    assert!(!io.exists(&manifests[0].manifest_path).await.unwrap());
    for entry in committed.metadata().metadata_log() {
        assert!(!io.exists(&entry.metadata_file).await.unwrap());
    }

    let err = ctx.client.drop_table(ident).build().send().await.unwrap_err();
    assert!(err.is_not_found());
}
