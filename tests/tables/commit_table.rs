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

use crate::common::{append_files, delete_paths, live_paths, load};
use floe::builders::CatalogApi;
use floe::catalog::TableIdent;
use floe::commit::{OverwriteFiles, RetryPolicy, TableChange, compute_with};
use floe::error::{Error, ValidationErr};
use floe::metadata::{Operation, Snapshot, Summary, TableUpdate};
use floe::response::HasTable;
use floe_common::test_context::TestContext;
use floe_common::utils::rand_data_file;
use std::collections::HashMap;

#[floe_macros::test]
async fn append_delete_overwrite(ctx: TestContext, ident: TableIdent) {
    let location = load(&ctx.client, &ident).await.metadata().location().to_string();
    let a = rand_data_file(&location, 10);
    let b = rand_data_file(&location, 20);
    let c = rand_data_file(&location, 30);

    let appended = append_files(&ctx.client, &ident, vec![a.clone(), b.clone()]).await;
    let snapshot = appended.metadata().current_snapshot().unwrap().clone();
    assert_eq!(snapshot.sequence_number, 1);
    assert_eq!(snapshot.parent_snapshot_id, None);
    assert_eq!(snapshot.summary.operation, Operation::Append);
    assert_eq!(snapshot.summary.counter("added-data-files"), 2);
    assert_eq!(snapshot.summary.counter("total-records"), 30);
    assert_eq!(live_paths(&appended).await, sorted(&[a.file_path.as_str(), b.file_path.as_str()]));

    let deleted = delete_paths(&ctx.client, &ident, &[&a.file_path]).await;
    let snapshot = deleted.metadata().current_snapshot().unwrap().clone();
    assert_eq!(snapshot.sequence_number, 2);
    assert_eq!(snapshot.summary.operation, Operation::Delete);
    assert_eq!(snapshot.summary.counter("deleted-data-files"), 1);
    assert_eq!(snapshot.summary.counter("total-data-files"), 1);
    assert_eq!(live_paths(&deleted).await, vec![b.file_path.clone()]);

    let overwritten = ctx
        .client
        .commit_table(
            ident.clone(),
            OverwriteFiles::new().delete_file(b.file_path.clone()).add_file(c.clone()),
        )
        .build()
        .send()
        .await
        .unwrap();
    let snapshot = overwritten.metadata().current_snapshot().unwrap().clone();
    assert_eq!(snapshot.summary.operation, Operation::Overwrite);
    assert_eq!(snapshot.summary.counter("total-records"), 30);
    assert_eq!(live_paths(&overwritten).await, vec![c.file_path.clone()]);

    // every commit extends the metadata log and the snapshot history
    let loaded = load(&ctx.client, &ident).await;
    assert_eq!(loaded.metadata_location(), overwritten.metadata_location());
    assert_eq!(loaded.metadata().metadata_log().len(), 3);
    assert_eq!(loaded.metadata().snapshots().len(), 3);
    assert_eq!(loaded.metadata().last_sequence_number(), 3);
}

#[floe_macros::test]
async fn delete_unknown_file(ctx: TestContext, ident: TableIdent) {
    let before = load(&ctx.client, &ident).await;
    let err = ctx
        .client
        .commit_table(
            ident.clone(),
            floe::commit::DeleteFiles::new().delete_file("mem://nowhere/missing.parquet"),
        )
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
    let after = load(&ctx.client, &ident).await;
    assert_eq!(after.metadata_location(), before.metadata_location());
}

#[floe_macros::test]
async fn stale_sequence_number_rejected(ctx: TestContext, ident: TableIdent) {
    let location = load(&ctx.client, &ident).await.metadata().location().to_string();
    let committed = append_files(&ctx.client, &ident, vec![rand_data_file(&location, 1)]).await;
    let current = committed.metadata().current_snapshot().unwrap().clone();

    let stale = Snapshot {
        snapshot_id: current.snapshot_id + 1,
        parent_snapshot_id: Some(current.snapshot_id),
        sequence_number: current.sequence_number,
        timestamp_ms: current.timestamp_ms,
        manifest_list: current.manifest_list.clone(),
        summary: Summary::new(Operation::Append),
        schema_id: current.schema_id,
    };
    let err = ctx
        .client
        .commit_table(
            ident.clone(),
            TableChange::new(vec![TableUpdate::AddSnapshot { snapshot: stale }]),
        )
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Validation(ValidationErr::StaleSequenceNumber { .. })),
        "{err}"
    );

    let loaded = load(&ctx.client, &ident).await;
    assert_eq!(loaded.metadata_location(), committed.metadata_location());
    assert_eq!(loaded.metadata().snapshots().len(), 1);
}

#[floe_macros::test]
async fn set_properties(ctx: TestContext, ident: TableIdent) {
    let updates = HashMap::from([("write.target-file-size-bytes".to_string(), "1048576".to_string())]);
    let resp = ctx
        .client
        .commit_table(ident.clone(), TableChange::new(vec![TableUpdate::SetProperties { updates }]))
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(resp.metadata().property("write.target-file-size-bytes"), Some("1048576"));

    let resp = ctx
        .client
        .commit_table(
            ident.clone(),
            TableChange::new(vec![TableUpdate::RemoveProperties {
                removals: vec!["write.target-file-size-bytes".to_string()],
            }]),
        )
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(resp.metadata().property("write.target-file-size-bytes"), None);
}

#[floe_macros::test]
async fn retries_exhausted(ctx: TestContext, ident: TableIdent) {
    // Every attempt lets a competing writer commit first, so the swap always loses.
    let client = ctx.client.clone();
    let competitor = ident.clone();
    let producer = compute_with(move |_base, attempt| {
        let client = client.clone();
        let ident = competitor.clone();
        async move {
            let updates = HashMap::from([("competitor".to_string(), attempt.to_string())]);
            client
                .commit_table(ident, TableChange::new(vec![TableUpdate::SetProperties { updates }]))
                .build()
                .send()
                .await?;
            let updates = HashMap::from([("loser".to_string(), attempt.to_string())]);
            Ok(TableChange::new(vec![TableUpdate::SetProperties { updates }]))
        }
    });

    let policy = RetryPolicy {
        num_retries: 2,
        min_wait_ms: 1,
        max_wait_ms: 2,
        ..RetryPolicy::default()
    };
    let err = ctx
        .client
        .commit_table(ident.clone(), producer)
        .retry_policy(policy)
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommitConflict { attempts: 3, .. }), "{err}");

    let loaded = load(&ctx.client, &ident).await;
    assert_eq!(loaded.metadata().property("competitor"), Some("3"));
    assert_eq!(loaded.metadata().property("loser"), None);
}

fn sorted(paths: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    v.sort();
    v
}
