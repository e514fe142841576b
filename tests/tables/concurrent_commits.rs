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

use crate::common::{live_paths, load};
use floe::builders::CatalogApi;
use floe::catalog::TableIdent;
use floe::commit::{AppendFiles, RetryPolicy};
use floe::error::Error;
use floe::response::HasTable;
use floe_common::test_context::TestContext;
use floe_common::utils::{rand_data_file, rand_ident, test_schema};
use std::collections::HashSet;
use tokio::task::JoinSet;

const WRITERS: usize = 8;

#[floe_macros::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends(ctx: TestContext, ident: TableIdent) {
    let location = load(&ctx.client, &ident).await.metadata().location().to_string();
    // a writer can lose to each of the others once
    let policy = RetryPolicy {
        num_retries: WRITERS as u32 * 2,
        min_wait_ms: 1,
        max_wait_ms: 10,
        ..RetryPolicy::default()
    };

    let mut tasks = JoinSet::new();
    let mut expected = Vec::new();
    for i in 0..WRITERS {
        let file = rand_data_file(&location, i as i64 + 1);
        expected.push(file.file_path.clone());
        let client = ctx.client.clone();
        let ident = ident.clone();
        tasks.spawn(async move {
            client
                .commit_table(ident, AppendFiles::new().add_file(file))
                .retry_policy(policy)
                .build()
                .send()
                .await
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    let loaded = load(&ctx.client, &ident).await;
    let metadata = loaded.metadata();
    assert_eq!(metadata.snapshots().len(), WRITERS);
    assert_eq!(metadata.last_sequence_number(), WRITERS as i64);
    assert_eq!(metadata.metadata_log().len(), WRITERS);

    let sequence_numbers: HashSet<i64> = metadata.snapshots().map(|s| s.sequence_number).collect();
    assert_eq!(sequence_numbers, (1..=WRITERS as i64).collect());

    // history is a single chain from the current snapshot back to the first
    let mut chain = 0;
    let mut next = metadata.current_snapshot().map(|s| s.snapshot_id);
    while let Some(id) = next {
        chain += 1;
        next = metadata.snapshot_by_id(id).unwrap().parent_snapshot_id;
    }
    assert_eq!(chain, WRITERS);

    let current = metadata.current_snapshot().unwrap();
    assert_eq!(current.summary.counter("total-data-files"), WRITERS as i64);
    assert_eq!(
        current.summary.counter("total-records"),
        (1..=WRITERS as i64).sum::<i64>()
    );
    expected.sort();
    assert_eq!(live_paths(&loaded).await, expected);
}

#[floe_macros::test(no_table, flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates(ctx: TestContext) {
    let ident = rand_ident();
    let mut tasks = JoinSet::new();
    for _ in 0..WRITERS {
        let client = ctx.client.clone();
        let ident = ident.clone();
        tasks.spawn(async move { client.create_table(ident, test_schema()).build().send().await });
    }

    let mut created = 0;
    while let Some(res) = tasks.join_next().await {
        match res.unwrap() {
            Ok(_) => created += 1,
            Err(Error::TableAlreadyExists { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
    assert!(ctx.client.table_exists(ident).build().send().await.unwrap().exists());
}
