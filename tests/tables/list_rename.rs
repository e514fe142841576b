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

use crate::common::load;
use floe::builders::CatalogApi;
use floe::catalog::TableIdent;
use floe::error::Error;
use floe::response::HasTable;
use floe_common::test_context::TestContext;
use floe_common::utils::{ident_in, rand_namespace, rand_table_name, test_schema};

#[floe_macros::test(no_table)]
async fn list_tables(ctx: TestContext) {
    let namespace = rand_namespace();
    let other = rand_namespace();
    let mut names: Vec<String> = (0..3).map(|_| rand_table_name()).collect();
    for name in &names {
        ctx.client
            .create_table(ident_in(&namespace, name), test_schema())
            .build()
            .send()
            .await
            .unwrap();
    }
    ctx.client
        .create_table(ident_in(&other, &rand_table_name()), test_schema())
        .build()
        .send()
        .await
        .unwrap();

    let resp = ctx.client.list_tables(namespace.clone()).build().send().await.unwrap();
    assert_eq!(resp.namespace(), &namespace);
    names.sort();
    let listed: Vec<String> = resp.identifiers().iter().map(|i| i.name().to_string()).collect();
    assert_eq!(listed, names);

    let empty = ctx.client.list_tables(rand_namespace()).build().send().await.unwrap();
    assert!(empty.identifiers().is_empty());
}

#[floe_macros::test]
async fn rename_table(ctx: TestContext, ident: TableIdent) {
    let before = load(&ctx.client, &ident).await;
    let target = ident_in(ident.namespace(), &rand_table_name());

    let resp = ctx
        .client
        .rename_table(ident.clone(), target.clone())
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(resp.from(), &ident);
    assert_eq!(resp.to(), &target);

    assert!(!ctx.client.table_exists(ident.clone()).build().send().await.unwrap().exists());
    let after = load(&ctx.client, &target).await;
    assert_eq!(after.metadata_location(), before.metadata_location());

    // move it back so the guard can clean up
    ctx.client.rename_table(target, ident).build().send().await.unwrap();
}

#[floe_macros::test]
async fn rename_table_errors(ctx: TestContext, ident: TableIdent) {
    let err = ctx
        .client
        .rename_table(ident.clone(), ident.clone())
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");

    let missing = ident_in(ident.namespace(), &rand_table_name());
    let err = ctx
        .client
        .rename_table(missing, ident_in(ident.namespace(), &rand_table_name()))
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");

    let taken = ident_in(ident.namespace(), &rand_table_name());
    ctx.client.create_table(taken.clone(), test_schema()).build().send().await.unwrap();
    let err = ctx
        .client
        .rename_table(ident.clone(), taken)
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(err.is_already_exists(), "{err}");
    assert!(ctx.client.table_exists(ident).build().send().await.unwrap().exists());
}
