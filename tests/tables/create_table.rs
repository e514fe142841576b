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
use floe::commit::location::parse_metadata_version;
use floe::error::Error;
use floe::metadata::{PartitionField, PartitionSpec, Transform};
use floe::response::HasTable;
use floe_common::test_context::TestContext;
use floe_common::utils::{rand_ident, test_schema};
use std::collections::HashMap;

#[floe_macros::test(no_table)]
async fn create_table_defaults(ctx: TestContext) {
    let ident = rand_ident();
    let resp = ctx
        .client
        .create_table(ident.clone(), test_schema())
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(resp.ident(), &ident);
    let metadata = resp.metadata();
    assert_eq!(metadata.format_version(), 2);
    assert_eq!(
        metadata.location(),
        format!("{}/{}/{}", ctx.warehouse, ident.namespace(), ident.name())
    );
    assert!(metadata.current_snapshot().is_none());
    assert!(metadata.default_partition_spec().is_unpartitioned());
    assert_eq!(parse_metadata_version(resp.metadata_location().as_str()), Some(0));
    assert!(resp.metadata_location().as_str().starts_with(metadata.location()));
    assert!(ctx.file_io.exists(resp.metadata_location().as_str()).await.unwrap());

    let exists = ctx.client.table_exists(ident).build().send().await.unwrap();
    assert!(exists.exists());
}

#[floe_macros::test(no_table)]
async fn create_table_options(ctx: TestContext) {
    let ident = rand_ident();
    let location = format!("{}/custom/location", ctx.warehouse);
    let properties = HashMap::from([
        ("format-version".to_string(), "1".to_string()),
        ("owner".to_string(), "etl".to_string()),
    ]);
    let resp = ctx
        .client
        .create_table(ident.clone(), test_schema())
        .partition_spec(PartitionSpec::new(
            0,
            vec![PartitionField::new(1, 0, "id_bucket", Transform::Bucket(16))],
        ))
        .properties(properties)
        .location(location.clone())
        .build()
        .send()
        .await
        .unwrap();

    let metadata = resp.metadata();
    assert_eq!(metadata.format_version(), 1);
    assert_eq!(metadata.location(), location);
    assert_eq!(metadata.property("owner"), Some("etl"));
    assert_eq!(metadata.property("format-version"), None);
    let spec = metadata.default_partition_spec();
    assert_eq!(spec.fields.len(), 1);
    assert_eq!(spec.fields[0].field_id, 1000);

    let loaded = ctx.client.load_table(ident).build().send().await.unwrap();
    assert_eq!(loaded.metadata(), resp.metadata());
}

#[floe_macros::test]
async fn create_table_already_exists(ctx: TestContext, ident: TableIdent) {
    let before = ctx.client.load_table(ident.clone()).build().send().await.unwrap();

    let err = ctx
        .client
        .create_table(ident.clone(), test_schema())
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TableAlreadyExists { .. }), "{err}");
    assert!(err.is_already_exists());

    let after = ctx.client.load_table(ident).build().send().await.unwrap();
    assert_eq!(after.metadata_location(), before.metadata_location());
}

#[floe_macros::test(no_table)]
async fn create_table_invalid_format_version(ctx: TestContext) {
    let err = ctx
        .client
        .create_table(rand_ident(), test_schema())
        .format_version(7)
        .build()
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
}

#[floe_macros::test(no_table)]
async fn load_missing_table(ctx: TestContext) {
    let err = ctx.client.load_table(rand_ident()).build().send().await.unwrap_err();
    assert!(matches!(err, Error::TableNotFound { .. }), "{err}");
    assert!(err.is_not_found());
}
