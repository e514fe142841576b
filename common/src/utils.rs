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

use floe::catalog::{Namespace, TableIdent, TableName};
use floe::manifest::{DataFile, PartitionData};
use floe::metadata::{Literal, NestedField, PrimitiveType, Schema};
use rand::Rng;

pub fn rand_namespace() -> Namespace {
    Namespace::try_from(format!("ns_{}", uuid::Uuid::new_v4().simple()).as_str()).unwrap()
}

pub fn rand_table_name() -> String {
    format!("table_{}", uuid::Uuid::new_v4().simple())
}

pub fn rand_ident() -> TableIdent {
    ident_in(&rand_namespace(), &rand_table_name())
}

pub fn ident_in(namespace: &Namespace, name: &str) -> TableIdent {
    TableIdent::new(namespace.clone(), TableName::new(name).unwrap())
}

/// Schema with id and data fields
pub fn test_schema() -> Schema {
    Schema::new(
        0,
        vec![
            NestedField::required(1, "id", PrimitiveType::Long),
            NestedField::optional(2, "data", PrimitiveType::String),
        ],
    )
}

/// Unpartitioned data file with a random size under `warehouse`
pub fn rand_data_file(warehouse: &str, record_count: i64) -> DataFile {
    let mut rng = rand::rng();
    DataFile::builder()
        .file_path(format!("{warehouse}/data/{}.parquet", uuid::Uuid::new_v4()))
        .partition(PartitionData::empty())
        .record_count(record_count)
        .file_size_in_bytes(rng.random_range(1024..1 << 20))
        .build()
}

/// Data file carrying a single string partition value
pub fn partitioned_data_file(warehouse: &str, value: &str, record_count: i64) -> DataFile {
    DataFile::builder()
        .file_path(format!("{warehouse}/data/{value}/{}.parquet", uuid::Uuid::new_v4()))
        .partition(PartitionData::new(vec![Some(Literal::String(value.to_string()))]))
        .record_count(record_count)
        .file_size_in_bytes(4096)
        .build()
}
