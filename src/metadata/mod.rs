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

//! Table metadata model
//!
//! Immutable value types for schemas, partition specs, sort orders,
//! snapshots and the table metadata document, plus the pure operations that
//! derive a new metadata version from an old one.

mod builder;
pub mod literal;
pub mod partition;
pub mod schema;
pub mod snapshot;
pub mod table_metadata;
pub mod update;

pub use literal::Literal;
pub use partition::{
    NullOrder, PartitionField, PartitionSpec, SortDirection, SortField, SortOrder, Transform,
};
pub use schema::{ListType, MapType, NestedField, PrimitiveType, Schema, StructType, Type};
pub use snapshot::{
    MAIN_BRANCH, MetadataLogEntry, Operation, Snapshot, SnapshotLogEntry, SnapshotReference,
    SnapshotRetention, Summary,
};
pub use table_metadata::{DEFAULT_FORMAT_VERSION, Properties, TableMetadata};
pub use update::{TableRequirement, TableUpdate};
