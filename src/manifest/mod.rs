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

//! Manifest lists and manifests
//!
//! A snapshot's manifest list names its manifests; each manifest names data
//! or delete files. Both are Avro object container files whose records are
//! resolved by Iceberg field id, so files written under format version 1
//! decode into the same types as version 2 files.

mod entries;
mod list;
pub mod schema;
mod summary;
mod types;

pub use entries::{
    ManifestMetadata, ManifestReader, ManifestWriter, decode_manifest, encode_manifest,
    read_manifest_for_table,
};
pub use list::{ManifestListReader, ManifestListWriter, decode_manifest_list, encode_manifest_list};
pub use summary::PartitionSummaryBuilder;
pub use types::{
    DataContentType, DataFile, DataFileFormat, FieldSummary, INITIAL_SEQUENCE_NUMBER,
    ManifestContent, ManifestEntry, ManifestFile, ManifestStatus, PartitionData,
    UNASSIGNED_SEQUENCE_NUMBER,
};
