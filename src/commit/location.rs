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

//! File naming for metadata, manifest-list and manifest files
//!
//! Every name embeds a fresh UUID, so a location is never handed out twice
//! even when two writers race on the same metadata version.

use crate::catalog::{MetadataLocation, TableIdent};
use crate::error::{Error, ValidationErr};
use crate::metadata::TableMetadata;
use uuid::Uuid;

/// Table property overriding the metadata directory
pub const WRITE_METADATA_PATH: &str = "write.metadata.path";

/// Directory holding metadata, manifest-list and manifest files
pub fn metadata_dir(metadata: &TableMetadata) -> String {
    match metadata.property(WRITE_METADATA_PATH) {
        Some(path) => path.trim_end_matches('/').to_string(),
        None => format!("{}/metadata", metadata.location()),
    }
}

/// `<dir>/<version:05>-<uuid>.metadata.json`
pub fn metadata_file_location(metadata: &TableMetadata, version: u32) -> Result<MetadataLocation, Error> {
    Ok(MetadataLocation::new(format!(
        "{}/{version:05}-{}.metadata.json",
        metadata_dir(metadata),
        Uuid::new_v4()
    ))?)
}

/// Version number encoded in a metadata file name, if it follows the naming scheme
pub fn parse_metadata_version(location: &str) -> Option<u32> {
    let file_name = location.rsplit('/').next()?;
    let (version, rest) = file_name.split_once('-')?;
    if !rest.ends_with(".metadata.json") || version.is_empty() {
        return None;
    }
    version.parse().ok()
}

/// Location of the metadata file that follows `base`
///
/// Files not following the naming scheme count as version 0. A base at
/// the largest version has no successor.
pub fn next_metadata_location(metadata: &TableMetadata, base: &MetadataLocation) -> Result<MetadataLocation, Error> {
    let version = match parse_metadata_version(base.as_str()) {
        None => 1,
        Some(v) => v.checked_add(1).ok_or_else(|| {
            ValidationErr::invalid(format!("metadata version of {base} cannot be incremented"))
        })?,
    };
    metadata_file_location(metadata, version)
}

/// `<dir>/<commit-uuid>-m<n>.avro`
pub fn manifest_location(metadata: &TableMetadata, commit_uuid: Uuid, n: u32) -> String {
    format!("{}/{commit_uuid}-m{n}.avro", metadata_dir(metadata))
}

/// `<dir>/snap-<snapshot-id>-<attempt>-<commit-uuid>.avro`
pub fn manifest_list_location(metadata: &TableMetadata, snapshot_id: i64, attempt: u32, commit_uuid: Uuid) -> String {
    format!(
        "{}/snap-{snapshot_id}-{attempt}-{commit_uuid}.avro",
        metadata_dir(metadata)
    )
}

/// Default location of a new table under `warehouse`
pub fn default_table_location(warehouse: &str, ident: &TableIdent) -> String {
    let mut location = warehouse.trim_end_matches('/').to_string();
    for level in ident.namespace().levels() {
        location.push('/');
        location.push_str(level);
    }
    location.push('/');
    location.push_str(ident.name().as_str());
    location
}

/// Random positive snapshot id not used by `metadata`
pub fn new_snapshot_id(metadata: &TableMetadata) -> i64 {
    loop {
        let bits = Uuid::new_v4().as_u128();
        let id = (((bits >> 64) as u64 ^ bits as u64) & i64::MAX as u64) as i64;
        if id != 0 && metadata.snapshot_by_id(id).is_none() {
            return id;
        }
    }
}
