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

//! In-memory manifest-list and manifest records

use crate::error::CodecError;
use crate::metadata::Literal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use typed_builder::TypedBuilder;

/// Placeholder sequence number replaced when the snapshot is committed
pub const UNASSIGNED_SEQUENCE_NUMBER: i64 = -1;

/// Sequence number of everything written before format version 2
pub const INITIAL_SEQUENCE_NUMBER: i64 = 0;

/// Files tracked by a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManifestContent {
    #[default]
    Data,
    Deletes,
}

impl ManifestContent {
    pub fn id(&self) -> i32 {
        match self {
            ManifestContent::Data => 0,
            ManifestContent::Deletes => 1,
        }
    }
}

impl TryFrom<i32> for ManifestContent {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ManifestContent::Data),
            1 => Ok(ManifestContent::Deletes),
            other => Err(CodecError::invalid_value(
                "content",
                format!("unknown manifest content {other}"),
            )),
        }
    }
}

impl fmt::Display for ManifestContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestContent::Data => write!(f, "data"),
            ManifestContent::Deletes => write!(f, "deletes"),
        }
    }
}

impl FromStr for ManifestContent {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(ManifestContent::Data),
            "deletes" => Ok(ManifestContent::Deletes),
            other => Err(CodecError::invalid_value(
                "content",
                format!("unknown manifest content {other}"),
            )),
        }
    }
}

/// Status of a manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManifestStatus {
    /// Carried over from an earlier snapshot
    Existing,
    /// Added by the snapshot that wrote the manifest
    #[default]
    Added,
    /// Removed by the snapshot that wrote the manifest
    Deleted,
}

impl ManifestStatus {
    pub fn id(&self) -> i32 {
        match self {
            ManifestStatus::Existing => 0,
            ManifestStatus::Added => 1,
            ManifestStatus::Deleted => 2,
        }
    }
}

impl TryFrom<i32> for ManifestStatus {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ManifestStatus::Existing),
            1 => Ok(ManifestStatus::Added),
            2 => Ok(ManifestStatus::Deleted),
            other => Err(CodecError::invalid_value(
                "status",
                format!("unknown entry status {other}"),
            )),
        }
    }
}

/// Content of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataContentType {
    #[default]
    Data,
    PositionDeletes,
    EqualityDeletes,
}

impl DataContentType {
    pub fn id(&self) -> i32 {
        match self {
            DataContentType::Data => 0,
            DataContentType::PositionDeletes => 1,
            DataContentType::EqualityDeletes => 2,
        }
    }
}

impl TryFrom<i32> for DataContentType {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataContentType::Data),
            1 => Ok(DataContentType::PositionDeletes),
            2 => Ok(DataContentType::EqualityDeletes),
            other => Err(CodecError::invalid_value(
                "content",
                format!("unknown data file content {other}"),
            )),
        }
    }
}

/// On-disk format of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFileFormat {
    Avro,
    Orc,
    #[default]
    Parquet,
}

impl fmt::Display for DataFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFileFormat::Avro => write!(f, "AVRO"),
            DataFileFormat::Orc => write!(f, "ORC"),
            DataFileFormat::Parquet => write!(f, "PARQUET"),
        }
    }
}

impl FromStr for DataFileFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avro" => Ok(DataFileFormat::Avro),
            "orc" => Ok(DataFileFormat::Orc),
            "parquet" => Ok(DataFileFormat::Parquet),
            _ => Err(CodecError::invalid_value(
                "file_format",
                format!("unknown file format {s}"),
            )),
        }
    }
}

/// Partition tuple of a data file, one slot per partition field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionData {
    values: Vec<Option<Literal>>,
}

impl PartitionData {
    pub fn new(values: Vec<Option<Literal>>) -> Self {
        PartitionData { values }
    }

    /// Tuple of an unpartitioned table
    pub fn empty() -> Self {
        PartitionData::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Literal> {
        self.values.get(pos).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Literal>> {
        self.values.iter().map(Option::as_ref)
    }

    pub(crate) fn reset(&mut self, len: usize) {
        self.values.clear();
        self.values.resize(len, None);
    }

    pub(crate) fn set(&mut self, pos: usize, value: Option<Literal>) {
        if let Some(slot) = self.values.get_mut(pos) {
            *slot = value;
        }
    }
}

/// Pruning summary of one partition field across a manifest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSummary {
    /// field: 509
    pub contains_null: bool,
    /// field: 518
    pub contains_nan: Option<bool>,
    /// field: 510, single-value serialized
    pub lower_bound: Option<Vec<u8>>,
    /// field: 511, single-value serialized
    pub upper_bound: Option<Vec<u8>>,
}

/// Entry in a manifest list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestFile {
    /// field: 500
    pub manifest_path: String,
    /// field: 501
    pub manifest_length: i64,
    /// field: 502
    pub partition_spec_id: i32,
    /// field: 517; data for every v1 manifest
    pub content: ManifestContent,
    /// field: 515; 0 when read from a v1 list
    pub sequence_number: i64,
    /// field: 516; 0 when read from a v1 list
    pub min_sequence_number: i64,
    /// field: 503
    pub added_snapshot_id: i64,
    /// field: 504
    pub added_files_count: Option<i32>,
    /// field: 505
    pub existing_files_count: Option<i32>,
    /// field: 506
    pub deleted_files_count: Option<i32>,
    /// field: 512
    pub added_rows_count: Option<i64>,
    /// field: 513
    pub existing_rows_count: Option<i64>,
    /// field: 514
    pub deleted_rows_count: Option<i64>,
    /// field: 507, one summary per field of the manifest's partition spec
    pub partitions: Vec<FieldSummary>,
    /// field: 519
    pub key_metadata: Option<Vec<u8>>,
}

impl ManifestFile {
    /// A missing count counts as "maybe"
    pub fn has_added_files(&self) -> bool {
        self.added_files_count.is_none_or(|c| c > 0)
    }

    pub fn has_existing_files(&self) -> bool {
        self.existing_files_count.is_none_or(|c| c > 0)
    }

    pub fn has_deleted_files(&self) -> bool {
        self.deleted_files_count.is_none_or(|c| c > 0)
    }

    /// Live (added or existing) files in the manifest, when known
    pub fn live_files_count(&self) -> Option<i32> {
        Some(self.added_files_count? + self.existing_files_count?)
    }
}

/// A data or delete file tracked by a manifest
#[derive(Debug, Clone, PartialEq, Default, TypedBuilder)]
pub struct DataFile {
    /// field: 134
    #[builder(default)]
    pub content: DataContentType,
    /// field: 100
    #[builder(setter(into))]
    pub file_path: String,
    /// field: 101
    #[builder(default)]
    pub file_format: DataFileFormat,
    /// field: 102
    #[builder(default)]
    pub partition: PartitionData,
    /// field: 103
    pub record_count: i64,
    /// field: 104
    pub file_size_in_bytes: i64,
    /// field: 108
    #[builder(default)]
    pub column_sizes: HashMap<i32, i64>,
    /// field: 109
    #[builder(default)]
    pub value_counts: HashMap<i32, i64>,
    /// field: 110
    #[builder(default)]
    pub null_value_counts: HashMap<i32, i64>,
    /// field: 137
    #[builder(default)]
    pub nan_value_counts: HashMap<i32, i64>,
    /// field: 125, single-value serialized
    #[builder(default)]
    pub lower_bounds: HashMap<i32, Vec<u8>>,
    /// field: 128, single-value serialized
    #[builder(default)]
    pub upper_bounds: HashMap<i32, Vec<u8>>,
    /// field: 131
    #[builder(default, setter(strip_option))]
    pub key_metadata: Option<Vec<u8>>,
    /// field: 132
    #[builder(default)]
    pub split_offsets: Vec<i64>,
    /// field: 135
    #[builder(default)]
    pub equality_ids: Vec<i32>,
    /// field: 140
    #[builder(default, setter(strip_option))]
    pub sort_order_id: Option<i32>,
}

impl DataFile {
    pub(crate) fn reset(&mut self, partition_len: usize) {
        self.content = DataContentType::Data;
        self.file_path.clear();
        self.file_format = DataFileFormat::default();
        self.partition.reset(partition_len);
        self.record_count = 0;
        self.file_size_in_bytes = 0;
        self.column_sizes.clear();
        self.value_counts.clear();
        self.null_value_counts.clear();
        self.nan_value_counts.clear();
        self.lower_bounds.clear();
        self.upper_bounds.clear();
        self.key_metadata = None;
        self.split_offsets.clear();
        self.equality_ids.clear();
        self.sort_order_id = None;
    }
}

/// A manifest row: a data file plus its tracking information
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestEntry {
    /// field: 0
    pub status: ManifestStatus,
    /// field: 1; inherited from the manifest-list entry when null
    pub snapshot_id: Option<i64>,
    /// field: 3; inherited for added entries when null
    pub sequence_number: Option<i64>,
    /// field: 4; inherited for added entries when null
    pub file_sequence_number: Option<i64>,
    /// field: 2
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// New entry for a file added by the snapshot being written
    pub fn added(data_file: DataFile) -> Self {
        ManifestEntry {
            status: ManifestStatus::Added,
            snapshot_id: None,
            sequence_number: None,
            file_sequence_number: None,
            data_file,
        }
    }

    /// Added or existing
    pub fn is_alive(&self) -> bool {
        matches!(self.status, ManifestStatus::Added | ManifestStatus::Existing)
    }

    pub fn file_path(&self) -> &str {
        &self.data_file.file_path
    }

    /// Fills null tracking fields from the manifest-list entry that referenced the manifest
    pub(crate) fn inherit_from(&mut self, manifest: &ManifestFile) {
        if self.snapshot_id.is_none() {
            self.snapshot_id = Some(manifest.added_snapshot_id);
        }
        let inherit = self.status == ManifestStatus::Added
            || manifest.sequence_number == INITIAL_SEQUENCE_NUMBER;
        if inherit && self.sequence_number.is_none() {
            self.sequence_number = Some(manifest.sequence_number);
        }
        if inherit && self.file_sequence_number.is_none() {
            self.file_sequence_number = Some(manifest.sequence_number);
        }
    }

    pub(crate) fn reset(&mut self, partition_len: usize) {
        self.status = ManifestStatus::Added;
        self.snapshot_id = None;
        self.sequence_number = None;
        self.file_sequence_number = None;
        self.data_file.reset(partition_len);
    }
}
