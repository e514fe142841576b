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

//! Snapshots, snapshot references and history logs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the branch that tracks the table's current snapshot
pub const MAIN_BRANCH: &str = "main";

/// Kind of change a snapshot made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Only data files were added
    #[default]
    Append,
    /// Files were replaced without changing the table's data
    Replace,
    /// Data files were added and removed
    Overwrite,
    /// Only data files were removed
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Append => "append",
            Operation::Replace => "replace",
            Operation::Overwrite => "overwrite",
            Operation::Delete => "delete",
        }
    }
}

/// Snapshot summary: the operation plus free-form counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub operation: Operation,
    #[serde(flatten)]
    pub properties: HashMap<String, String>,
}

impl Summary {
    pub fn new(operation: Operation) -> Self {
        Summary {
            operation,
            properties: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Reads a numeric counter, treating a missing key as 0
    pub fn counter(&self, key: &str) -> i64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

/// Snapshot of table state at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot ID
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    /// Parent snapshot ID (if any)
    #[serde(rename = "parent-snapshot-id", skip_serializing_if = "Option::is_none", default)]
    pub parent_snapshot_id: Option<i64>,
    /// Position of this snapshot in the table's commit order
    #[serde(rename = "sequence-number", default)]
    pub sequence_number: i64,
    /// Timestamp when snapshot was created (milliseconds since epoch)
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
    /// Manifest list location
    #[serde(rename = "manifest-list")]
    pub manifest_list: String,
    /// Snapshot summary information
    #[serde(default)]
    pub summary: Summary,
    /// Schema ID used for this snapshot
    #[serde(rename = "schema-id", skip_serializing_if = "Option::is_none", default)]
    pub schema_id: Option<i32>,
}

/// Retention settings of a branch or tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotRetention {
    Branch {
        #[serde(rename = "min-snapshots-to-keep", skip_serializing_if = "Option::is_none", default)]
        min_snapshots_to_keep: Option<i32>,
        #[serde(rename = "max-snapshot-age-ms", skip_serializing_if = "Option::is_none", default)]
        max_snapshot_age_ms: Option<i64>,
        #[serde(rename = "max-ref-age-ms", skip_serializing_if = "Option::is_none", default)]
        max_ref_age_ms: Option<i64>,
    },
    Tag {
        #[serde(rename = "max-ref-age-ms", skip_serializing_if = "Option::is_none", default)]
        max_ref_age_ms: Option<i64>,
    },
}

/// Named pointer to a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReference {
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    #[serde(flatten)]
    pub retention: SnapshotRetention,
}

impl SnapshotReference {
    /// Branch reference without retention overrides
    pub fn branch(snapshot_id: i64) -> Self {
        SnapshotReference {
            snapshot_id,
            retention: SnapshotRetention::Branch {
                min_snapshots_to_keep: None,
                max_snapshot_age_ms: None,
                max_ref_age_ms: None,
            },
        }
    }

    pub fn tag(snapshot_id: i64) -> Self {
        SnapshotReference {
            snapshot_id,
            retention: SnapshotRetention::Tag {
                max_ref_age_ms: None,
            },
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.retention, SnapshotRetention::Branch { .. })
    }
}

/// Snapshot log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLogEntry {
    /// Timestamp of the log entry (milliseconds since epoch)
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
    /// Snapshot ID
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
}

/// Metadata log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataLogEntry {
    /// Timestamp of the log entry (milliseconds since epoch)
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
    /// Metadata file location
    #[serde(rename = "metadata-file")]
    pub metadata_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_json() {
        let value = json!({
            "snapshot-id": 3051729675574597004i64,
            "sequence-number": 1,
            "timestamp-ms": 1515100955770i64,
            "summary": {"operation": "append", "added-data-files": "2"},
            "manifest-list": "s3://b/wh/t/metadata/snap-3051729675574597004-1-c87bfec7.avro",
            "schema-id": 0
        });
        let snapshot: Snapshot = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(snapshot.parent_snapshot_id, None);
        assert_eq!(snapshot.summary.operation, Operation::Append);
        assert_eq!(snapshot.summary.counter("added-data-files"), 2);
        assert_eq!(snapshot.summary.counter("missing"), 0);
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), value);
    }

    #[test]
    fn test_reference_json() {
        let branch = SnapshotReference::branch(7);
        assert_eq!(
            serde_json::to_value(&branch).unwrap(),
            json!({"snapshot-id": 7, "type": "branch"})
        );
        let tag: SnapshotReference =
            serde_json::from_value(json!({"snapshot-id": 9, "type": "tag", "max-ref-age-ms": 10})).unwrap();
        assert!(!tag.is_branch());
        assert_eq!(
            tag.retention,
            SnapshotRetention::Tag {
                max_ref_age_ms: Some(10)
            }
        );
    }
}
