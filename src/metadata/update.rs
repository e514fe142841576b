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

//! Update intents and the requirements a commit asserts on its base

use super::partition::{PartitionSpec, SortOrder};
use super::schema::Schema;
use super::snapshot::{Snapshot, SnapshotReference};
use super::table_metadata::{Properties, TableMetadata};
use crate::error::ValidationErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table requirement for optimistic concurrency control
///
/// Requirements are checked against the base metadata before any update is
/// applied. `None` stands for a table that does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TableRequirement {
    /// The table must not exist
    AssertCreate,
    AssertTableUuid {
        uuid: Uuid,
    },
    /// Ref `ref` must point at `snapshot_id`; `None` means the ref must not exist
    AssertRefSnapshotId {
        #[serde(rename = "ref")]
        r#ref: String,
        #[serde(rename = "snapshot-id")]
        snapshot_id: Option<i64>,
    },
    AssertLastAssignedFieldId {
        #[serde(rename = "last-assigned-field-id")]
        last_assigned_field_id: i32,
    },
    AssertCurrentSchemaId {
        #[serde(rename = "current-schema-id")]
        current_schema_id: i32,
    },
    AssertLastAssignedPartitionId {
        #[serde(rename = "last-assigned-partition-id")]
        last_assigned_partition_id: i32,
    },
    AssertDefaultSpecId {
        #[serde(rename = "default-spec-id")]
        default_spec_id: i32,
    },
    AssertDefaultSortOrderId {
        #[serde(rename = "default-sort-order-id")]
        default_sort_order_id: i32,
    },
}

impl TableRequirement {
    pub fn check(&self, base: Option<&TableMetadata>) -> Result<(), ValidationErr> {
        let Some(m) = base else {
            return match self {
                TableRequirement::AssertCreate => Ok(()),
                other => Err(ValidationErr::requirement(format!(
                    "{other:?} failed: table does not exist"
                ))),
            };
        };

        match self {
            TableRequirement::AssertCreate => {
                Err(ValidationErr::requirement("table already exists"))
            }
            TableRequirement::AssertTableUuid { uuid } => expect("table uuid", uuid, &m.uuid()),
            TableRequirement::AssertRefSnapshotId { r#ref, snapshot_id } => {
                let actual = m.refs().get(r#ref).map(|r| r.snapshot_id);
                if actual == *snapshot_id {
                    Ok(())
                } else {
                    Err(ValidationErr::requirement(format!(
                        "ref {name} expected at {snapshot_id:?}, found {actual:?}",
                        name = r#ref
                    )))
                }
            }
            TableRequirement::AssertLastAssignedFieldId {
                last_assigned_field_id,
            } => expect(
                "last assigned field id",
                last_assigned_field_id,
                &m.last_column_id(),
            ),
            TableRequirement::AssertCurrentSchemaId { current_schema_id } => {
                expect("current schema id", current_schema_id, &m.current_schema_id())
            }
            TableRequirement::AssertLastAssignedPartitionId {
                last_assigned_partition_id,
            } => expect(
                "last assigned partition id",
                last_assigned_partition_id,
                &m.last_partition_id(),
            ),
            TableRequirement::AssertDefaultSpecId { default_spec_id } => {
                expect("default spec id", default_spec_id, &m.default_spec_id())
            }
            TableRequirement::AssertDefaultSortOrderId {
                default_sort_order_id,
            } => expect(
                "default sort order id",
                default_sort_order_id,
                &m.default_sort_order_id(),
            ),
        }
    }
}

fn expect<T: PartialEq + std::fmt::Display>(what: &str, expected: &T, actual: &T) -> Result<(), ValidationErr> {
    if expected == actual {
        Ok(())
    } else {
        Err(ValidationErr::requirement(format!(
            "{what} expected {expected}, found {actual}"
        )))
    }
}

/// Table update operation
///
/// Serialized in the Iceberg `action`-tagged form so that update batches can
/// be logged or shipped to a remote catalog unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TableUpdate {
    UpgradeFormatVersion {
        #[serde(rename = "format-version")]
        format_version: i32,
    },
    AddSchema {
        schema: Schema,
        #[serde(rename = "last-column-id", skip_serializing_if = "Option::is_none", default)]
        last_column_id: Option<i32>,
    },
    /// `-1` selects the schema added last in the same batch
    SetCurrentSchema {
        #[serde(rename = "schema-id")]
        schema_id: i32,
    },
    AddPartitionSpec {
        spec: PartitionSpec,
    },
    SetDefaultSpec {
        #[serde(rename = "spec-id")]
        spec_id: i32,
    },
    AddSortOrder {
        #[serde(rename = "sort-order")]
        sort_order: SortOrder,
    },
    SetDefaultSortOrder {
        #[serde(rename = "sort-order-id")]
        sort_order_id: i32,
    },
    AddSnapshot {
        snapshot: Snapshot,
    },
    SetSnapshotRef {
        #[serde(rename = "ref-name")]
        ref_name: String,
        #[serde(flatten)]
        reference: SnapshotReference,
    },
    RemoveSnapshots {
        #[serde(rename = "snapshot-ids")]
        snapshot_ids: Vec<i64>,
    },
    RemoveSnapshotRef {
        #[serde(rename = "ref-name")]
        ref_name: String,
    },
    SetLocation {
        location: String,
    },
    SetProperties {
        updates: Properties,
    },
    RemoveProperties {
        removals: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::partition::PartitionSpec;
    use crate::metadata::schema::{NestedField, PrimitiveType};
    use serde_json::json;
    use std::collections::HashMap;

    fn metadata() -> TableMetadata {
        TableMetadata::create(
            Schema::new(0, vec![NestedField::required(0, "id", PrimitiveType::Long)]),
            PartitionSpec::unpartitioned(),
            SortOrder::unsorted(),
            "memory://t",
            HashMap::new(),
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_update_json() {
        let update = TableUpdate::SetSnapshotRef {
            ref_name: "main".into(),
            reference: SnapshotReference::branch(5),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({"action": "set-snapshot-ref", "ref-name": "main", "snapshot-id": 5, "type": "branch"})
        );
        assert_eq!(serde_json::from_value::<TableUpdate>(value).unwrap(), update);

        let update: TableUpdate =
            serde_json::from_value(json!({"action": "set-current-schema", "schema-id": -1})).unwrap();
        assert_eq!(update, TableUpdate::SetCurrentSchema { schema_id: -1 });
    }

    #[test]
    fn test_requirements() {
        let m = metadata();
        assert!(TableRequirement::AssertCreate.check(None).is_ok());
        assert!(TableRequirement::AssertCreate.check(Some(&m)).is_err());
        assert!(TableRequirement::AssertTableUuid { uuid: m.uuid() }.check(Some(&m)).is_ok());
        assert!(TableRequirement::AssertTableUuid { uuid: Uuid::nil() }.check(Some(&m)).is_err());
        assert!(TableRequirement::AssertRefSnapshotId {
            r#ref: "main".into(),
            snapshot_id: None
        }
        .check(Some(&m))
        .is_ok());
        assert!(TableRequirement::AssertLastAssignedFieldId {
            last_assigned_field_id: 1
        }
        .check(Some(&m))
        .is_ok());
        assert!(TableRequirement::AssertCurrentSchemaId { current_schema_id: 3 }
            .check(Some(&m))
            .is_err());
        assert!(TableRequirement::AssertDefaultSpecId { default_spec_id: 0 }
            .check(None)
            .is_err());
    }

    #[test]
    fn test_requirement_json() {
        let r: TableRequirement = serde_json::from_value(json!({
            "type": "assert-ref-snapshot-id", "ref": "main", "snapshot-id": null
        }))
        .unwrap();
        assert_eq!(
            r,
            TableRequirement::AssertRefSnapshotId {
                r#ref: "main".into(),
                snapshot_id: None
            }
        );
    }
}
