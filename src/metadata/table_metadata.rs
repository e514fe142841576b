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

//! The table metadata document
//!
//! [`TableMetadata`] is immutable. Every change goes through one of the
//! `&self -> Result<TableMetadata>` operations below (or a batch of
//! [`TableUpdate`]s via [`TableMetadata::apply`]), which produce a new value
//! and leave the receiver untouched. Schemas, specs, sort orders and
//! snapshots are held behind `Arc`, so a new version shares all history
//! entries it did not change.

use super::builder::MetadataBuilder;
use super::partition::{PartitionSpec, SortOrder, UNPARTITIONED_LAST_ASSIGNED_ID};
use super::schema::Schema;
use super::snapshot::{
    MAIN_BRANCH, MetadataLogEntry, Snapshot, SnapshotLogEntry, SnapshotReference,
};
use super::update::TableUpdate;
use crate::error::{Error, ValidationErr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Table properties map
pub type Properties = HashMap<String, String>;

/// Format version written for new tables
pub const DEFAULT_FORMAT_VERSION: i32 = 2;

/// Highest format version this crate reads and writes
pub const SUPPORTED_FORMAT_VERSION: i32 = 2;

/// Complete Iceberg table metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableMetadataRepr")]
pub struct TableMetadata {
    /// Format version of the metadata file
    #[serde(rename = "format-version")]
    pub(crate) format_version: i32,
    /// Unique table identifier
    #[serde(rename = "table-uuid")]
    pub(crate) table_uuid: Uuid,
    /// Table location (base path)
    pub(crate) location: String,
    /// Highest sequence number assigned to a snapshot
    #[serde(rename = "last-sequence-number")]
    pub(crate) last_sequence_number: i64,
    /// Last updated timestamp (milliseconds since epoch)
    #[serde(rename = "last-updated-ms")]
    pub(crate) last_updated_ms: i64,
    /// Last column ID assigned
    #[serde(rename = "last-column-id")]
    pub(crate) last_column_id: i32,
    /// List of schemas
    pub(crate) schemas: Vec<Arc<Schema>>,
    /// Current schema ID
    #[serde(rename = "current-schema-id")]
    pub(crate) current_schema_id: i32,
    /// Partition specs
    #[serde(rename = "partition-specs")]
    pub(crate) partition_specs: Vec<Arc<PartitionSpec>>,
    /// Default partition spec ID
    #[serde(rename = "default-spec-id")]
    pub(crate) default_spec_id: i32,
    /// Last partition ID assigned
    #[serde(rename = "last-partition-id")]
    pub(crate) last_partition_id: i32,
    /// Table properties
    pub(crate) properties: Properties,
    /// Current snapshot ID; written as `null` when the table has no snapshot
    #[serde(rename = "current-snapshot-id")]
    pub(crate) current_snapshot_id: Option<i64>,
    /// List of snapshots
    pub(crate) snapshots: Vec<Arc<Snapshot>>,
    /// Snapshot log
    #[serde(rename = "snapshot-log")]
    pub(crate) snapshot_log: Vec<SnapshotLogEntry>,
    /// Metadata log
    #[serde(rename = "metadata-log")]
    pub(crate) metadata_log: Vec<MetadataLogEntry>,
    /// Sort orders
    #[serde(rename = "sort-orders")]
    pub(crate) sort_orders: Vec<Arc<SortOrder>>,
    /// Default sort order ID
    #[serde(rename = "default-sort-order-id")]
    pub(crate) default_sort_order_id: i32,
    /// Branches and tags
    pub(crate) refs: HashMap<String, SnapshotReference>,
}

impl TableMetadata {
    /// Metadata for a new table
    ///
    /// Unassigned schema field ids (0) are numbered from 1 and unassigned
    /// partition field ids from 1000. An empty sort order becomes the
    /// unsorted order 0.
    pub fn create(
        schema: Schema,
        spec: PartitionSpec,
        sort_order: SortOrder,
        location: impl Into<String>,
        properties: Properties,
        format_version: i32,
    ) -> Result<TableMetadata, ValidationErr> {
        if !(1..=SUPPORTED_FORMAT_VERSION).contains(&format_version) {
            return Err(ValidationErr::UnsupportedFormatVersion {
                version: format_version,
            });
        }
        let location = location.into().trim_end_matches('/').to_string();
        if location.is_empty() {
            return Err(ValidationErr::invalid("table location must not be empty"));
        }
        let empty = TableMetadata {
            format_version,
            table_uuid: Uuid::new_v4(),
            location,
            last_sequence_number: 0,
            last_updated_ms: now_ms(),
            last_column_id: 0,
            schemas: Vec::new(),
            current_schema_id: -1,
            partition_specs: Vec::new(),
            default_spec_id: -1,
            last_partition_id: UNPARTITIONED_LAST_ASSIGNED_ID,
            properties: HashMap::new(),
            current_snapshot_id: None,
            snapshots: Vec::new(),
            snapshot_log: Vec::new(),
            metadata_log: Vec::new(),
            sort_orders: Vec::new(),
            default_sort_order_id: -1,
            refs: HashMap::new(),
        };

        let mut builder = MetadataBuilder::new(&empty);
        builder
            .add_schema(schema, None)?
            .set_current_schema(MetadataBuilder::LAST_ADDED)?
            .add_partition_spec(spec)?
            .set_default_spec(MetadataBuilder::LAST_ADDED)?
            .add_sort_order(sort_order)?
            .set_default_sort_order(MetadataBuilder::LAST_ADDED)?
            .set_properties(properties)?;
        Ok(builder.build())
    }

    /// Parses a metadata document
    pub fn from_json(bytes: &[u8]) -> Result<TableMetadata, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the metadata document
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    pub fn uuid(&self) -> Uuid {
        self.table_uuid
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn last_sequence_number(&self) -> i64 {
        self.last_sequence_number
    }

    /// Sequence number the next snapshot must carry
    pub fn next_sequence_number(&self) -> i64 {
        self.last_sequence_number + 1
    }

    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    pub fn last_column_id(&self) -> i32 {
        self.last_column_id
    }

    pub fn last_partition_id(&self) -> i32 {
        self.last_partition_id
    }

    pub fn schemas(&self) -> impl ExactSizeIterator<Item = &Arc<Schema>> {
        self.schemas.iter()
    }

    pub fn schema_by_id(&self, schema_id: i32) -> Option<&Arc<Schema>> {
        self.schemas.iter().find(|s| s.schema_id == schema_id)
    }

    pub fn current_schema_id(&self) -> i32 {
        self.current_schema_id
    }

    pub fn current_schema(&self) -> &Arc<Schema> {
        // Construction and deserialization both check that the current id resolves
        self.schema_by_id(self.current_schema_id)
            .unwrap_or(&self.schemas[0])
    }

    pub fn partition_specs(&self) -> impl ExactSizeIterator<Item = &Arc<PartitionSpec>> {
        self.partition_specs.iter()
    }

    pub fn partition_spec_by_id(&self, spec_id: i32) -> Option<&Arc<PartitionSpec>> {
        self.partition_specs.iter().find(|s| s.spec_id == spec_id)
    }

    pub fn default_spec_id(&self) -> i32 {
        self.default_spec_id
    }

    pub fn default_partition_spec(&self) -> &Arc<PartitionSpec> {
        self.partition_spec_by_id(self.default_spec_id)
            .unwrap_or(&self.partition_specs[0])
    }

    pub fn sort_orders(&self) -> impl ExactSizeIterator<Item = &Arc<SortOrder>> {
        self.sort_orders.iter()
    }

    pub fn sort_order_by_id(&self, order_id: i32) -> Option<&Arc<SortOrder>> {
        self.sort_orders.iter().find(|s| s.order_id == order_id)
    }

    pub fn default_sort_order_id(&self) -> i32 {
        self.default_sort_order_id
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.current_snapshot_id
    }

    pub fn current_snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.current_snapshot_id
            .and_then(|id| self.snapshot_by_id(id))
    }

    pub fn snapshots(&self) -> impl ExactSizeIterator<Item = &Arc<Snapshot>> {
        self.snapshots.iter()
    }

    pub fn snapshot_by_id(&self, snapshot_id: i64) -> Option<&Arc<Snapshot>> {
        self.snapshots.iter().find(|s| s.snapshot_id == snapshot_id)
    }

    pub fn snapshot_for_ref(&self, name: &str) -> Option<&Arc<Snapshot>> {
        self.refs
            .get(name)
            .and_then(|r| self.snapshot_by_id(r.snapshot_id))
    }

    pub fn refs(&self) -> &HashMap<String, SnapshotReference> {
        &self.refs
    }

    pub fn snapshot_log(&self) -> &[SnapshotLogEntry] {
        &self.snapshot_log
    }

    pub fn metadata_log(&self) -> &[MetadataLogEntry] {
        &self.metadata_log
    }

    // ------------------------------------------------------------------
    // Pure update operations
    // ------------------------------------------------------------------

    /// Adds a schema to the history without making it current
    pub fn add_schema(&self, schema: Schema) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.add_schema(schema, None)?;
        Ok(b.build())
    }

    pub fn set_current_schema(&self, schema_id: i32) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.set_current_schema(schema_id)?;
        Ok(b.build())
    }

    /// Adds a partition spec to the history without making it the default
    pub fn add_partition_spec(&self, spec: PartitionSpec) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.add_partition_spec(spec)?;
        Ok(b.build())
    }

    pub fn set_default_spec(&self, spec_id: i32) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.set_default_spec(spec_id)?;
        Ok(b.build())
    }

    pub fn add_sort_order(&self, order: SortOrder) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.add_sort_order(order)?;
        Ok(b.build())
    }

    /// Appends a snapshot without moving any branch
    pub fn add_snapshot(&self, snapshot: Snapshot) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.add_snapshot(snapshot)?;
        Ok(b.build())
    }

    /// Points the main branch at `snapshot_id`
    pub fn set_current_snapshot(&self, snapshot_id: i64) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        b.set_snapshot_ref(MAIN_BRANCH, SnapshotReference::branch(snapshot_id))?;
        Ok(b.build())
    }

    /// Removes every snapshot matching `predicate`
    ///
    /// The current snapshot can never be removed.
    pub fn remove_snapshots(
        &self,
        predicate: impl Fn(&Snapshot) -> bool,
    ) -> Result<TableMetadata, ValidationErr> {
        let ids: Vec<i64> = self
            .snapshots
            .iter()
            .filter(|s| predicate(s))
            .map(|s| s.snapshot_id)
            .collect();
        let mut b = MetadataBuilder::new(self);
        b.remove_snapshots(&ids)?;
        Ok(b.build())
    }

    /// Applies a batch of updates in order
    ///
    /// Either every update applies or the call fails and nothing changes.
    pub fn apply(&self, updates: &[TableUpdate]) -> Result<TableMetadata, ValidationErr> {
        let mut b = MetadataBuilder::new(self);
        for update in updates {
            b.apply(update.clone())?;
        }
        Ok(b.build())
    }

    /// Records `previous` in the metadata log, keeping at most `max_entries`
    pub(crate) fn with_previous_metadata(
        mut self,
        previous: MetadataLogEntry,
        max_entries: usize,
    ) -> TableMetadata {
        self.metadata_log.push(previous);
        if self.metadata_log.len() > max_entries {
            let excess = self.metadata_log.len() - max_entries;
            self.metadata_log.drain(..excess);
        }
        self
    }

    /// Checks that every current id resolves into its history list
    pub fn validate(&self) -> Result<(), ValidationErr> {
        if !(1..=SUPPORTED_FORMAT_VERSION).contains(&self.format_version) {
            return Err(ValidationErr::UnsupportedFormatVersion {
                version: self.format_version,
            });
        }
        if self.schema_by_id(self.current_schema_id).is_none() {
            return Err(ValidationErr::SchemaNotFound {
                schema_id: self.current_schema_id,
            });
        }
        if self.partition_spec_by_id(self.default_spec_id).is_none() {
            return Err(ValidationErr::PartitionSpecNotFound {
                spec_id: self.default_spec_id,
            });
        }
        if self.sort_order_by_id(self.default_sort_order_id).is_none() {
            return Err(ValidationErr::SortOrderNotFound {
                order_id: self.default_sort_order_id,
            });
        }
        if let Some(id) = self.current_snapshot_id
            && self.snapshot_by_id(id).is_none()
        {
            return Err(ValidationErr::SnapshotNotFound { snapshot_id: id });
        }
        for (name, r) in &self.refs {
            if self.snapshot_by_id(r.snapshot_id).is_none() {
                return Err(ValidationErr::requirement(format!(
                    "reference {name} points at missing snapshot {}",
                    r.snapshot_id
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// On-disk shape, including the fields older writers use
#[derive(Deserialize)]
struct TableMetadataRepr {
    #[serde(rename = "format-version")]
    format_version: i32,
    #[serde(rename = "table-uuid")]
    table_uuid: Uuid,
    location: String,
    #[serde(rename = "last-sequence-number", default)]
    last_sequence_number: i64,
    #[serde(rename = "last-updated-ms")]
    last_updated_ms: i64,
    #[serde(rename = "last-column-id")]
    last_column_id: i32,
    #[serde(default)]
    schemas: Vec<Schema>,
    #[serde(rename = "current-schema-id")]
    current_schema_id: Option<i32>,
    /// Format 1 single schema
    schema: Option<Schema>,
    #[serde(rename = "partition-specs", default)]
    partition_specs: Vec<PartitionSpec>,
    #[serde(rename = "default-spec-id")]
    default_spec_id: Option<i32>,
    #[serde(rename = "last-partition-id")]
    last_partition_id: Option<i32>,
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(rename = "current-snapshot-id", default)]
    current_snapshot_id: Option<i64>,
    #[serde(default)]
    snapshots: Option<Vec<Snapshot>>,
    #[serde(rename = "snapshot-log", default)]
    snapshot_log: Option<Vec<SnapshotLogEntry>>,
    #[serde(rename = "metadata-log", default)]
    metadata_log: Option<Vec<MetadataLogEntry>>,
    #[serde(rename = "sort-orders", default)]
    sort_orders: Vec<SortOrder>,
    #[serde(rename = "default-sort-order-id")]
    default_sort_order_id: Option<i32>,
    #[serde(default)]
    refs: Option<HashMap<String, SnapshotReference>>,
}

impl TryFrom<TableMetadataRepr> for TableMetadata {
    type Error = ValidationErr;

    fn try_from(r: TableMetadataRepr) -> Result<Self, Self::Error> {
        let mut schemas = r.schemas;
        if schemas.is_empty() {
            schemas.extend(r.schema);
        }
        if schemas.is_empty() {
            return Err(ValidationErr::invalid("metadata has no schemas"));
        }
        let current_schema_id = r.current_schema_id.unwrap_or(schemas[0].schema_id);

        let mut partition_specs = r.partition_specs;
        if partition_specs.is_empty() {
            partition_specs.push(PartitionSpec::unpartitioned());
        }
        let default_spec_id = r.default_spec_id.unwrap_or(partition_specs[0].spec_id);
        let last_partition_id = r.last_partition_id.unwrap_or_else(|| {
            partition_specs
                .iter()
                .filter_map(|s| s.highest_field_id())
                .max()
                .unwrap_or(UNPARTITIONED_LAST_ASSIGNED_ID)
        });

        let mut sort_orders = r.sort_orders;
        if sort_orders.is_empty() {
            sort_orders.push(SortOrder::unsorted());
        }
        let default_sort_order_id = r
            .default_sort_order_id
            .unwrap_or(SortOrder::UNSORTED_ORDER_ID);

        // -1 is the legacy marker for "no current snapshot"
        let current_snapshot_id = r.current_snapshot_id.filter(|id| *id != -1);
        let mut refs = r.refs.unwrap_or_default();
        if let Some(id) = current_snapshot_id {
            refs.entry(MAIN_BRANCH.to_string())
                .or_insert_with(|| SnapshotReference::branch(id));
        }

        let metadata = TableMetadata {
            format_version: r.format_version,
            table_uuid: r.table_uuid,
            location: r.location,
            last_sequence_number: r.last_sequence_number,
            last_updated_ms: r.last_updated_ms,
            last_column_id: r.last_column_id,
            schemas: schemas.into_iter().map(Arc::new).collect(),
            current_schema_id,
            partition_specs: partition_specs.into_iter().map(Arc::new).collect(),
            default_spec_id,
            last_partition_id,
            properties: r.properties.unwrap_or_default(),
            current_snapshot_id,
            snapshots: r
                .snapshots
                .unwrap_or_default()
                .into_iter()
                .map(Arc::new)
                .collect(),
            snapshot_log: r.snapshot_log.unwrap_or_default(),
            metadata_log: r.metadata_log.unwrap_or_default(),
            sort_orders: sort_orders.into_iter().map(Arc::new).collect(),
            default_sort_order_id,
            refs,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::partition::{PartitionField, Transform};
    use crate::metadata::schema::{NestedField, PrimitiveType};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            0,
            vec![
                NestedField::required(0, "id", PrimitiveType::Long),
                NestedField::optional(0, "category", PrimitiveType::String),
            ],
        )
    }

    fn spec() -> PartitionSpec {
        PartitionSpec::new(0, vec![PartitionField::new(2, 0, "category", Transform::Identity)])
    }

    #[test]
    fn test_create_assigns_ids() {
        let m = TableMetadata::create(
            schema(),
            spec(),
            SortOrder::unsorted(),
            "memory://wh/db/t/",
            HashMap::from([("owner".to_string(), "etl".to_string())]),
            2,
        )
        .unwrap();

        assert_eq!(m.format_version(), 2);
        assert_eq!(m.location(), "memory://wh/db/t");
        assert_eq!(m.last_column_id(), 2);
        assert_eq!(m.current_schema().fields[1].id, 2);
        assert_eq!(m.last_partition_id(), 1000);
        assert_eq!(m.default_partition_spec().fields[0].field_id, 1000);
        assert_eq!(m.default_sort_order_id(), 0);
        assert_eq!(m.last_sequence_number(), 0);
        assert_eq!(m.current_snapshot_id(), None);
        assert_eq!(m.property("owner"), Some("etl"));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_create_rejects_bad_input() {
        assert_eq!(
            TableMetadata::create(schema(), spec(), SortOrder::unsorted(), "x", HashMap::new(), 3),
            Err(ValidationErr::UnsupportedFormatVersion { version: 3 })
        );
        let bad_spec =
            PartitionSpec::new(0, vec![PartitionField::new(42, 0, "nope", Transform::Identity)]);
        assert_eq!(
            TableMetadata::create(schema(), bad_spec, SortOrder::unsorted(), "x", HashMap::new(), 2),
            Err(ValidationErr::SourceFieldNotFound { source_id: 42 })
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let m = TableMetadata::create(
            schema(),
            spec(),
            SortOrder::unsorted(),
            "memory://wh/t",
            HashMap::new(),
            2,
        )
        .unwrap();
        let bytes = m.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["current-snapshot-id"], serde_json::Value::Null);
        assert_eq!(value["format-version"], 2);
        assert_eq!(TableMetadata::from_json(&bytes).unwrap(), m);
    }

    #[test]
    fn test_parse_legacy_document() {
        let doc = json!({
            "format-version": 1,
            "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
            "location": "s3://bucket/test/location",
            "last-updated-ms": 1602638573874i64,
            "last-column-id": 3,
            "schema": {
                "type": "struct",
                "fields": [
                    {"id": 1, "name": "x", "required": true, "type": "long"},
                    {"id": 2, "name": "y", "required": true, "type": "long"},
                    {"id": 3, "name": "z", "required": true, "type": "long"}
                ]
            },
            "partition-specs": [{"spec-id": 0, "fields": [
                {"name": "x", "transform": "identity", "source-id": 1, "field-id": 1000}
            ]}],
            "properties": {},
            "current-snapshot-id": -1,
            "snapshots": []
        });
        let m: TableMetadata = serde_json::from_value(doc).unwrap();
        assert_eq!(m.format_version(), 1);
        assert_eq!(m.current_schema_id(), 0);
        assert_eq!(m.current_snapshot_id(), None);
        assert_eq!(m.last_partition_id(), 1000);
        assert_eq!(m.default_sort_order_id(), 0);
        assert_eq!(m.last_sequence_number(), 0);
    }

    #[test]
    fn test_parse_rejects_dangling_current_ids() {
        let doc = json!({
            "format-version": 2,
            "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
            "location": "s3://bucket/t",
            "last-sequence-number": 0,
            "last-updated-ms": 1,
            "last-column-id": 1,
            "current-schema-id": 5,
            "schemas": [{"type": "struct", "schema-id": 0, "fields": [
                {"id": 1, "name": "x", "required": true, "type": "long"}
            ]}],
            "current-snapshot-id": null
        });
        assert!(serde_json::from_value::<TableMetadata>(doc).is_err());
    }

    #[test]
    fn test_metadata_log_trimming() {
        let mut m = TableMetadata::create(
            schema(),
            PartitionSpec::unpartitioned(),
            SortOrder::unsorted(),
            "memory://t",
            HashMap::new(),
            2,
        )
        .unwrap();
        for i in 0..5 {
            m = m.with_previous_metadata(
                MetadataLogEntry {
                    timestamp_ms: i,
                    metadata_file: format!("v{i}"),
                },
                3,
            );
        }
        let files: Vec<&str> = m.metadata_log().iter().map(|e| e.metadata_file.as_str()).collect();
        assert_eq!(files, vec!["v2", "v3", "v4"]);
    }
}
