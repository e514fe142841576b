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

//! Builder behind the metadata update operations
//!
//! The builder works on a private copy of the base metadata. Each step
//! validates first and mutates only once every check passed, so a failed step
//! leaves the copy as it was; callers drop the builder on error and the base
//! value is never touched. Id high-water marks (`last-column-id`,
//! `last-partition-id`, `last-sequence-number`) are read from that copy, never
//! from process state.

use super::partition::{PartitionSpec, SortOrder};
use super::schema::Schema;
use super::snapshot::{MAIN_BRANCH, Snapshot, SnapshotLogEntry, SnapshotReference};
use super::table_metadata::{Properties, SUPPORTED_FORMAT_VERSION, TableMetadata, now_ms};
use super::update::TableUpdate;
use crate::error::ValidationErr;
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) struct MetadataBuilder {
    metadata: TableMetadata,
    last_added_schema_id: Option<i32>,
    last_added_spec_id: Option<i32>,
    last_added_order_id: Option<i32>,
    changed: bool,
}

impl MetadataBuilder {
    /// Id argument meaning "the one added last in this batch"
    pub(crate) const LAST_ADDED: i32 = -1;

    pub(crate) fn new(base: &TableMetadata) -> Self {
        MetadataBuilder {
            metadata: base.clone(),
            last_added_schema_id: None,
            last_added_spec_id: None,
            last_added_order_id: None,
            changed: false,
        }
    }

    pub(crate) fn build(mut self) -> TableMetadata {
        if self.changed {
            let last_snapshot_ts = self
                .metadata
                .current_snapshot()
                .map(|s| s.timestamp_ms)
                .unwrap_or(0);
            self.metadata.last_updated_ms = now_ms()
                .max(self.metadata.last_updated_ms)
                .max(last_snapshot_ts);
        }
        self.metadata
    }

    pub(crate) fn apply(&mut self, update: TableUpdate) -> Result<&mut Self, ValidationErr> {
        match update {
            TableUpdate::UpgradeFormatVersion { format_version } => {
                self.upgrade_format_version(format_version)
            }
            TableUpdate::AddSchema {
                schema,
                last_column_id,
            } => self.add_schema(schema, last_column_id),
            TableUpdate::SetCurrentSchema { schema_id } => self.set_current_schema(schema_id),
            TableUpdate::AddPartitionSpec { spec } => self.add_partition_spec(spec),
            TableUpdate::SetDefaultSpec { spec_id } => self.set_default_spec(spec_id),
            TableUpdate::AddSortOrder { sort_order } => self.add_sort_order(sort_order),
            TableUpdate::SetDefaultSortOrder { sort_order_id } => {
                self.set_default_sort_order(sort_order_id)
            }
            TableUpdate::AddSnapshot { snapshot } => self.add_snapshot(snapshot),
            TableUpdate::SetSnapshotRef {
                ref_name,
                reference,
            } => self.set_snapshot_ref(&ref_name, reference),
            TableUpdate::RemoveSnapshots { snapshot_ids } => self.remove_snapshots(&snapshot_ids),
            TableUpdate::RemoveSnapshotRef { ref_name } => self.remove_snapshot_ref(&ref_name),
            TableUpdate::SetLocation { location } => self.set_location(location),
            TableUpdate::SetProperties { updates } => self.set_properties(updates),
            TableUpdate::RemoveProperties { removals } => self.remove_properties(&removals),
        }
    }

    pub(crate) fn upgrade_format_version(&mut self, version: i32) -> Result<&mut Self, ValidationErr> {
        let current = self.metadata.format_version;
        if version > SUPPORTED_FORMAT_VERSION || version < 1 {
            return Err(ValidationErr::UnsupportedFormatVersion { version });
        }
        if version < current {
            return Err(ValidationErr::FormatVersionDowngrade {
                current,
                requested: version,
            });
        }
        if version != current {
            self.metadata.format_version = version;
            self.changed = true;
        }
        Ok(self)
    }

    /// Adds `schema`, assigning ids to fields that have none
    ///
    /// An identical schema already in the history is reused rather than
    /// added again.
    pub(crate) fn add_schema(
        &mut self,
        mut schema: Schema,
        last_column_id: Option<i32>,
    ) -> Result<&mut Self, ValidationErr> {
        let mut next_id = self.metadata.last_column_id;
        schema.assign_missing_ids(&mut next_id);
        schema.validate()?;

        let new_last_column_id = self
            .metadata
            .last_column_id
            .max(schema.highest_field_id())
            .max(last_column_id.unwrap_or(0));

        if let Some(existing) = self.metadata.schemas.iter().find(|s| s.same_fields(&schema)) {
            self.last_added_schema_id = Some(existing.schema_id);
            if new_last_column_id != self.metadata.last_column_id {
                self.metadata.last_column_id = new_last_column_id;
                self.changed = true;
            }
            return Ok(self);
        }

        schema.schema_id = self
            .metadata
            .schemas
            .iter()
            .map(|s| s.schema_id + 1)
            .max()
            .unwrap_or(0);
        log::debug!(
            "adding schema {} with last column id {}",
            schema.schema_id,
            new_last_column_id
        );
        self.last_added_schema_id = Some(schema.schema_id);
        self.metadata.last_column_id = new_last_column_id;
        self.metadata.schemas.push(Arc::new(schema));
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn set_current_schema(&mut self, schema_id: i32) -> Result<&mut Self, ValidationErr> {
        let schema_id = resolve_last_added(schema_id, self.last_added_schema_id, "schema")?;
        if self.metadata.schema_by_id(schema_id).is_none() {
            return Err(ValidationErr::SchemaNotFound { schema_id });
        }
        if self.metadata.current_schema_id != schema_id {
            self.metadata.current_schema_id = schema_id;
            self.changed = true;
        }
        Ok(self)
    }

    /// Adds `spec`, binding it against the current schema
    ///
    /// Unassigned field ids reuse the id of an equivalent field from an
    /// earlier spec or take the next id after `last-partition-id`. An explicit
    /// id that an earlier spec uses for a different field is rejected.
    pub(crate) fn add_partition_spec(&mut self, mut spec: PartitionSpec) -> Result<&mut Self, ValidationErr> {
        let schema = self.metadata.current_schema().clone();
        let mut next_id = self.metadata.last_partition_id;

        let history: Vec<_> = self
            .metadata
            .partition_specs
            .iter()
            .flat_map(|s| s.fields.iter())
            .cloned()
            .collect();

        for field in spec.fields.iter_mut() {
            if field.field_id == 0 {
                field.field_id = match history.iter().find(|h| h.is_equivalent(field)) {
                    Some(existing) if self.metadata.format_version > 1 => existing.field_id,
                    _ => {
                        next_id += 1;
                        next_id
                    }
                };
            } else if history
                .iter()
                .any(|h| h.field_id == field.field_id && !h.is_equivalent(field))
            {
                return Err(ValidationErr::PartitionFieldIdCollision {
                    field_id: field.field_id,
                });
            }
        }
        spec.validate(&schema)?;

        let new_last_partition_id = spec
            .highest_field_id()
            .unwrap_or(0)
            .max(self.metadata.last_partition_id);

        if let Some(existing) = self
            .metadata
            .partition_specs
            .iter()
            .find(|s| s.same_fields(&spec))
        {
            self.last_added_spec_id = Some(existing.spec_id);
            return Ok(self);
        }

        spec.spec_id = self
            .metadata
            .partition_specs
            .iter()
            .map(|s| s.spec_id + 1)
            .max()
            .unwrap_or(0);
        self.last_added_spec_id = Some(spec.spec_id);
        self.metadata.last_partition_id = new_last_partition_id;
        self.metadata.partition_specs.push(Arc::new(spec));
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn set_default_spec(&mut self, spec_id: i32) -> Result<&mut Self, ValidationErr> {
        let spec_id = resolve_last_added(spec_id, self.last_added_spec_id, "partition spec")?;
        if self.metadata.partition_spec_by_id(spec_id).is_none() {
            return Err(ValidationErr::PartitionSpecNotFound { spec_id });
        }
        if self.metadata.default_spec_id != spec_id {
            self.metadata.default_spec_id = spec_id;
            self.changed = true;
        }
        Ok(self)
    }

    pub(crate) fn add_sort_order(&mut self, mut order: SortOrder) -> Result<&mut Self, ValidationErr> {
        if order.is_unsorted() {
            order.order_id = SortOrder::UNSORTED_ORDER_ID;
        } else {
            order.validate(self.metadata.current_schema())?;
        }

        if let Some(existing) = self
            .metadata
            .sort_orders
            .iter()
            .find(|o| o.fields == order.fields)
        {
            self.last_added_order_id = Some(existing.order_id);
            return Ok(self);
        }

        if !order.is_unsorted() {
            order.order_id = self
                .metadata
                .sort_orders
                .iter()
                .map(|o| o.order_id + 1)
                .max()
                .unwrap_or(1)
                .max(1);
        }
        self.last_added_order_id = Some(order.order_id);
        self.metadata.sort_orders.push(Arc::new(order));
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn set_default_sort_order(&mut self, order_id: i32) -> Result<&mut Self, ValidationErr> {
        let order_id = resolve_last_added(order_id, self.last_added_order_id, "sort order")?;
        if self.metadata.sort_order_by_id(order_id).is_none() {
            return Err(ValidationErr::SortOrderNotFound { order_id });
        }
        if self.metadata.default_sort_order_id != order_id {
            self.metadata.default_sort_order_id = order_id;
            self.changed = true;
        }
        Ok(self)
    }

    /// Appends a snapshot to the history
    ///
    /// The sequence number must move past every number already assigned and
    /// the parent must be the current snapshot, which keeps the main history
    /// linear.
    pub(crate) fn add_snapshot(&mut self, snapshot: Snapshot) -> Result<&mut Self, ValidationErr> {
        let m = &self.metadata;
        if m.snapshot_by_id(snapshot.snapshot_id).is_some() {
            return Err(ValidationErr::DuplicateSnapshot {
                snapshot_id: snapshot.snapshot_id,
            });
        }
        if snapshot.sequence_number <= m.last_sequence_number {
            return Err(ValidationErr::StaleSequenceNumber {
                sequence_number: snapshot.sequence_number,
                last_sequence_number: m.last_sequence_number,
            });
        }
        match m.current_snapshot_id {
            Some(current) if snapshot.parent_snapshot_id != Some(current) => {
                return Err(ValidationErr::ParentMismatch {
                    expected: Some(current),
                    actual: snapshot.parent_snapshot_id,
                });
            }
            None => {
                if let Some(parent) = snapshot.parent_snapshot_id
                    && m.snapshot_by_id(parent).is_none()
                {
                    return Err(ValidationErr::ParentMismatch {
                        expected: None,
                        actual: Some(parent),
                    });
                }
            }
            _ => {}
        }
        if let Some(schema_id) = snapshot.schema_id
            && m.schema_by_id(schema_id).is_none()
        {
            return Err(ValidationErr::SchemaNotFound { schema_id });
        }

        log::debug!(
            "adding snapshot {} with sequence number {}",
            snapshot.snapshot_id,
            snapshot.sequence_number
        );
        self.metadata.last_sequence_number = snapshot.sequence_number;
        self.metadata.snapshots.push(Arc::new(snapshot));
        self.changed = true;
        Ok(self)
    }

    /// Points branch or tag `name` at a snapshot; `main` also moves the current snapshot
    pub(crate) fn set_snapshot_ref(
        &mut self,
        name: &str,
        reference: SnapshotReference,
    ) -> Result<&mut Self, ValidationErr> {
        let snapshot = self
            .metadata
            .snapshot_by_id(reference.snapshot_id)
            .ok_or(ValidationErr::SnapshotNotFound {
                snapshot_id: reference.snapshot_id,
            })?
            .clone();
        if name == MAIN_BRANCH && !reference.is_branch() {
            return Err(ValidationErr::invalid("main must be a branch"));
        }
        if self.metadata.refs.get(name) == Some(&reference) {
            return Ok(self);
        }

        if name == MAIN_BRANCH {
            self.metadata.current_snapshot_id = Some(snapshot.snapshot_id);
            self.metadata.snapshot_log.push(SnapshotLogEntry {
                timestamp_ms: snapshot.timestamp_ms,
                snapshot_id: snapshot.snapshot_id,
            });
        }
        self.metadata.refs.insert(name.to_string(), reference);
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn remove_snapshot_ref(&mut self, name: &str) -> Result<&mut Self, ValidationErr> {
        if self.metadata.refs.remove(name).is_some() {
            if name == MAIN_BRANCH {
                self.metadata.current_snapshot_id = None;
            }
            self.changed = true;
        }
        Ok(self)
    }

    pub(crate) fn remove_snapshots(&mut self, ids: &[i64]) -> Result<&mut Self, ValidationErr> {
        if let Some(current) = self.metadata.current_snapshot_id
            && ids.contains(&current)
        {
            return Err(ValidationErr::RemoveCurrentSnapshot {
                snapshot_id: current,
            });
        }
        let ids: HashSet<i64> = ids.iter().copied().collect();
        let before = self.metadata.snapshots.len();
        self.metadata
            .snapshots
            .retain(|s| !ids.contains(&s.snapshot_id));
        if self.metadata.snapshots.len() == before {
            return Ok(self);
        }
        self.metadata
            .refs
            .retain(|_, r| !ids.contains(&r.snapshot_id));
        self.metadata
            .snapshot_log
            .retain(|e| !ids.contains(&e.snapshot_id));
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn set_location(&mut self, location: String) -> Result<&mut Self, ValidationErr> {
        let location = location.trim_end_matches('/').to_string();
        if location.is_empty() {
            return Err(ValidationErr::invalid("table location must not be empty"));
        }
        if self.metadata.location != location {
            self.metadata.location = location;
            self.changed = true;
        }
        Ok(self)
    }

    pub(crate) fn set_properties(&mut self, updates: Properties) -> Result<&mut Self, ValidationErr> {
        if updates.is_empty() {
            return Ok(self);
        }
        self.metadata.properties.extend(updates);
        self.changed = true;
        Ok(self)
    }

    pub(crate) fn remove_properties(&mut self, removals: &[String]) -> Result<&mut Self, ValidationErr> {
        for key in removals {
            if self.metadata.properties.remove(key).is_some() {
                self.changed = true;
            }
        }
        Ok(self)
    }
}

fn resolve_last_added(id: i32, last_added: Option<i32>, what: &str) -> Result<i32, ValidationErr> {
    if id != MetadataBuilder::LAST_ADDED {
        return Ok(id);
    }
    last_added.ok_or_else(|| ValidationErr::invalid(format!("no {what} has been added in this update")))
}
