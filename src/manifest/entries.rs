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

//! Manifest reader and writer

use super::schema::{V1_BLOCK_SIZE, manifest_entry_schema};
use super::summary::PartitionSummaryBuilder;
use super::types::{
    DataContentType, DataFile, DataFileFormat, ManifestContent, ManifestEntry, ManifestFile,
    ManifestStatus, UNASSIGNED_SEQUENCE_NUMBER,
};
use crate::avro::{
    AvroSchema, BinaryDecoder, BinaryEncoder, Codec, ContainerReader, ContainerWriter, FieldDefault,
    RecordPlan, Resolved, required,
};
use crate::error::CodecError;
use crate::metadata::{
    Literal, PartitionField, PartitionSpec, PrimitiveType, Schema, StructType, TableMetadata,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

/// Key/value metadata stored in a manifest's container header
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestMetadata {
    /// Table schema the manifest was written with
    pub schema: Arc<Schema>,
    pub schema_id: i32,
    pub partition_spec: PartitionSpec,
    pub format_version: i32,
    pub content: ManifestContent,
}

impl ManifestMetadata {
    fn header_value<'a>(container: &'a ContainerReader, key: &str) -> Result<&'a str, CodecError> {
        container
            .metadata_str(key)
            .ok_or_else(|| CodecError::MissingMetadata { key: key.to_string() })
    }

    fn parse_header(container: &ContainerReader) -> Result<Self, CodecError> {
        let schema: Schema = serde_json::from_str(Self::header_value(container, "schema")?)
            .map_err(|e| CodecError::invalid_value("schema", e.to_string()))?;
        let schema_id = match container.metadata_str("schema-id") {
            Some(v) => v
                .parse()
                .map_err(|_| CodecError::invalid_value("schema-id", format!("not an integer: {v}")))?,
            None => schema.schema_id,
        };
        let fields: Vec<PartitionField> = serde_json::from_str(Self::header_value(container, "partition-spec")?)
            .map_err(|e| CodecError::invalid_value("partition-spec", e.to_string()))?;
        let spec_id = match container.metadata_str("partition-spec-id") {
            Some(v) => v.parse().map_err(|_| {
                CodecError::invalid_value("partition-spec-id", format!("not an integer: {v}"))
            })?,
            None => 0,
        };
        let format_version = match container.metadata_str("format-version") {
            Some(v) => v
                .parse()
                .map_err(|_| CodecError::invalid_value("format-version", format!("not an integer: {v}")))?,
            None => 1,
        };
        let content = match container.metadata_str("content") {
            Some(v) => v.parse()?,
            None => ManifestContent::Data,
        };
        Ok(ManifestMetadata {
            schema: Arc::new(schema),
            schema_id,
            partition_spec: PartitionSpec::new(spec_id, fields),
            format_version,
            content,
        })
    }

    /// Header version and content, with the schema and spec supplied by the table
    fn with_table_spec(
        container: &ContainerReader,
        schema: Arc<Schema>,
        spec: PartitionSpec,
    ) -> Result<Self, CodecError> {
        let format_version = container
            .metadata_str("format-version")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let content = match container.metadata_str("content") {
            Some(v) => v.parse()?,
            None => ManifestContent::Data,
        };
        Ok(ManifestMetadata {
            schema_id: schema.schema_id,
            schema,
            partition_spec: spec,
            format_version,
            content,
        })
    }

    fn header(&self) -> Result<Vec<(&'static str, String)>, CodecError> {
        let schema = serde_json::to_string(self.schema.as_ref())
            .map_err(|e| CodecError::invalid_value("schema", e.to_string()))?;
        let spec = serde_json::to_string(&self.partition_spec.fields)
            .map_err(|e| CodecError::invalid_value("partition-spec", e.to_string()))?;
        Ok(vec![
            ("schema", schema),
            ("schema-id", self.schema_id.to_string()),
            ("partition-spec", spec),
            ("partition-spec-id", self.partition_spec.spec_id.to_string()),
            ("format-version", self.format_version.to_string()),
            ("content", self.content.to_string()),
        ])
    }

    fn partition_type(&self) -> Result<StructType, CodecError> {
        self.partition_spec
            .partition_type(&self.schema)
            .map_err(|e| CodecError::invalid_schema(e.to_string()))
    }
}

/// (field id, name, type) of every partition field, in tuple order
type PartitionLayout = Vec<(i32, String, PrimitiveType)>;

fn partition_layout(partition_type: &StructType) -> Result<PartitionLayout, CodecError> {
    partition_type
        .fields
        .iter()
        .map(|f| {
            let ty = f.field_type.as_primitive().ok_or_else(|| {
                CodecError::invalid_schema(format!("partition field {} is not a primitive type", f.name))
            })?;
            Ok((f.id, f.name.clone(), ty.clone()))
        })
        .collect()
}

// ============================================================================
// Writer
// ============================================================================

#[derive(Debug, Default)]
struct Counts {
    files: i32,
    rows: i64,
}

impl Counts {
    fn add(&mut self, file: &DataFile) {
        self.files += 1;
        self.rows += file.record_count;
    }
}

/// Writes the entries of one manifest
///
/// Entries are appended in call order. [`ManifestWriter::finish`] returns
/// the encoded file together with the manifest-list entry describing it.
#[derive(Debug)]
pub struct ManifestWriter {
    metadata: ManifestMetadata,
    layout: PartitionLayout,
    snapshot_id: i64,
    writer: ContainerWriter,
    summary: PartitionSummaryBuilder,
    added: Counts,
    existing: Counts,
    deleted: Counts,
    min_sequence_number: Option<i64>,
}

impl ManifestWriter {
    pub fn new(
        format_version: i32,
        snapshot_id: i64,
        schema: Arc<Schema>,
        spec: PartitionSpec,
        content: ManifestContent,
        codec: Codec,
    ) -> Result<Self, CodecError> {
        if format_version < 2 && content == ManifestContent::Deletes {
            return Err(CodecError::invalid_value(
                "content",
                "delete manifests require format version 2",
            ));
        }
        let metadata = ManifestMetadata {
            schema_id: schema.schema_id,
            schema,
            partition_spec: spec,
            format_version,
            content,
        };
        let partition_type = metadata.partition_type()?;
        let layout = partition_layout(&partition_type)?;
        let avro_schema = manifest_entry_schema(format_version, &partition_type)?;
        let writer = ContainerWriter::new(&avro_schema, codec, metadata.header()?);
        let summary = PartitionSummaryBuilder::new(
            layout
                .iter()
                .map(|(_, _, ty)| matches!(ty, PrimitiveType::Float | PrimitiveType::Double))
                .collect(),
        );
        Ok(ManifestWriter {
            metadata,
            layout,
            snapshot_id,
            writer,
            summary,
            added: Counts::default(),
            existing: Counts::default(),
            deleted: Counts::default(),
            min_sequence_number: None,
        })
    }

    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Adds a file written by this snapshot; its sequence numbers are inherited on read
    pub fn add(&mut self, data_file: DataFile) -> Result<(), CodecError> {
        self.add_entry(ManifestEntry::added(data_file))
    }

    /// Carries a live entry over from an earlier manifest
    pub fn existing(&mut self, mut entry: ManifestEntry) -> Result<(), CodecError> {
        entry.status = ManifestStatus::Existing;
        self.add_entry(entry)
    }

    /// Marks an entry from an earlier manifest as deleted by this snapshot
    pub fn delete(&mut self, mut entry: ManifestEntry) -> Result<(), CodecError> {
        entry.status = ManifestStatus::Deleted;
        entry.snapshot_id = Some(self.snapshot_id);
        self.add_entry(entry)
    }

    /// Appends an entry with the status it carries
    pub fn add_entry(&mut self, mut entry: ManifestEntry) -> Result<(), CodecError> {
        let v2 = self.metadata.format_version >= 2;
        self.check_entry(&entry)?;
        match entry.status {
            ManifestStatus::Added => {
                entry.snapshot_id = Some(self.snapshot_id);
                self.added.add(&entry.data_file);
            }
            ManifestStatus::Existing => self.existing.add(&entry.data_file),
            ManifestStatus::Deleted => self.deleted.add(&entry.data_file),
        }
        if let (true, Some(seq)) = (entry.is_alive(), entry.sequence_number) {
            self.min_sequence_number = Some(self.min_sequence_number.map_or(seq, |m| m.min(seq)));
        }
        self.summary.update(&entry.data_file.partition);

        let snapshot_id = self.snapshot_id;
        let layout = &self.layout;
        self.writer.append(|e| {
            write_entry(e, &entry, layout, snapshot_id, v2);
        })
    }

    fn check_entry(&self, entry: &ManifestEntry) -> Result<(), CodecError> {
        let file = &entry.data_file;
        let partition = &file.partition;
        if partition.len() != self.layout.len() {
            return Err(CodecError::invalid_value(
                "partition",
                format!(
                    "{}: tuple has {} values, spec {} has {} fields",
                    file.file_path,
                    partition.len(),
                    self.metadata.partition_spec.spec_id,
                    self.layout.len()
                ),
            ));
        }
        for (value, (_, name, ty)) in partition.iter().zip(&self.layout) {
            if value.is_some_and(|v| !v.matches_type(ty)) {
                return Err(CodecError::invalid_value(
                    name.as_str(),
                    format!("{:?} is not a {ty} value", value),
                ));
            }
        }
        let data_manifest = self.metadata.content == ManifestContent::Data;
        if data_manifest != (file.content == DataContentType::Data) {
            return Err(CodecError::invalid_value(
                "content",
                format!(
                    "{} of type {:?} does not belong in a {} manifest",
                    file.file_path, file.content, self.metadata.content
                ),
            ));
        }
        if self.metadata.format_version >= 2
            && entry.status != ManifestStatus::Added
            && (entry.sequence_number.is_none() || entry.file_sequence_number.is_none())
        {
            return Err(CodecError::UnexpectedNull {
                field: format!("sequence_number of {:?} entry {}", entry.status, file.file_path),
            });
        }
        Ok(())
    }

    /// Entries appended so far
    pub fn entry_count(&self) -> u64 {
        self.writer.record_count()
    }

    /// Completes the file; `path` is recorded in the returned manifest-list entry
    pub fn finish(self, path: impl Into<String>) -> Result<(Bytes, ManifestFile), CodecError> {
        let bytes = self.writer.finish()?;
        let manifest = ManifestFile {
            manifest_path: path.into(),
            manifest_length: bytes.len() as i64,
            partition_spec_id: self.metadata.partition_spec.spec_id,
            content: self.metadata.content,
            sequence_number: UNASSIGNED_SEQUENCE_NUMBER,
            min_sequence_number: self.min_sequence_number.unwrap_or(UNASSIGNED_SEQUENCE_NUMBER),
            added_snapshot_id: self.snapshot_id,
            added_files_count: Some(self.added.files),
            existing_files_count: Some(self.existing.files),
            deleted_files_count: Some(self.deleted.files),
            added_rows_count: Some(self.added.rows),
            existing_rows_count: Some(self.existing.rows),
            deleted_rows_count: Some(self.deleted.rows),
            partitions: self.summary.finish(),
            key_metadata: None,
        };
        log::debug!(
            "wrote manifest {} ({} bytes, {} added, {} existing, {} deleted)",
            manifest.manifest_path,
            manifest.manifest_length,
            self.added.files,
            self.existing.files,
            self.deleted.files
        );
        Ok((bytes, manifest))
    }
}

fn write_map<K: Copy + Ord, V>(
    e: &mut BinaryEncoder<'_>,
    map: &HashMap<K, V>,
    mut write: impl FnMut(&mut BinaryEncoder<'_>, K, &V),
) {
    if map.is_empty() {
        e.write_union_index(0);
        return;
    }
    let mut items: Vec<(K, &V)> = map.iter().map(|(k, v)| (*k, v)).collect();
    items.sort_by_key(|(k, _)| *k);
    e.write_union_index(1);
    e.write_array(&items, |e, (k, v)| write(e, *k, v));
}

fn write_entry(e: &mut BinaryEncoder<'_>, entry: &ManifestEntry, layout: &PartitionLayout, snapshot_id: i64, v2: bool) {
    e.write_int(entry.status.id());
    if v2 {
        e.write_optional(entry.snapshot_id, |e, v| e.write_long(v));
        e.write_optional(entry.sequence_number, |e, v| e.write_long(v));
        e.write_optional(entry.file_sequence_number, |e, v| e.write_long(v));
    } else {
        e.write_long(entry.snapshot_id.unwrap_or(snapshot_id));
    }

    let file = &entry.data_file;
    if v2 {
        e.write_int(file.content.id());
    }
    e.write_str(&file.file_path);
    e.write_str(&file.file_format.to_string());
    for (value, (_, _, ty)) in file.partition.iter().zip(layout) {
        e.write_optional(value, |e, v| v.write_avro(ty, e));
    }
    e.write_long(file.record_count);
    e.write_long(file.file_size_in_bytes);
    if !v2 {
        e.write_long(V1_BLOCK_SIZE);
    }
    for counts in [
        &file.column_sizes,
        &file.value_counts,
        &file.null_value_counts,
        &file.nan_value_counts,
    ] {
        write_map(e, counts, |e, k, v| {
            e.write_int(k);
            e.write_long(*v);
        });
    }
    for bounds in [&file.lower_bounds, &file.upper_bounds] {
        write_map(e, bounds, |e, k, v| {
            e.write_int(k);
            e.write_bytes(v);
        });
    }
    e.write_optional(file.key_metadata.as_deref(), |e, v| e.write_bytes(v));
    write_list(e, &file.split_offsets, |e, v| e.write_long(*v));
    if v2 {
        write_list(e, &file.equality_ids, |e, v| e.write_int(*v));
    }
    e.write_optional(file.sort_order_id, |e, v| e.write_int(v));
}

fn write_list<T>(e: &mut BinaryEncoder<'_>, items: &[T], write: impl FnMut(&mut BinaryEncoder<'_>, &T)) {
    if items.is_empty() {
        e.write_union_index(0);
    } else {
        e.write_union_index(1);
        e.write_array(items, write);
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Lazy, forward-only reader over the entries of one manifest
///
/// Entries are resolved against the current entry schema, so version 1
/// manifests decode into the same [`ManifestEntry`] shape as version 2 ones.
#[derive(Debug)]
pub struct ManifestReader {
    container: ContainerReader,
    plan: RecordPlan,
    metadata: ManifestMetadata,
    layout: PartitionLayout,
    inherit: Option<ManifestFile>,
}

impl ManifestReader {
    /// Opens a manifest using the schema and partition spec in its header
    pub fn open(data: Bytes) -> Result<Self, CodecError> {
        let container = ContainerReader::open(data)?;
        let metadata = ManifestMetadata::parse_header(&container)?;
        Self::build(container, metadata)
    }

    /// Opens a manifest, decoding partition tuples with `spec` under `schema`
    ///
    /// Used when the caller already knows the table's spec, which also
    /// covers manifests whose header lacks the spec.
    pub fn with_partition(data: Bytes, schema: Arc<Schema>, spec: PartitionSpec) -> Result<Self, CodecError> {
        let container = ContainerReader::open(data)?;
        let metadata = ManifestMetadata::with_table_spec(&container, schema, spec)?;
        Self::build(container, metadata)
    }

    /// Opens a manifest, resolving its writer schema against `reader`
    ///
    /// Entry fields absent from `reader` are skipped and keep their zero
    /// values. Partition values are matched to the header's spec by field id.
    pub fn with_reader_schema(data: Bytes, reader: &AvroSchema) -> Result<Self, CodecError> {
        let container = ContainerReader::open(data)?;
        let metadata = ManifestMetadata::parse_header(&container)?;
        Self::build_with_schema(container, metadata, Some(reader))
    }

    fn build(container: ContainerReader, metadata: ManifestMetadata) -> Result<Self, CodecError> {
        Self::build_with_schema(container, metadata, None)
    }

    fn build_with_schema(
        container: ContainerReader,
        metadata: ManifestMetadata,
        reader: Option<&AvroSchema>,
    ) -> Result<Self, CodecError> {
        let partition_type = metadata.partition_type()?;
        let layout = partition_layout(&partition_type)?;
        let plan = match reader {
            Some(reader) => RecordPlan::compile(container.schema(), reader)?,
            None => RecordPlan::compile(container.schema(), &manifest_entry_schema(2, &partition_type)?)?,
        };
        log::debug!(
            "opened manifest (format version {}, spec {}, {} partition fields)",
            metadata.format_version,
            metadata.partition_spec.spec_id,
            layout.len()
        );
        Ok(ManifestReader {
            container,
            plan,
            metadata,
            layout,
            inherit: None,
        })
    }

    /// Fills null snapshot ids and sequence numbers from `manifest`
    pub fn inherit_from(mut self, manifest: ManifestFile) -> Self {
        self.inherit = Some(manifest);
        self
    }

    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Decodes the next entry into `out`, reusing its allocations
    ///
    /// Returns `Ok(false)` at the end of the manifest.
    pub fn next_into(&mut self, out: &mut ManifestEntry) -> Result<bool, CodecError> {
        let plan = &self.plan;
        let layout = &self.layout;
        match self.container.next_datum(|d| decode_entry(plan, layout, d, out)) {
            None => return Ok(false),
            Some(result) => result?,
        }
        if let Some(manifest) = &self.inherit {
            out.inherit_from(manifest);
        }
        Ok(true)
    }
}

impl Iterator for ManifestReader {
    type Item = Result<ManifestEntry, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut out = ManifestEntry::default();
        match self.next_into(&mut out) {
            Ok(true) => Some(Ok(out)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn decode_entry(
    plan: &RecordPlan,
    layout: &PartitionLayout,
    d: &mut BinaryDecoder<'_>,
    out: &mut ManifestEntry,
) -> Result<(), CodecError> {
    out.reset(layout.len());
    let defaults = plan.read(d, |id, r, d| {
        match id {
            0 => out.status = ManifestStatus::try_from(required(r.read_int(d, "status")?, "status")?)?,
            1 => out.snapshot_id = r.read_long(d, "snapshot_id")?,
            3 => out.sequence_number = r.read_long(d, "sequence_number")?,
            4 => out.file_sequence_number = r.read_long(d, "file_sequence_number")?,
            2 => {
                let file = &mut out.data_file;
                let defaults = r.read_record(d, "data_file", |id, r, d| decode_data_file_field(id, r, d, layout, file))?;
                let Some(defaults) = defaults else {
                    return Err(CodecError::UnexpectedNull {
                        field: "data_file".into(),
                    });
                };
                for default in defaults {
                    apply_data_file_default(file, default, layout)?;
                }
            }
            _ => r.skip(d)?,
        }
        Ok(())
    })?;
    for default in defaults {
        match default.field_id {
            0 => out.status = ManifestStatus::try_from(required(default.as_int()?, "status")?)?,
            1 => out.snapshot_id = default.as_long()?,
            3 => out.sequence_number = default.as_long()?,
            4 => out.file_sequence_number = default.as_long()?,
            _ => {}
        }
    }
    Ok(())
}

fn apply_data_file_default(
    file: &mut DataFile,
    default: &FieldDefault,
    layout: &PartitionLayout,
) -> Result<(), CodecError> {
    match default.field_id {
        134 => file.content = DataContentType::try_from(required(default.as_int()?, "content")?)?,
        100 => {
            let path = required(default.as_str()?, "file_path")?;
            file.file_path.push_str(path);
        }
        101 => file.file_format = required(default.as_str()?, "file_format")?.parse::<DataFileFormat>()?,
        102 => {
            if !default.value.is_null() {
                return Err(CodecError::invalid_value("partition", "only a null default is supported"));
            }
            file.partition.reset(layout.len());
        }
        103 => file.record_count = required(default.as_long()?, "record_count")?,
        104 => file.file_size_in_bytes = required(default.as_long()?, "file_size_in_bytes")?,
        131 => file.key_metadata = default.as_bytes()?,
        140 => file.sort_order_id = default.as_int()?,
        // 108-137: count and bound maps, 132/135: lists; empty unless written
        _ => {}
    }
    Ok(())
}

fn decode_data_file_field(
    id: i32,
    r: &Resolved,
    d: &mut BinaryDecoder<'_>,
    layout: &PartitionLayout,
    file: &mut DataFile,
) -> Result<(), CodecError> {
    match id {
        134 => file.content = DataContentType::try_from(required(r.read_int(d, "content")?, "content")?)?,
        100 => {
            let path = required(r.read_str(d, "file_path")?, "file_path")?;
            file.file_path.push_str(path);
        }
        101 => {
            let format = required(r.read_str(d, "file_format")?, "file_format")?;
            file.file_format = format.parse::<DataFileFormat>()?;
        }
        102 => {
            let partition = &mut file.partition;
            let defaults = r.read_record(d, "partition", |id, r, d| {
                match layout.iter().position(|(field_id, _, _)| *field_id == id) {
                    Some(pos) => {
                        let (_, name, ty) = &layout[pos];
                        partition.set(pos, Literal::read_avro(ty, r, d, name)?);
                    }
                    None => r.skip(d)?,
                }
                Ok(())
            })?;
            // partition fields are optional; a missing one stays null
            if let Some(default) = defaults.into_iter().flatten().find(|f| !f.value.is_null()) {
                return Err(CodecError::invalid_value(
                    default.name.as_str(),
                    "partition values only default to null",
                ));
            }
        }
        103 => file.record_count = required(r.read_long(d, "record_count")?, "record_count")?,
        104 => {
            file.file_size_in_bytes = required(r.read_long(d, "file_size_in_bytes")?, "file_size_in_bytes")?
        }
        108 => read_map(r, d, "column_sizes", 117, 118, &mut file.column_sizes, read_long_value)?,
        109 => read_map(r, d, "value_counts", 119, 120, &mut file.value_counts, read_long_value)?,
        110 => read_map(r, d, "null_value_counts", 121, 122, &mut file.null_value_counts, read_long_value)?,
        137 => read_map(r, d, "nan_value_counts", 138, 139, &mut file.nan_value_counts, read_long_value)?,
        125 => read_map(r, d, "lower_bounds", 126, 127, &mut file.lower_bounds, read_bytes_value)?,
        128 => read_map(r, d, "upper_bounds", 129, 130, &mut file.upper_bounds, read_bytes_value)?,
        131 => file.key_metadata = r.read_bytes(d, "key_metadata")?.map(<[u8]>::to_vec),
        132 => {
            let offsets = &mut file.split_offsets;
            r.read_array(d, "split_offsets", |item, d| {
                offsets.push(required(item.read_long(d, "split_offsets.element")?, "split_offsets.element")?);
                Ok(())
            })?;
        }
        135 => {
            let ids = &mut file.equality_ids;
            r.read_array(d, "equality_ids", |item, d| {
                ids.push(required(item.read_int(d, "equality_ids.element")?, "equality_ids.element")?);
                Ok(())
            })?;
        }
        140 => file.sort_order_id = r.read_int(d, "sort_order_id")?,
        _ => r.skip(d)?,
    }
    Ok(())
}

fn read_long_value(r: &Resolved, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<i64>, CodecError> {
    r.read_long(d, field)
}

fn read_bytes_value(r: &Resolved, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<Vec<u8>>, CodecError> {
    Ok(r.read_bytes(d, field)?.map(<[u8]>::to_vec))
}

/// Reads an int-keyed map stored as an array of key/value records
fn read_map<V>(
    r: &Resolved,
    d: &mut BinaryDecoder<'_>,
    field: &str,
    key_id: i32,
    value_id: i32,
    out: &mut HashMap<i32, V>,
    read_value: fn(&Resolved, &mut BinaryDecoder<'_>, &str) -> Result<Option<V>, CodecError>,
) -> Result<(), CodecError> {
    r.read_array(d, field, |item, d| {
        let mut key = None;
        let mut value = None;
        item.read_record(d, field, |id, r, d| {
            if id == key_id {
                key = r.read_int(d, field)?;
            } else if id == value_id {
                value = read_value(r, d, field)?;
            } else {
                r.skip(d)?;
            }
            Ok(())
        })?;
        out.insert(required(key, field)?, required(value, field)?);
        Ok(())
    })?;
    Ok(())
}

/// Encodes `entries` as a manifest for `spec` under `schema`
pub fn encode_manifest(
    entries: impl IntoIterator<Item = ManifestEntry>,
    format_version: i32,
    snapshot_id: i64,
    schema: Arc<Schema>,
    spec: PartitionSpec,
    content: ManifestContent,
) -> Result<Bytes, CodecError> {
    let mut writer = ManifestWriter::new(format_version, snapshot_id, schema, spec, content, Codec::Null)?;
    for entry in entries {
        writer.add_entry(entry)?;
    }
    writer.finish("").map(|(bytes, _)| bytes)
}

/// Lazily decodes a manifest against `reader_schema`
///
/// Partition tuples follow the spec recorded in the manifest's header.
pub fn decode_manifest(data: Bytes, reader_schema: &AvroSchema) -> Result<ManifestReader, CodecError> {
    ManifestReader::with_reader_schema(data, reader_schema)
}

/// Opens a manifest referenced by `manifest` with the table's own spec
///
/// The partition spec is looked up by the manifest's spec id and
/// inheritance from the manifest-list entry is enabled.
pub fn read_manifest_for_table(
    metadata: &TableMetadata,
    manifest: &ManifestFile,
    data: Bytes,
) -> Result<ManifestReader, CodecError> {
    let spec = metadata
        .partition_spec_by_id(manifest.partition_spec_id)
        .ok_or_else(|| {
            CodecError::invalid_value(
                "partition_spec_id",
                format!("spec {} of {} not found in table metadata", manifest.partition_spec_id, manifest.manifest_path),
            )
        })?;
    let container = ContainerReader::open(data)?;
    let schema = container
        .metadata_str("schema-id")
        .and_then(|v| v.parse().ok())
        .and_then(|id| metadata.schema_by_id(id))
        .unwrap_or_else(|| metadata.current_schema())
        .clone();
    let manifest_metadata = ManifestMetadata::with_table_spec(&container, schema, spec.as_ref().clone())?;
    Ok(ManifestReader::build(container, manifest_metadata)?.inherit_from(manifest.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{NestedField, Transform};

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(
            0,
            vec![
                NestedField::required(1, "id", PrimitiveType::Long),
                NestedField::optional(2, "category", PrimitiveType::String),
                NestedField::optional(3, "score", PrimitiveType::Double),
            ],
        ))
    }

    fn spec() -> PartitionSpec {
        PartitionSpec::new(
            0,
            vec![
                PartitionField::new(2, 1000, "category", Transform::Identity),
                PartitionField::new(3, 1001, "score", Transform::Identity),
            ],
        )
    }

    fn data_file(i: i64, category: Option<&str>) -> DataFile {
        DataFile::builder()
            .file_path(format!("s3://bucket/t/data/{i}.parquet"))
            .file_format(DataFileFormat::Parquet)
            .partition(crate::manifest::PartitionData::new(vec![
                category.map(|c| Literal::String(c.to_string())),
                Some(Literal::Double(i as f64)),
            ]))
            .record_count(10 * i)
            .file_size_in_bytes(1024 * i)
            .column_sizes(HashMap::from([(1, 80), (2, 40)]))
            .lower_bounds(HashMap::from([(1, Literal::Long(0).to_bytes())]))
            .upper_bounds(HashMap::from([(1, Literal::Long(i).to_bytes())]))
            .split_offsets(vec![4])
            .build()
    }

    #[test]
    fn test_writer_fills_manifest_file() {
        let mut w = ManifestWriter::new(2, 7, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        w.add(data_file(1, Some("a"))).unwrap();
        w.add(data_file(2, Some("b"))).unwrap();
        let mut old = ManifestEntry::added(data_file(3, None));
        old.snapshot_id = Some(5);
        old.sequence_number = Some(2);
        old.file_sequence_number = Some(2);
        w.existing(old.clone()).unwrap();
        w.delete(old).unwrap();
        assert_eq!(w.entry_count(), 4);

        let (bytes, manifest) = w.finish("s3://bucket/t/metadata/a-m0.avro").unwrap();
        assert_eq!(manifest.manifest_length, bytes.len() as i64);
        assert_eq!(manifest.added_snapshot_id, 7);
        assert_eq!(manifest.sequence_number, UNASSIGNED_SEQUENCE_NUMBER);
        assert_eq!(manifest.min_sequence_number, 2);
        assert_eq!(manifest.added_files_count, Some(2));
        assert_eq!(manifest.existing_files_count, Some(1));
        assert_eq!(manifest.deleted_files_count, Some(1));
        assert_eq!(manifest.added_rows_count, Some(30));
        assert_eq!(manifest.deleted_rows_count, Some(30));
        assert_eq!(manifest.partitions.len(), 2);
        assert!(manifest.partitions[0].contains_null);
        assert_eq!(manifest.partitions[0].lower_bound, Some(b"a".to_vec()));
        assert_eq!(manifest.partitions[1].contains_nan, Some(false));
    }

    #[test]
    fn test_roundtrip_with_inheritance() {
        let mut w = ManifestWriter::new(2, 7, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        w.add(data_file(1, Some("a"))).unwrap();
        let (bytes, mut manifest) = w.finish("m0.avro").unwrap();
        manifest.sequence_number = 4;
        manifest.min_sequence_number = 4;

        let reader = ManifestReader::open(bytes).unwrap();
        assert_eq!(reader.metadata().partition_spec, spec());
        assert_eq!(reader.metadata().format_version, 2);
        let entries: Vec<_> = reader.inherit_from(manifest).collect::<Result<_, _>>().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ManifestStatus::Added);
        assert_eq!(entries[0].snapshot_id, Some(7));
        assert_eq!(entries[0].sequence_number, Some(4));
        assert_eq!(entries[0].file_sequence_number, Some(4));
        assert_eq!(entries[0].data_file, data_file(1, Some("a")));
    }

    #[test]
    fn test_v1_manifest_reads_as_v2_entries() {
        let mut w = ManifestWriter::new(1, 3, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        w.add(data_file(2, Some("x"))).unwrap();
        let (bytes, _) = w.finish("m.avro").unwrap();
        let entries: Vec<_> = ManifestReader::open(bytes).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries[0].snapshot_id, Some(3));
        assert_eq!(entries[0].sequence_number, None);
        assert_eq!(entries[0].data_file.content, DataContentType::Data);
        assert_eq!(entries[0].data_file.partition.get(0), Some(&Literal::String("x".into())));
        assert_eq!(entries[0].data_file.record_count, 20);
    }

    fn projected_entry_schema(drop: &[i32], defaults: &[(i32, serde_json::Value)]) -> AvroSchema {
        let partition_type = spec().partition_type(&schema()).unwrap();
        let mut fields = match manifest_entry_schema(2, &partition_type).unwrap() {
            AvroSchema::Record(r) => r.fields,
            other => panic!("unexpected schema {other:?}"),
        };
        for field in &mut fields {
            if let AvroSchema::Record(data_file) = &mut field.schema {
                data_file.fields.retain(|f| !f.field_id.is_some_and(|id| drop.contains(&id)));
                for f in &mut data_file.fields {
                    if let Some((_, value)) = defaults.iter().find(|(id, _)| Some(*id) == f.field_id) {
                        f.default = Some(value.clone());
                    }
                }
            }
        }
        fields.retain(|f| !f.field_id.is_some_and(|id| drop.contains(&id)));
        AvroSchema::record("manifest_entry", fields)
    }

    #[test]
    fn test_reader_schema_projection_skips_bounds() {
        let files: Vec<_> = (1..=3).map(|i| data_file(i, Some("p"))).collect();
        let bytes = encode_manifest(
            files.iter().cloned().map(ManifestEntry::added),
            2,
            9,
            schema(),
            spec(),
            ManifestContent::Data,
        )
        .unwrap();

        let projection = projected_entry_schema(&[125, 128, 108, 3, 4], &[]);
        let entries: Vec<_> = decode_manifest(bytes, &projection)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        for (entry, file) in entries.iter().zip(&files) {
            assert_eq!(entry.file_path(), file.file_path);
            assert_eq!(entry.data_file.record_count, file.record_count);
            assert_eq!(entry.data_file.partition, file.partition);
            assert_eq!(entry.data_file.split_offsets, file.split_offsets);
            assert!(entry.data_file.lower_bounds.is_empty());
            assert!(entry.data_file.upper_bounds.is_empty());
            assert!(entry.data_file.column_sizes.is_empty());
            assert_eq!(entry.sequence_number, None);
        }
    }

    #[test]
    fn test_v1_manifest_takes_reader_defaults() {
        let mut w = ManifestWriter::new(1, 3, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        w.add(data_file(2, Some("x"))).unwrap();
        let (bytes, _) = w.finish("m.avro").unwrap();

        let reader_schema = projected_entry_schema(&[], &[(134, serde_json::json!(2)), (140, serde_json::json!(5))]);
        let mut reader = decode_manifest(bytes, &reader_schema).unwrap();
        let mut entry = ManifestEntry::default();
        assert!(reader.next_into(&mut entry).unwrap());
        // 134 is missing from version 1 files; 140 was written as null
        assert_eq!(entry.data_file.content, DataContentType::EqualityDeletes);
        assert_eq!(entry.data_file.sort_order_id, None);
        assert_eq!(entry.snapshot_id, Some(3));
    }

    #[test]
    fn test_v2_existing_entry_requires_sequence_number() {
        let mut w = ManifestWriter::new(2, 7, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        assert!(matches!(
            w.existing(ManifestEntry::added(data_file(1, None))),
            Err(CodecError::UnexpectedNull { .. })
        ));
    }

    #[test]
    fn test_partition_tuple_is_checked() {
        let mut w = ManifestWriter::new(2, 7, schema(), spec(), ManifestContent::Data, Codec::Null).unwrap();
        let mut file = data_file(1, Some("a"));
        file.partition = crate::manifest::PartitionData::new(vec![Some(Literal::Int(1)), None]);
        assert!(w.add(file).is_err());
        let mut file = data_file(1, Some("a"));
        file.partition = crate::manifest::PartitionData::empty();
        assert!(w.add(file).is_err());
        let mut file = data_file(1, Some("a"));
        file.content = DataContentType::PositionDeletes;
        assert!(w.add(file).is_err());
    }

    #[test]
    fn test_next_into_reuses_entry() {
        let files: Vec<_> = (1..=5).map(|i| data_file(i, Some("c"))).collect();
        let bytes = encode_manifest(
            files.iter().cloned().map(ManifestEntry::added),
            2,
            9,
            schema(),
            spec(),
            ManifestContent::Data,
        )
        .unwrap();
        let mut reader = ManifestReader::open(bytes).unwrap();
        let mut entry = ManifestEntry::default();
        let mut n = 0;
        while reader.next_into(&mut entry).unwrap() {
            assert_eq!(entry.data_file, files[n]);
            n += 1;
        }
        assert_eq!(n, 5);
    }

    #[test]
    fn test_read_manifest_for_table_uses_table_spec() {
        let metadata = TableMetadata::create(
            schema().as_ref().clone(),
            spec(),
            crate::metadata::SortOrder::unsorted(),
            "mem://warehouse/t",
            Default::default(),
            2,
        )
        .unwrap();
        let table_spec = metadata.default_partition_spec().as_ref().clone();
        let mut w =
            ManifestWriter::new(2, 1, schema(), table_spec, ManifestContent::Data, Codec::Null).unwrap();
        w.add(data_file(1, Some("a"))).unwrap();
        let (bytes, mut manifest) = w.finish("m.avro").unwrap();
        manifest.sequence_number = 1;

        let entries: Vec<_> = read_manifest_for_table(&metadata, &manifest, bytes)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries[0].sequence_number, Some(1));
        assert_eq!(entries[0].file_path(), "s3://bucket/t/data/1.parquet");

        manifest.partition_spec_id = 42;
        assert!(read_manifest_for_table(&metadata, &manifest, Bytes::new()).is_err());
    }
}
