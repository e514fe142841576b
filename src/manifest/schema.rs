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

//! Avro schemas of manifest lists and manifests
//!
//! Version 2 schemas double as reader schemas for version 1 files: fields
//! that only exist in version 2 carry defaults (content 0, sequence numbers
//! 0), and version 1 only fields are skipped.

use crate::avro::{AvroSchema, RecordField};
use crate::error::CodecError;
use crate::metadata::StructType;
use crate::metadata::literal::primitive_to_avro;
use once_cell::sync::Lazy;
use serde_json::json;

/// `block_size_in_bytes` written into version 1 manifests
pub(crate) const V1_BLOCK_SIZE: i64 = 64 * 1024 * 1024;

fn field_summary_schema() -> AvroSchema {
    AvroSchema::record(
        "r508",
        vec![
            RecordField::required(509, "contains_null", AvroSchema::Boolean),
            RecordField::optional(518, "contains_nan", AvroSchema::Boolean),
            RecordField::optional(510, "lower_bound", AvroSchema::Bytes),
            RecordField::optional(511, "upper_bound", AvroSchema::Bytes),
        ],
    )
}

/// Schema of manifest-list entries for `format_version`
pub fn manifest_list_schema(format_version: i32) -> AvroSchema {
    let mut fields = vec![
        RecordField::required(500, "manifest_path", AvroSchema::String),
        RecordField::required(501, "manifest_length", AvroSchema::Long),
        RecordField::required(502, "partition_spec_id", AvroSchema::Int),
    ];
    if format_version >= 2 {
        fields.extend([
            RecordField::required(517, "content", AvroSchema::Int).with_default(json!(0)),
            RecordField::required(515, "sequence_number", AvroSchema::Long).with_default(json!(0)),
            RecordField::required(516, "min_sequence_number", AvroSchema::Long)
                .with_default(json!(0)),
            RecordField::required(503, "added_snapshot_id", AvroSchema::Long),
            RecordField::required(504, "added_files_count", AvroSchema::Int),
            RecordField::required(505, "existing_files_count", AvroSchema::Int),
            RecordField::required(506, "deleted_files_count", AvroSchema::Int),
            RecordField::required(512, "added_rows_count", AvroSchema::Long),
            RecordField::required(513, "existing_rows_count", AvroSchema::Long),
            RecordField::required(514, "deleted_rows_count", AvroSchema::Long),
        ]);
    } else {
        fields.extend([
            RecordField::required(503, "added_snapshot_id", AvroSchema::Long),
            RecordField::optional(504, "added_data_files_count", AvroSchema::Int),
            RecordField::optional(505, "existing_data_files_count", AvroSchema::Int),
            RecordField::optional(506, "deleted_data_files_count", AvroSchema::Int),
            RecordField::optional(512, "added_rows_count", AvroSchema::Long),
            RecordField::optional(513, "existing_rows_count", AvroSchema::Long),
            RecordField::optional(514, "deleted_rows_count", AvroSchema::Long),
        ]);
    }
    fields.extend([
        RecordField::optional(507, "partitions", AvroSchema::array(508, field_summary_schema())),
        RecordField::optional(519, "key_metadata", AvroSchema::Bytes),
    ]);
    AvroSchema::record("manifest_file", fields)
}

static MANIFEST_LIST_V2: Lazy<AvroSchema> = Lazy::new(|| manifest_list_schema(2));

/// Reader schema used for every manifest list, whatever its writer version
pub fn manifest_list_read_schema() -> &'static AvroSchema {
    &MANIFEST_LIST_V2
}

/// Avro record of a partition tuple; every partition value is nullable
pub fn partition_schema(partition_type: &StructType) -> Result<AvroSchema, CodecError> {
    let fields = partition_type
        .fields
        .iter()
        .map(|f| {
            let p = f.field_type.as_primitive().ok_or_else(|| {
                CodecError::invalid_schema(format!(
                    "partition field {} is not a primitive type",
                    f.name
                ))
            })?;
            Ok(RecordField::optional(f.id, &f.name, primitive_to_avro(p, &f.name)))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(AvroSchema::record("r102", fields))
}

fn long_map(field_id: i32, name: &str, key_id: i32, value_id: i32) -> RecordField {
    RecordField::optional(
        field_id,
        name,
        AvroSchema::int_keyed_map(key_id, AvroSchema::Int, value_id, AvroSchema::Long),
    )
}

fn bytes_map(field_id: i32, name: &str, key_id: i32, value_id: i32) -> RecordField {
    RecordField::optional(
        field_id,
        name,
        AvroSchema::int_keyed_map(key_id, AvroSchema::Int, value_id, AvroSchema::Bytes),
    )
}

/// Schema of the `data_file` struct
pub fn data_file_schema(format_version: i32, partition_type: &StructType) -> Result<AvroSchema, CodecError> {
    let mut fields = Vec::with_capacity(18);
    if format_version >= 2 {
        fields.push(RecordField::required(134, "content", AvroSchema::Int).with_default(json!(0)));
    }
    fields.extend([
        RecordField::required(100, "file_path", AvroSchema::String),
        RecordField::required(101, "file_format", AvroSchema::String),
        RecordField::required(102, "partition", partition_schema(partition_type)?),
        RecordField::required(103, "record_count", AvroSchema::Long),
        RecordField::required(104, "file_size_in_bytes", AvroSchema::Long),
    ]);
    if format_version < 2 {
        fields.push(RecordField::required(105, "block_size_in_bytes", AvroSchema::Long));
    }
    fields.extend([
        long_map(108, "column_sizes", 117, 118),
        long_map(109, "value_counts", 119, 120),
        long_map(110, "null_value_counts", 121, 122),
        long_map(137, "nan_value_counts", 138, 139),
        bytes_map(125, "lower_bounds", 126, 127),
        bytes_map(128, "upper_bounds", 129, 130),
        RecordField::optional(131, "key_metadata", AvroSchema::Bytes),
        RecordField::optional(132, "split_offsets", AvroSchema::array(133, AvroSchema::Long)),
    ]);
    if format_version >= 2 {
        fields.push(RecordField::optional(
            135,
            "equality_ids",
            AvroSchema::array(136, AvroSchema::Int),
        ));
    }
    fields.push(RecordField::optional(140, "sort_order_id", AvroSchema::Int));
    Ok(AvroSchema::record("r2", fields))
}

/// Schema of manifest entries for `format_version` and a partition type
pub fn manifest_entry_schema(
    format_version: i32,
    partition_type: &StructType,
) -> Result<AvroSchema, CodecError> {
    let data_file = RecordField::required(2, "data_file", data_file_schema(format_version, partition_type)?);
    let fields = if format_version >= 2 {
        vec![
            RecordField::required(0, "status", AvroSchema::Int),
            RecordField::optional(1, "snapshot_id", AvroSchema::Long),
            RecordField::optional(3, "sequence_number", AvroSchema::Long),
            RecordField::optional(4, "file_sequence_number", AvroSchema::Long),
            data_file,
        ]
    } else {
        vec![
            RecordField::required(0, "status", AvroSchema::Int),
            RecordField::required(1, "snapshot_id", AvroSchema::Long),
            data_file,
        ]
    };
    Ok(AvroSchema::record("manifest_entry", fields))
}
