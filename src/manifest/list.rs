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

//! Manifest-list reader and writer

use super::schema::{manifest_list_read_schema, manifest_list_schema};
use super::types::{FieldSummary, ManifestContent, ManifestFile, UNASSIGNED_SEQUENCE_NUMBER};
use crate::avro::{
    AvroSchema, BinaryDecoder, BinaryEncoder, Codec, ContainerReader, ContainerWriter, FieldDefault,
    RecordPlan, Resolved, required,
};
use crate::error::CodecError;
use bytes::Bytes;

/// Lazy, forward-only reader over the entries of a manifest list
///
/// Every entry is decoded only when pulled. Dropping the reader early is
/// the way to stop.
#[derive(Debug)]
pub struct ManifestListReader {
    container: ContainerReader,
    plan: RecordPlan,
}

impl ManifestListReader {
    /// Opens a manifest list written under any supported format version
    pub fn open(data: Bytes) -> Result<Self, CodecError> {
        Self::with_reader_schema(data, manifest_list_read_schema())
    }

    /// Opens a manifest list, resolving its writer schema against `reader`
    ///
    /// Fields absent from `reader` are skipped and keep their zero values.
    /// Fields of `reader` the writer never wrote take `reader`'s defaults.
    pub fn with_reader_schema(data: Bytes, reader: &AvroSchema) -> Result<Self, CodecError> {
        let container = ContainerReader::open(data)?;
        let plan = RecordPlan::compile(container.schema(), reader)?;
        log::debug!(
            "opened manifest list (codec {}, format version {})",
            container.codec().as_str(),
            container.metadata_str("format-version").unwrap_or("1")
        );
        Ok(ManifestListReader { container, plan })
    }

    /// `snapshot-id` header value
    pub fn snapshot_id(&self) -> Option<i64> {
        self.container.metadata_str("snapshot-id")?.parse().ok()
    }

    /// `format-version` header value; 1 when absent
    pub fn format_version(&self) -> i32 {
        self.container
            .metadata_str("format-version")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }

    /// Decodes the next entry into `out`, reusing its allocations
    ///
    /// Returns `Ok(false)` at the end of the list.
    pub fn next_into(&mut self, out: &mut ManifestFile) -> Result<bool, CodecError> {
        let plan = &self.plan;
        match self.container.next_datum(|d| decode_manifest_file(plan, d, out)) {
            None => Ok(false),
            Some(result) => result.map(|_| true),
        }
    }
}

impl Iterator for ManifestListReader {
    type Item = Result<ManifestFile, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut out = ManifestFile::default();
        match self.next_into(&mut out) {
            Ok(true) => Some(Ok(out)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn reset(out: &mut ManifestFile) {
    out.manifest_path.clear();
    out.manifest_length = 0;
    out.partition_spec_id = 0;
    out.content = ManifestContent::Data;
    out.sequence_number = 0;
    out.min_sequence_number = 0;
    out.added_snapshot_id = 0;
    out.added_files_count = None;
    out.existing_files_count = None;
    out.deleted_files_count = None;
    out.added_rows_count = None;
    out.existing_rows_count = None;
    out.deleted_rows_count = None;
    out.partitions.clear();
    out.key_metadata = None;
}

fn decode_field_summary(r: &Resolved, d: &mut BinaryDecoder<'_>) -> Result<FieldSummary, CodecError> {
    let mut summary = FieldSummary::default();
    let defaults = r.read_record(d, "partitions", |id, r, d| {
        match id {
            509 => summary.contains_null = required(r.read_boolean(d, "contains_null")?, "contains_null")?,
            518 => summary.contains_nan = r.read_boolean(d, "contains_nan")?,
            510 => summary.lower_bound = r.read_bytes(d, "lower_bound")?.map(<[u8]>::to_vec),
            511 => summary.upper_bound = r.read_bytes(d, "upper_bound")?.map(<[u8]>::to_vec),
            _ => r.skip(d)?,
        }
        Ok(())
    })?;
    let Some(defaults) = defaults else {
        return Err(CodecError::UnexpectedNull {
            field: "partitions.element".into(),
        });
    };
    for default in defaults {
        match default.field_id {
            509 => summary.contains_null = required(default.as_boolean()?, "contains_null")?,
            518 => summary.contains_nan = default.as_boolean()?,
            510 => summary.lower_bound = default.as_bytes()?,
            511 => summary.upper_bound = default.as_bytes()?,
            _ => {}
        }
    }
    Ok(summary)
}

fn apply_default(out: &mut ManifestFile, default: &FieldDefault) -> Result<(), CodecError> {
    match default.field_id {
        500 => {
            let path = required(default.as_str()?, "manifest_path")?;
            out.manifest_path.push_str(path);
        }
        501 => out.manifest_length = required(default.as_long()?, "manifest_length")?,
        502 => out.partition_spec_id = required(default.as_int()?, "partition_spec_id")?,
        517 => out.content = ManifestContent::try_from(required(default.as_int()?, "content")?)?,
        515 => out.sequence_number = required(default.as_long()?, "sequence_number")?,
        516 => out.min_sequence_number = required(default.as_long()?, "min_sequence_number")?,
        503 => out.added_snapshot_id = required(default.as_long()?, "added_snapshot_id")?,
        504 => out.added_files_count = default.as_int()?,
        505 => out.existing_files_count = default.as_int()?,
        506 => out.deleted_files_count = default.as_int()?,
        512 => out.added_rows_count = default.as_long()?,
        513 => out.existing_rows_count = default.as_long()?,
        514 => out.deleted_rows_count = default.as_long()?,
        519 => out.key_metadata = default.as_bytes()?,
        // 507: partition summaries stay empty
        _ => {}
    }
    Ok(())
}

fn decode_manifest_file(
    plan: &RecordPlan,
    d: &mut BinaryDecoder<'_>,
    out: &mut ManifestFile,
) -> Result<(), CodecError> {
    reset(out);
    let defaults = plan.read(d, |id, r, d| {
        match id {
            500 => {
                let path = required(r.read_str(d, "manifest_path")?, "manifest_path")?;
                out.manifest_path.push_str(path);
            }
            501 => out.manifest_length = required(r.read_long(d, "manifest_length")?, "manifest_length")?,
            502 => {
                out.partition_spec_id = required(r.read_int(d, "partition_spec_id")?, "partition_spec_id")?
            }
            517 => out.content = ManifestContent::try_from(required(r.read_int(d, "content")?, "content")?)?,
            515 => out.sequence_number = required(r.read_long(d, "sequence_number")?, "sequence_number")?,
            516 => {
                out.min_sequence_number =
                    required(r.read_long(d, "min_sequence_number")?, "min_sequence_number")?
            }
            503 => {
                out.added_snapshot_id = required(r.read_long(d, "added_snapshot_id")?, "added_snapshot_id")?
            }
            504 => out.added_files_count = r.read_int(d, "added_files_count")?,
            505 => out.existing_files_count = r.read_int(d, "existing_files_count")?,
            506 => out.deleted_files_count = r.read_int(d, "deleted_files_count")?,
            512 => out.added_rows_count = r.read_long(d, "added_rows_count")?,
            513 => out.existing_rows_count = r.read_long(d, "existing_rows_count")?,
            514 => out.deleted_rows_count = r.read_long(d, "deleted_rows_count")?,
            507 => {
                let partitions = &mut out.partitions;
                r.read_array(d, "partitions", |item, d| {
                    partitions.push(decode_field_summary(item, d)?);
                    Ok(())
                })?;
            }
            519 => out.key_metadata = r.read_bytes(d, "key_metadata")?.map(<[u8]>::to_vec),
            _ => r.skip(d)?,
        }
        Ok(())
    })?;
    for default in defaults {
        apply_default(out, default)?;
    }
    Ok(())
}

/// Writes the manifest list of one snapshot
///
/// Manifests added by this snapshot may carry
/// [`UNASSIGNED_SEQUENCE_NUMBER`]; the writer replaces it with the
/// snapshot's sequence number.
#[derive(Debug)]
pub struct ManifestListWriter {
    format_version: i32,
    snapshot_id: i64,
    sequence_number: i64,
    writer: ContainerWriter,
}

impl ManifestListWriter {
    pub fn new(
        format_version: i32,
        snapshot_id: i64,
        parent_snapshot_id: Option<i64>,
        sequence_number: i64,
        codec: Codec,
    ) -> Self {
        let mut header = vec![
            ("snapshot-id", snapshot_id.to_string()),
            (
                "parent-snapshot-id",
                parent_snapshot_id.map_or_else(|| "null".to_string(), |p| p.to_string()),
            ),
            ("format-version", format_version.to_string()),
        ];
        if format_version >= 2 {
            header.push(("sequence-number", sequence_number.to_string()));
        }
        let writer = ContainerWriter::new(&manifest_list_schema(format_version), codec, header);
        ManifestListWriter {
            format_version,
            snapshot_id,
            sequence_number,
            writer,
        }
    }

    pub fn add(&mut self, manifest: &ManifestFile) -> Result<(), CodecError> {
        let mut sequence_number = manifest.sequence_number;
        let mut min_sequence_number = manifest.min_sequence_number;
        if self.format_version >= 2 {
            for seq in [&mut sequence_number, &mut min_sequence_number] {
                if *seq == UNASSIGNED_SEQUENCE_NUMBER {
                    if manifest.added_snapshot_id != self.snapshot_id {
                        return Err(CodecError::invalid_value(
                            "sequence_number",
                            format!(
                                "unassigned sequence number in manifest {} from snapshot {}",
                                manifest.manifest_path, manifest.added_snapshot_id
                            ),
                        ));
                    }
                    *seq = self.sequence_number;
                }
            }
        }

        let v2 = self.format_version >= 2;
        let count = |value: Option<i32>, field: &str| -> Result<Option<i32>, CodecError> {
            if v2 && value.is_none() {
                return Err(CodecError::UnexpectedNull {
                    field: field.to_string(),
                });
            }
            Ok(value)
        };
        let rows = |value: Option<i64>, field: &str| -> Result<Option<i64>, CodecError> {
            if v2 && value.is_none() {
                return Err(CodecError::UnexpectedNull {
                    field: field.to_string(),
                });
            }
            Ok(value)
        };
        let added_files = count(manifest.added_files_count, "added_files_count")?;
        let existing_files = count(manifest.existing_files_count, "existing_files_count")?;
        let deleted_files = count(manifest.deleted_files_count, "deleted_files_count")?;
        let added_rows = rows(manifest.added_rows_count, "added_rows_count")?;
        let existing_rows = rows(manifest.existing_rows_count, "existing_rows_count")?;
        let deleted_rows = rows(manifest.deleted_rows_count, "deleted_rows_count")?;

        self.writer.append(|e| {
            e.write_str(&manifest.manifest_path);
            e.write_long(manifest.manifest_length);
            e.write_int(manifest.partition_spec_id);
            if v2 {
                e.write_int(manifest.content.id());
                e.write_long(sequence_number);
                e.write_long(min_sequence_number);
                e.write_long(manifest.added_snapshot_id);
                e.write_int(added_files.unwrap_or_default());
                e.write_int(existing_files.unwrap_or_default());
                e.write_int(deleted_files.unwrap_or_default());
                e.write_long(added_rows.unwrap_or_default());
                e.write_long(existing_rows.unwrap_or_default());
                e.write_long(deleted_rows.unwrap_or_default());
            } else {
                e.write_long(manifest.added_snapshot_id);
                for c in [added_files, existing_files, deleted_files] {
                    e.write_optional(c, |e, v| e.write_int(v));
                }
                for r in [added_rows, existing_rows, deleted_rows] {
                    e.write_optional(r, |e, v| e.write_long(v));
                }
            }
            write_partitions(e, &manifest.partitions);
            e.write_optional(manifest.key_metadata.as_deref(), |e, v| e.write_bytes(v));
        })
    }

    pub fn add_all<'m>(&mut self, manifests: impl IntoIterator<Item = &'m ManifestFile>) -> Result<(), CodecError> {
        for m in manifests {
            self.add(m)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Bytes, CodecError> {
        self.writer.finish()
    }
}

fn write_partitions(e: &mut BinaryEncoder<'_>, partitions: &[FieldSummary]) {
    if partitions.is_empty() {
        e.write_union_index(0);
        return;
    }
    e.write_union_index(1);
    e.write_array(partitions, |e, s| {
        e.write_boolean(s.contains_null);
        e.write_optional(s.contains_nan, |e, v| e.write_boolean(v));
        e.write_optional(s.lower_bound.as_deref(), |e, v| e.write_bytes(v));
        e.write_optional(s.upper_bound.as_deref(), |e, v| e.write_bytes(v));
    });
}

/// Encodes `manifests` as a manifest list without snapshot header values
pub fn encode_manifest_list(manifests: &[ManifestFile], format_version: i32) -> Result<Bytes, CodecError> {
    let snapshot_id = manifests.first().map_or(0, |m| m.added_snapshot_id);
    let mut writer = ManifestListWriter::new(format_version, snapshot_id, None, 0, Codec::Null);
    writer.add_all(manifests)?;
    writer.finish()
}

/// Lazily decodes a manifest list against `reader_schema`
pub fn decode_manifest_list(data: Bytes, reader_schema: &AvroSchema) -> Result<ManifestListReader, CodecError> {
    ManifestListReader::with_reader_schema(data, reader_schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::RecordField;
    use quickcheck::{Arbitrary, Gen};

    fn manifest(i: i64) -> ManifestFile {
        ManifestFile {
            manifest_path: format!("s3://bucket/t/metadata/m{i}.avro"),
            manifest_length: 4096 + i,
            partition_spec_id: 0,
            content: ManifestContent::Data,
            sequence_number: 3,
            min_sequence_number: 1,
            added_snapshot_id: 100 + i,
            added_files_count: Some(2),
            existing_files_count: Some(0),
            deleted_files_count: Some(1),
            added_rows_count: Some(20),
            existing_rows_count: Some(0),
            deleted_rows_count: Some(5),
            partitions: vec![FieldSummary {
                contains_null: false,
                contains_nan: None,
                lower_bound: Some(vec![1, 0, 0, 0]),
                upper_bound: Some(vec![9, 0, 0, 0]),
            }],
            key_metadata: None,
        }
    }

    #[test]
    fn test_v2_roundtrip() {
        let manifests: Vec<_> = (0..3).map(manifest).collect();
        let bytes = encode_manifest_list(&manifests, 2).unwrap();
        let reader = ManifestListReader::open(bytes).unwrap();
        assert_eq!(reader.format_version(), 2);
        let decoded: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, manifests);
    }

    #[test]
    fn test_v1_list_reads_with_defaults() {
        let mut m = manifest(1);
        m.existing_files_count = None;
        let bytes = encode_manifest_list(std::slice::from_ref(&m), 1).unwrap();
        let decoded: Vec<_> = ManifestListReader::open(bytes)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].sequence_number, 0);
        assert_eq!(decoded[0].min_sequence_number, 0);
        assert_eq!(decoded[0].content, ManifestContent::Data);
        assert_eq!(decoded[0].existing_files_count, None);
        assert_eq!(decoded[0].manifest_path, m.manifest_path);
    }

    #[test]
    fn test_v1_list_takes_reader_defaults() {
        let m = manifest(2);
        let bytes = encode_manifest_list(std::slice::from_ref(&m), 1).unwrap();

        let mut fields = match manifest_list_schema(2) {
            AvroSchema::Record(r) => r.fields,
            other => panic!("unexpected schema {other:?}"),
        };
        for f in &mut fields {
            match f.field_id {
                Some(515) => f.default = Some(serde_json::json!(7)),
                Some(517) => f.default = Some(serde_json::json!(1)),
                _ => {}
            }
        }
        let reader_schema = AvroSchema::record("manifest_file", fields);

        let mut reader = decode_manifest_list(bytes, &reader_schema).unwrap();
        let mut entry = ManifestFile::default();
        assert!(reader.next_into(&mut entry).unwrap());
        assert_eq!(entry.sequence_number, 7);
        assert_eq!(entry.min_sequence_number, 0);
        assert_eq!(entry.content, ManifestContent::Deletes);
        assert_eq!(entry.added_snapshot_id, m.added_snapshot_id);
        assert!(!reader.next_into(&mut entry).unwrap());
    }

    #[test]
    fn test_unassigned_sequence_numbers_are_filled() {
        let mut m = manifest(0);
        m.sequence_number = UNASSIGNED_SEQUENCE_NUMBER;
        m.min_sequence_number = UNASSIGNED_SEQUENCE_NUMBER;
        let mut w = ManifestListWriter::new(2, 100, Some(99), 8, Codec::Null);
        w.add(&m).unwrap();
        let reader = ManifestListReader::open(w.finish().unwrap()).unwrap();
        assert_eq!(reader.snapshot_id(), Some(100));
        let decoded: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded[0].sequence_number, 8);
        assert_eq!(decoded[0].min_sequence_number, 8);

        // a manifest from another snapshot must already have its number
        let mut other = manifest(5);
        other.sequence_number = UNASSIGNED_SEQUENCE_NUMBER;
        let mut w = ManifestListWriter::new(2, 100, None, 8, Codec::Null);
        assert!(w.add(&other).is_err());
    }

    #[test]
    fn test_v2_requires_counts() {
        let mut m = manifest(0);
        m.added_rows_count = None;
        assert_eq!(
            encode_manifest_list(&[m], 2),
            Err(CodecError::UnexpectedNull {
                field: "added_rows_count".into()
            })
        );
    }

    #[test]
    fn test_projection_skips_unrequested_fields() {
        let manifests: Vec<_> = (0..2).map(manifest).collect();
        let bytes = encode_manifest_list(&manifests, 2).unwrap();
        let projection = AvroSchema::record(
            "manifest_file",
            vec![
                RecordField::required(500, "manifest_path", AvroSchema::String),
                RecordField::required(503, "added_snapshot_id", AvroSchema::Long),
            ],
        );
        let decoded: Vec<_> = decode_manifest_list(bytes, &projection)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded[1].manifest_path, manifests[1].manifest_path);
        assert_eq!(decoded[1].added_snapshot_id, 101);
        assert!(decoded[1].partitions.is_empty());
        assert_eq!(decoded[1].added_files_count, None);
    }

    #[test]
    fn test_next_into_reuses_entry() {
        let manifests: Vec<_> = (0..4).map(manifest).collect();
        let bytes = encode_manifest_list(&manifests, 2).unwrap();
        let mut reader = ManifestListReader::open(bytes).unwrap();
        let mut entry = ManifestFile::default();
        let mut seen = 0;
        while reader.next_into(&mut entry).unwrap() {
            assert_eq!(entry, manifests[seen]);
            seen += 1;
        }
        assert_eq!(seen, 4);
    }

    #[derive(Debug, Clone)]
    struct Manifests(Vec<ManifestFile>);

    impl Arbitrary for Manifests {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 8 + 1;
            let manifests = (0..len)
                .map(|_| ManifestFile {
                    manifest_path: String::arbitrary(g),
                    manifest_length: i64::arbitrary(g),
                    partition_spec_id: i32::arbitrary(g),
                    content: if bool::arbitrary(g) {
                        ManifestContent::Data
                    } else {
                        ManifestContent::Deletes
                    },
                    sequence_number: i64::arbitrary(g).max(0),
                    min_sequence_number: i64::arbitrary(g).max(0),
                    added_snapshot_id: i64::arbitrary(g),
                    added_files_count: Some(i32::arbitrary(g)),
                    existing_files_count: Some(i32::arbitrary(g)),
                    deleted_files_count: Some(i32::arbitrary(g)),
                    added_rows_count: Some(i64::arbitrary(g)),
                    existing_rows_count: Some(i64::arbitrary(g)),
                    deleted_rows_count: Some(i64::arbitrary(g)),
                    partitions: Vec::<(bool, Option<bool>, Option<Vec<u8>>)>::arbitrary(g)
                        .into_iter()
                        .map(|(contains_null, contains_nan, bound)| FieldSummary {
                            contains_null,
                            contains_nan,
                            lower_bound: bound.clone(),
                            upper_bound: bound,
                        })
                        .collect(),
                    key_metadata: Option::<Vec<u8>>::arbitrary(g),
                })
                .collect();
            Manifests(manifests)
        }
    }

    quickcheck! {
        fn prop_manifest_list_roundtrip(manifests: Manifests) -> bool {
            let bytes = match encode_manifest_list(&manifests.0, 2) {
                Ok(b) => b,
                Err(_) => return false,
            };
            let decoded: Result<Vec<_>, _> = match ManifestListReader::open(bytes) {
                Ok(r) => r.collect(),
                Err(_) => return false,
            };
            decoded.map(|d| d == manifests.0).unwrap_or(false)
        }
    }
}
