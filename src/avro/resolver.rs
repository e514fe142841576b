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

//! Writer/reader schema resolution
//!
//! A [`RecordPlan`] is compiled once per file from the writer schema found in
//! the container header and the reader schema the caller expects. Decoding a
//! record then walks the plan's steps in writer order: matched fields are
//! handed to the caller by reader field id, unmatched writer fields are
//! skipped. Reader fields the writer never wrote are returned after the
//! record as [`FieldDefault`]s carrying the reader schema's default value.
//!
//! Fields are matched by `field-id`. When either side lacks an id the
//! match falls back to the field name.
//!
//! Supported promotions: `int` to `long`, `float` or `double`; `long` to
//! `float` or `double`; `float` to `double`; `string` and `bytes` either way.

use super::decoder::BinaryDecoder;
use super::schema::{AvroSchema, RecordField, RecordSchema};
use crate::error::CodecError;
use serde_json::Value;

/// Numeric encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumberKind {
    Int,
    Long,
    Float,
    Double,
}

/// A writer type resolved against the reader type it feeds
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Null,
    Boolean,
    Number {
        writer: NumberKind,
        reader: NumberKind,
    },
    /// `string` or `bytes`; the wire encoding is identical
    Binary,
    Fixed(usize),
    /// Writer union; `None` marks the null branch
    Union(Vec<Option<Resolved>>),
    Record(RecordPlan),
    Array(Box<Resolved>),
    /// String-keyed map; values resolved
    Map(Box<Resolved>),
}

/// One writer field of a compiled record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStep {
    /// Value feeds reader field `field_id` (or position `pos` when the reader has no ids)
    Read {
        field_id: i32,
        pos: usize,
        resolved: Resolved,
    },
    /// Value has no reader counterpart
    Skip(AvroSchema),
}

/// Reader field absent from the writer schema, with the value it takes
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefault {
    pub field_id: i32,
    pub name: String,
    /// JSON default from the reader schema; `null` for nullable fields without one
    pub value: Value,
}

impl FieldDefault {
    fn mismatch(&self, expected: &str) -> CodecError {
        CodecError::invalid_value(
            self.name.as_str(),
            format!("default {} is not a {expected}", self.value),
        )
    }

    pub fn as_long(&self) -> Result<Option<i64>, CodecError> {
        match &self.value {
            Value::Null => Ok(None),
            v => v.as_i64().map(Some).ok_or_else(|| self.mismatch("long")),
        }
    }

    pub fn as_int(&self) -> Result<Option<i32>, CodecError> {
        match self.as_long() {
            Ok(Some(v)) => i32::try_from(v).map(Some).map_err(|_| self.mismatch("int")),
            Ok(None) => Ok(None),
            Err(_) => Err(self.mismatch("int")),
        }
    }

    pub fn as_boolean(&self) -> Result<Option<bool>, CodecError> {
        match &self.value {
            Value::Null => Ok(None),
            v => v.as_bool().map(Some).ok_or_else(|| self.mismatch("boolean")),
        }
    }

    pub fn as_str(&self) -> Result<Option<&str>, CodecError> {
        match &self.value {
            Value::Null => Ok(None),
            v => v.as_str().map(Some).ok_or_else(|| self.mismatch("string")),
        }
    }

    /// Bytes defaults are JSON strings whose code points are the byte values
    pub fn as_bytes(&self) -> Result<Option<Vec<u8>>, CodecError> {
        let Some(s) = self.as_str().map_err(|_| self.mismatch("bytes"))? else {
            return Ok(None);
        };
        s.chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| self.mismatch("bytes")))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Compiled decoding plan for one record type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPlan {
    steps: Vec<FieldStep>,
    defaults: Vec<FieldDefault>,
}

impl RecordPlan {
    /// Compiles the plan for reading `writer` records as `reader` records
    pub fn compile(writer: &AvroSchema, reader: &AvroSchema) -> Result<Self, CodecError> {
        match (writer, reader) {
            (AvroSchema::Record(w), AvroSchema::Record(r)) => compile_record(w, r),
            _ => Err(CodecError::IncompatibleTypes {
                field: "<root>".into(),
                writer: writer.type_name(),
                reader: reader.type_name(),
            }),
        }
    }

    pub fn steps(&self) -> &[FieldStep] {
        &self.steps
    }

    /// Reader fields the writer did not write
    pub fn defaults(&self) -> &[FieldDefault] {
        &self.defaults
    }

    /// Decodes one record, handing each matched field to `on_field`
    ///
    /// `on_field` must consume exactly one value from the decoder, either by
    /// reading it through the supplied [`Resolved`] or by calling
    /// [`Resolved::skip`]. Returns the defaults the caller applies for the
    /// fields the writer did not write.
    pub fn read<'a>(
        &self,
        d: &mut BinaryDecoder<'a>,
        mut on_field: impl FnMut(i32, &Resolved, &mut BinaryDecoder<'a>) -> Result<(), CodecError>,
    ) -> Result<&[FieldDefault], CodecError> {
        for step in &self.steps {
            match step {
                FieldStep::Read {
                    field_id, resolved, ..
                } => on_field(*field_id, resolved, d)?,
                FieldStep::Skip(schema) => d.skip(schema)?,
            }
        }
        Ok(&self.defaults)
    }

    /// Skips one record
    pub fn skip(&self, d: &mut BinaryDecoder<'_>) -> Result<(), CodecError> {
        self.read(d, |_, resolved, d| resolved.skip(d)).map(|_| ())
    }
}

fn field_key(field: &RecordField, pos: usize) -> i32 {
    field.field_id.unwrap_or(-(pos as i32) - 1)
}

fn compile_record(writer: &RecordSchema, reader: &RecordSchema) -> Result<RecordPlan, CodecError> {
    let mut matched = vec![false; reader.fields.len()];
    let mut steps = Vec::with_capacity(writer.fields.len());

    for w in &writer.fields {
        let found = reader.fields.iter().enumerate().find(|(i, r)| {
            !matched[*i]
                && match (w.field_id, r.field_id) {
                    (Some(wid), Some(rid)) => wid == rid,
                    _ => w.name == r.name,
                }
        });
        match found {
            Some((pos, r)) => {
                matched[pos] = true;
                steps.push(FieldStep::Read {
                    field_id: field_key(r, pos),
                    pos,
                    resolved: resolve(&w.schema, &r.schema, &r.name)?,
                });
            }
            None => steps.push(FieldStep::Skip(w.schema.clone())),
        }
    }

    let mut defaults = Vec::new();
    for (pos, r) in reader.fields.iter().enumerate() {
        if matched[pos] {
            continue;
        }
        if !r.has_default() {
            return Err(CodecError::MissingRequiredField {
                name: r.name.clone(),
                field_id: r.field_id,
            });
        }
        defaults.push(FieldDefault {
            field_id: field_key(r, pos),
            name: r.name.clone(),
            value: r.default.clone().unwrap_or(Value::Null),
        });
    }

    Ok(RecordPlan { steps, defaults })
}

fn number_kind(schema: &AvroSchema) -> Option<NumberKind> {
    match schema {
        AvroSchema::Int | AvroSchema::Date => Some(NumberKind::Int),
        AvroSchema::Long | AvroSchema::TimeMicros | AvroSchema::TimestampMicros { .. } => {
            Some(NumberKind::Long)
        }
        AvroSchema::Float => Some(NumberKind::Float),
        AvroSchema::Double => Some(NumberKind::Double),
        _ => None,
    }
}

fn fixed_size(schema: &AvroSchema) -> Option<usize> {
    match schema {
        AvroSchema::Fixed(f) => Some(f.size),
        AvroSchema::Decimal(d) => Some(d.size),
        AvroSchema::Uuid => Some(16),
        _ => None,
    }
}

fn incompatible(field: &str, writer: &AvroSchema, reader: &AvroSchema) -> CodecError {
    CodecError::IncompatibleTypes {
        field: field.to_string(),
        writer: writer.type_name(),
        reader: reader.type_name(),
    }
}

/// Resolves a writer type against a reader type
pub fn resolve(writer: &AvroSchema, reader: &AvroSchema, field: &str) -> Result<Resolved, CodecError> {
    // Reader unions are only the nullable kind
    if let AvroSchema::Union(_) = reader {
        let target = reader.non_null();
        if matches!(target, AvroSchema::Union(_)) {
            return Err(incompatible(field, writer, reader));
        }
        return match writer {
            AvroSchema::Null => Ok(Resolved::Null),
            _ => resolve(writer, target, field),
        };
    }

    if let AvroSchema::Union(branches) = writer {
        let resolved = branches
            .iter()
            .map(|b| match b {
                AvroSchema::Null => Ok(None),
                other => resolve(other, reader, field).map(Some),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Resolved::Union(resolved));
    }

    if let (Some(w), Some(r)) = (number_kind(writer), number_kind(reader)) {
        let promotable = w == r
            || matches!(
                (w, r),
                (NumberKind::Int, _) | (NumberKind::Long, NumberKind::Float | NumberKind::Double)
                    | (NumberKind::Float, NumberKind::Double)
            );
        return if promotable {
            Ok(Resolved::Number {
                writer: w,
                reader: r,
            })
        } else {
            Err(incompatible(field, writer, reader))
        };
    }

    if let (Some(w), Some(r)) = (fixed_size(writer), fixed_size(reader)) {
        return if w == r {
            Ok(Resolved::Fixed(w))
        } else {
            Err(incompatible(field, writer, reader))
        };
    }

    match (writer, reader) {
        (AvroSchema::Null, AvroSchema::Null) => Ok(Resolved::Null),
        (AvroSchema::Boolean, AvroSchema::Boolean) => Ok(Resolved::Boolean),
        (AvroSchema::Bytes | AvroSchema::String, AvroSchema::Bytes | AvroSchema::String) => {
            Ok(Resolved::Binary)
        }
        (AvroSchema::Record(w), AvroSchema::Record(r)) => Ok(Resolved::Record(compile_record(w, r)?)),
        (AvroSchema::Array(w), AvroSchema::Array(r)) => {
            Ok(Resolved::Array(Box::new(resolve(&w.items, &r.items, field)?)))
        }
        (AvroSchema::Map(w), AvroSchema::Map(r)) => {
            Ok(Resolved::Map(Box::new(resolve(&w.values, &r.values, field)?)))
        }
        _ => Err(incompatible(field, writer, reader)),
    }
}

fn unexpected(field: &str, expected: &str, found: &Resolved) -> CodecError {
    CodecError::invalid_value(field, format!("expected {expected}, found {found:?}"))
}

impl Resolved {
    /// Selects the union branch, if any; `None` means the value is null
    pub fn branch<'r>(&'r self, d: &mut BinaryDecoder<'_>) -> Result<Option<&'r Resolved>, CodecError> {
        match self {
            Resolved::Union(branches) => {
                let index = d.read_union_index(branches.len())?;
                Ok(branches[index].as_ref())
            }
            Resolved::Null => Ok(None),
            other => Ok(Some(other)),
        }
    }

    fn read_number_i64(writer: NumberKind, d: &mut BinaryDecoder<'_>) -> Result<i64, CodecError> {
        match writer {
            NumberKind::Int => d.read_int().map(i64::from),
            NumberKind::Long => d.read_long(),
            NumberKind::Float | NumberKind::Double => Err(CodecError::invalid_value(
                "number",
                "floating point value read as integer",
            )),
        }
    }

    pub fn read_long(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<i64>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Number { writer, .. }) => Self::read_number_i64(*writer, d).map(Some),
            Some(other) => Err(unexpected(field, "long", other)),
        }
    }

    pub fn read_int(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<i32>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Number {
                writer: NumberKind::Int,
                ..
            }) => d.read_int().map(Some),
            Some(other) => Err(unexpected(field, "int", other)),
        }
    }

    pub fn read_double(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<f64>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Number { writer, .. }) => match writer {
                NumberKind::Int => d.read_int().map(|v| Some(f64::from(v))),
                NumberKind::Long => d.read_long().map(|v| Some(v as f64)),
                NumberKind::Float => d.read_float().map(|v| Some(f64::from(v))),
                NumberKind::Double => d.read_double().map(Some),
            },
            Some(other) => Err(unexpected(field, "double", other)),
        }
    }

    pub fn read_float(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<f32>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Number { writer, .. }) => match writer {
                NumberKind::Int => d.read_int().map(|v| Some(v as f32)),
                NumberKind::Long => d.read_long().map(|v| Some(v as f32)),
                NumberKind::Float => d.read_float().map(Some),
                NumberKind::Double => Err(unexpected(field, "float", self)),
            },
            Some(other) => Err(unexpected(field, "float", other)),
        }
    }

    pub fn read_boolean(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<bool>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Boolean) => d.read_boolean().map(Some),
            Some(other) => Err(unexpected(field, "boolean", other)),
        }
    }

    pub fn read_str<'a>(&self, d: &mut BinaryDecoder<'a>, field: &str) -> Result<Option<&'a str>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Binary) => d.read_str().map(Some),
            Some(other) => Err(unexpected(field, "string", other)),
        }
    }

    pub fn read_string(&self, d: &mut BinaryDecoder<'_>, field: &str) -> Result<Option<String>, CodecError> {
        Ok(self.read_str(d, field)?.map(str::to_string))
    }

    /// Bytes or fixed value, borrowed from the input
    pub fn read_bytes<'a>(&self, d: &mut BinaryDecoder<'a>, field: &str) -> Result<Option<&'a [u8]>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Binary) => d.read_bytes().map(Some),
            Some(Resolved::Fixed(size)) => d.read_fixed(*size).map(Some),
            Some(other) => Err(unexpected(field, "bytes", other)),
        }
    }

    /// Decodes a nested record
    ///
    /// Returns `None` when the value is null, otherwise the record's
    /// defaulted fields as [`RecordPlan::read`] does.
    pub fn read_record<'a>(
        &self,
        d: &mut BinaryDecoder<'a>,
        field: &str,
        on_field: impl FnMut(i32, &Resolved, &mut BinaryDecoder<'a>) -> Result<(), CodecError>,
    ) -> Result<Option<&[FieldDefault]>, CodecError> {
        match self.branch(d)? {
            None => Ok(None),
            Some(Resolved::Record(plan)) => plan.read(d, on_field).map(Some),
            Some(other) => Err(unexpected(field, "record", other)),
        }
    }

    /// Decodes every item of an array; returns false when the value is null
    pub fn read_array<'a>(
        &self,
        d: &mut BinaryDecoder<'a>,
        field: &str,
        mut on_item: impl FnMut(&Resolved, &mut BinaryDecoder<'a>) -> Result<(), CodecError>,
    ) -> Result<bool, CodecError> {
        match self.branch(d)? {
            None => Ok(false),
            Some(Resolved::Array(items)) => {
                loop {
                    let count = d.read_block_count()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        on_item(items, d)?;
                    }
                }
                Ok(true)
            }
            Some(other) => Err(unexpected(field, "array", other)),
        }
    }

    /// Skips one value
    pub fn skip(&self, d: &mut BinaryDecoder<'_>) -> Result<(), CodecError> {
        let Some(value) = self.branch(d)? else {
            return Ok(());
        };
        match value {
            Resolved::Null => Ok(()),
            Resolved::Boolean => d.read_boolean().map(|_| ()),
            Resolved::Number { writer, .. } => match writer {
                NumberKind::Int | NumberKind::Long => d.read_long().map(|_| ()),
                NumberKind::Float => d.read_float().map(|_| ()),
                NumberKind::Double => d.read_double().map(|_| ()),
            },
            Resolved::Binary => d.read_bytes().map(|_| ()),
            Resolved::Fixed(size) => d.read_fixed(*size).map(|_| ()),
            Resolved::Union(_) => Err(CodecError::invalid_value("union", "nested unions are not supported")),
            Resolved::Record(plan) => plan.skip(d),
            Resolved::Array(items) => loop {
                let count = d.read_block_count()?;
                if count == 0 {
                    return Ok(());
                }
                for _ in 0..count {
                    items.skip(d)?;
                }
            },
            Resolved::Map(values) => loop {
                let count = d.read_block_count()?;
                if count == 0 {
                    return Ok(());
                }
                for _ in 0..count {
                    d.read_bytes()?;
                    values.skip(d)?;
                }
            },
        }
    }
}

/// Unwraps a decoded value the reader requires
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, CodecError> {
    value.ok_or_else(|| CodecError::UnexpectedNull {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::encoder::BinaryEncoder;
    use serde_json::json;

    fn writer_schema() -> AvroSchema {
        AvroSchema::record(
            "entry",
            vec![
                RecordField::required(1, "id", AvroSchema::Int),
                RecordField::required(2, "name", AvroSchema::String),
                RecordField::optional(3, "legacy", AvroSchema::Double),
                RecordField::optional(4, "score", AvroSchema::Float),
            ],
        )
    }

    fn default_ids(plan: &RecordPlan) -> Vec<i32> {
        plan.defaults().iter().map(|f| f.field_id).collect()
    }

    fn write_row(buf: &mut Vec<u8>, id: i32, name: &str) {
        let mut e = BinaryEncoder::new(buf);
        e.write_int(id);
        e.write_str(name);
        e.write_optional(Some(1.5f64), |e, v| e.write_double(v));
        e.write_optional(Some(0.25f32), |e, v| e.write_float(v));
    }

    #[test]
    fn test_match_by_id_with_renames_and_promotion() {
        let reader = AvroSchema::record(
            "entry",
            vec![
                RecordField::optional(4, "score_renamed", AvroSchema::Double),
                RecordField::required(1, "key", AvroSchema::Long),
                RecordField::required(2, "label", AvroSchema::Bytes),
                RecordField::optional(9, "added_later", AvroSchema::String),
            ],
        );
        let plan = RecordPlan::compile(&writer_schema(), &reader).unwrap();
        assert_eq!(default_ids(&plan), [9]);
        assert!(matches!(plan.steps()[2], FieldStep::Skip(_)));

        let mut buf = Vec::new();
        write_row(&mut buf, 7, "seven");
        let mut d = BinaryDecoder::new(&buf);

        let (mut key, mut label, mut score, mut added) = (0i64, Vec::new(), None, None::<String>);
        plan.read(&mut d, |id, r, d| {
            match id {
                1 => key = required(r.read_long(d, "key")?, "key")?,
                2 => label = required(r.read_bytes(d, "label")?, "label")?.to_vec(),
                4 => score = r.read_double(d, "score")?,
                9 => added = r.read_string(d, "added_later")?,
                _ => r.skip(d)?,
            }
            Ok(())
        })
        .unwrap();

        assert!(d.is_empty());
        assert_eq!(key, 7);
        assert_eq!(label, b"seven");
        assert_eq!(score, Some(0.25));
        assert_eq!(added, None);
    }

    #[test]
    fn test_missing_required_field_without_default() {
        let reader = AvroSchema::record(
            "entry",
            vec![
                RecordField::required(1, "id", AvroSchema::Int),
                RecordField::required(10, "content", AvroSchema::Int),
            ],
        );
        let err = RecordPlan::compile(&writer_schema(), &reader).unwrap_err();
        assert_eq!(
            err,
            CodecError::MissingRequiredField {
                name: "content".into(),
                field_id: Some(10)
            }
        );

        let reader = AvroSchema::record(
            "entry",
            vec![
                RecordField::required(1, "id", AvroSchema::Int),
                RecordField::required(10, "content", AvroSchema::Int).with_default(json!(0)),
            ],
        );
        let plan = RecordPlan::compile(&writer_schema(), &reader).unwrap();
        assert_eq!(default_ids(&plan), [10]);
    }

    #[test]
    fn test_defaults_are_returned_with_their_values() {
        let reader = AvroSchema::record(
            "entry",
            vec![
                RecordField::required(1, "id", AvroSchema::Int),
                RecordField::required(10, "sequence", AvroSchema::Long).with_default(json!(7)),
                RecordField::optional(11, "note", AvroSchema::String),
                RecordField::required(12, "tag", AvroSchema::Bytes).with_default(json!("\u{ff}\u{1}")),
            ],
        );
        let plan = RecordPlan::compile(&writer_schema(), &reader).unwrap();

        let mut buf = Vec::new();
        write_row(&mut buf, 3, "three");
        let mut d = BinaryDecoder::new(&buf);
        let mut id = 0;
        let defaults = plan
            .read(&mut d, |field, r, d| {
                if field == 1 {
                    id = required(r.read_int(d, "id")?, "id")?;
                } else {
                    r.skip(d)?;
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(id, 3);
        assert!(d.is_empty());
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[0].as_long(), Ok(Some(7)));
        assert_eq!(defaults[0].as_int(), Ok(Some(7)));
        assert_eq!(defaults[1].as_str(), Ok(None));
        assert_eq!(defaults[2].as_bytes(), Ok(Some(vec![0xff, 0x01])));
        assert!(defaults[0].as_boolean().is_err());
    }

    #[test]
    fn test_incompatible_types() {
        let reader = AvroSchema::record(
            "entry",
            vec![RecordField::required(2, "name", AvroSchema::Long)],
        );
        assert!(matches!(
            RecordPlan::compile(&writer_schema(), &reader),
            Err(CodecError::IncompatibleTypes { .. })
        ));

        // long cannot narrow to int
        let writer = AvroSchema::record("r", vec![RecordField::required(1, "v", AvroSchema::Long)]);
        let reader = AvroSchema::record("r", vec![RecordField::required(1, "v", AvroSchema::Int)]);
        assert!(RecordPlan::compile(&writer, &reader).is_err());
    }

    #[test]
    fn test_name_fallback_without_ids() {
        let mut writer_field = RecordField::required(0, "v", AvroSchema::Int);
        writer_field.field_id = None;
        let writer = AvroSchema::record("r", vec![writer_field]);
        let reader = AvroSchema::record("r", vec![RecordField::required(5, "v", AvroSchema::Long)]);
        let plan = RecordPlan::compile(&writer, &reader).unwrap();
        assert!(matches!(plan.steps()[0], FieldStep::Read { field_id: 5, .. }));
    }

    #[test]
    fn test_null_for_required_reader_field() {
        let writer = AvroSchema::record("r", vec![RecordField::optional(1, "v", AvroSchema::Long)]);
        let reader = AvroSchema::record("r", vec![RecordField::required(1, "v", AvroSchema::Long)]);
        let plan = RecordPlan::compile(&writer, &reader).unwrap();

        let mut buf = Vec::new();
        BinaryEncoder::new(&mut buf).write_union_index(0);
        let mut d = BinaryDecoder::new(&buf);
        let result = plan.read(&mut d, |_, r, d| {
            required(r.read_long(d, "v")?, "v")?;
            Ok(())
        });
        assert_eq!(
            result,
            Err(CodecError::UnexpectedNull { field: "v".into() })
        );
    }

    #[test]
    fn test_skip_whole_record_plan() {
        let plan = RecordPlan::compile(&writer_schema(), &writer_schema()).unwrap();
        let mut buf = Vec::new();
        write_row(&mut buf, 1, "a");
        write_row(&mut buf, 2, "b");
        let mut d = BinaryDecoder::new(&buf);
        plan.skip(&mut d).unwrap();
        let mut second = 0;
        plan.read(&mut d, |id, r, d| {
            if id == 1 {
                second = required(r.read_int(d, "id")?, "id")?;
            } else {
                r.skip(d)?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(second, 2);
    }
}
