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

//! Avro schema model
//!
//! Covers the subset of Avro used by Iceberg manifests, including the
//! Iceberg-specific attributes `field-id`, `element-id`, `key-id` and
//! `value-id`. Maps with non-string keys are written as arrays of key/value
//! records tagged with `"logicalType": "map"`.

use crate::error::CodecError;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Avro schema node
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// `int` with logical type `date`
    Date,
    /// `long` with logical type `time-micros`
    TimeMicros,
    /// `long` with logical type `timestamp-micros`
    TimestampMicros {
        /// Iceberg `adjust-to-utc` attribute, true for `timestamptz`
        adjust_to_utc: bool,
    },
    Fixed(FixedSchema),
    /// `fixed` with logical type `decimal`
    Decimal(DecimalSchema),
    /// `fixed[16]` with logical type `uuid`
    Uuid,
    Array(Box<ArraySchema>),
    Map(Box<MapSchema>),
    Union(Vec<AvroSchema>),
    Record(Box<RecordSchema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecimalSchema {
    pub name: String,
    pub precision: u32,
    pub scale: u32,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: AvroSchema,
    pub element_id: Option<i32>,
    /// Array of key/value records standing in for a map with non-string keys
    pub logical_map: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSchema {
    pub values: AvroSchema,
    pub key_id: Option<i32>,
    pub value_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<RecordField>,
}

/// Field of an Avro record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: AvroSchema,
    /// Iceberg field id
    pub field_id: Option<i32>,
    /// Default used when the writer did not write this field
    pub default: Option<Value>,
    pub doc: Option<String>,
}

impl RecordField {
    /// Required field with an id
    pub fn required(field_id: i32, name: &str, schema: AvroSchema) -> Self {
        RecordField {
            name: name.to_string(),
            schema,
            field_id: Some(field_id),
            default: None,
            doc: None,
        }
    }

    /// Nullable field with an id; defaults to null
    pub fn optional(field_id: i32, name: &str, schema: AvroSchema) -> Self {
        RecordField {
            name: name.to_string(),
            schema: AvroSchema::optional(schema),
            field_id: Some(field_id),
            default: Some(Value::Null),
            doc: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// True when a missing writer field can be filled in
    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.schema.is_nullable()
    }
}

impl RecordSchema {
    pub fn new(name: &str, fields: Vec<RecordField>) -> Self {
        RecordSchema {
            name: name.to_string(),
            fields,
        }
    }

    pub fn field_by_id(&self, field_id: i32) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.field_id == Some(field_id))
    }

    pub fn field_by_name(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl AvroSchema {
    /// Wraps `inner` in a `["null", inner]` union
    pub fn optional(inner: AvroSchema) -> Self {
        match inner {
            AvroSchema::Union(_) | AvroSchema::Null => inner,
            other => AvroSchema::Union(vec![AvroSchema::Null, other]),
        }
    }

    pub fn record(name: &str, fields: Vec<RecordField>) -> Self {
        AvroSchema::Record(Box::new(RecordSchema::new(name, fields)))
    }

    pub fn array(element_id: i32, items: AvroSchema) -> Self {
        AvroSchema::Array(Box::new(ArraySchema {
            items,
            element_id: Some(element_id),
            logical_map: false,
        }))
    }

    /// Iceberg map with non-string keys: array of `k<key>_v<value>` records
    pub fn int_keyed_map(key_id: i32, key: AvroSchema, value_id: i32, value: AvroSchema) -> Self {
        let entry = AvroSchema::record(
            &format!("k{key_id}_v{value_id}"),
            vec![
                RecordField::required(key_id, "key", key),
                RecordField::required(value_id, "value", value),
            ],
        );
        AvroSchema::Array(Box::new(ArraySchema {
            items: entry,
            element_id: None,
            logical_map: true,
        }))
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            AvroSchema::Null => true,
            AvroSchema::Union(branches) => branches.iter().any(|b| matches!(b, AvroSchema::Null)),
            _ => false,
        }
    }

    /// The non-null branch of a `["null", T]` union, or `self`
    pub fn non_null(&self) -> &AvroSchema {
        if let AvroSchema::Union(branches) = self {
            let mut rest = branches.iter().filter(|b| !matches!(b, AvroSchema::Null));
            if let (Some(only), None) = (rest.next(), rest.next()) {
                return only;
            }
        }
        self
    }

    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            AvroSchema::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the type, used in error messages
    pub fn type_name(&self) -> String {
        match self {
            AvroSchema::Null => "null".into(),
            AvroSchema::Boolean => "boolean".into(),
            AvroSchema::Int => "int".into(),
            AvroSchema::Long => "long".into(),
            AvroSchema::Float => "float".into(),
            AvroSchema::Double => "double".into(),
            AvroSchema::Bytes => "bytes".into(),
            AvroSchema::String => "string".into(),
            AvroSchema::Date => "date".into(),
            AvroSchema::TimeMicros => "time-micros".into(),
            AvroSchema::TimestampMicros { .. } => "timestamp-micros".into(),
            AvroSchema::Fixed(f) => format!("fixed[{}]", f.size),
            AvroSchema::Decimal(d) => format!("decimal({},{})", d.precision, d.scale),
            AvroSchema::Uuid => "uuid".into(),
            AvroSchema::Array(_) => "array".into(),
            AvroSchema::Map(_) => "map".into(),
            AvroSchema::Union(b) => {
                let names: Vec<String> = b.iter().map(|s| s.type_name()).collect();
                format!("union<{}>", names.join(","))
            }
            AvroSchema::Record(r) => format!("record {}", r.name),
        }
    }

    /// Parses an Avro schema from its JSON text
    pub fn parse_str(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::invalid_schema(format!("schema is not JSON: {e}")))?;
        Self::parse(&value)
    }

    /// Parses an Avro schema from a JSON value
    pub fn parse(value: &Value) -> Result<Self, CodecError> {
        Parser::default().parse(value)
    }

    /// Renders the schema as JSON; named types repeat by reference
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(&self, seen: &mut HashSet<String>) -> Value {
        match self {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),
            AvroSchema::Date => json!({"type": "int", "logicalType": "date"}),
            AvroSchema::TimeMicros => json!({"type": "long", "logicalType": "time-micros"}),
            AvroSchema::TimestampMicros { adjust_to_utc } => json!({
                "type": "long",
                "logicalType": "timestamp-micros",
                "adjust-to-utc": adjust_to_utc,
            }),
            AvroSchema::Fixed(f) => {
                if !seen.insert(f.name.clone()) {
                    return json!(f.name);
                }
                json!({"type": "fixed", "name": f.name, "size": f.size})
            }
            AvroSchema::Decimal(d) => {
                if !seen.insert(d.name.clone()) {
                    return json!(d.name);
                }
                json!({
                    "type": "fixed",
                    "name": d.name,
                    "size": d.size,
                    "logicalType": "decimal",
                    "precision": d.precision,
                    "scale": d.scale,
                })
            }
            AvroSchema::Uuid => {
                if !seen.insert("uuid_fixed".to_string()) {
                    return json!("uuid_fixed");
                }
                json!({"type": "fixed", "name": "uuid_fixed", "size": 16, "logicalType": "uuid"})
            }
            AvroSchema::Array(a) => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!("array"));
                obj.insert("items".into(), a.items.to_json_inner(seen));
                if let Some(id) = a.element_id {
                    obj.insert("element-id".into(), json!(id));
                }
                if a.logical_map {
                    obj.insert("logicalType".into(), json!("map"));
                }
                Value::Object(obj)
            }
            AvroSchema::Map(m) => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!("map"));
                obj.insert("values".into(), m.values.to_json_inner(seen));
                if let Some(id) = m.key_id {
                    obj.insert("key-id".into(), json!(id));
                }
                if let Some(id) = m.value_id {
                    obj.insert("value-id".into(), json!(id));
                }
                Value::Object(obj)
            }
            AvroSchema::Union(branches) => {
                Value::Array(branches.iter().map(|b| b.to_json_inner(seen)).collect())
            }
            AvroSchema::Record(r) => {
                if !seen.insert(r.name.clone()) {
                    return json!(r.name);
                }
                let fields: Vec<Value> = r
                    .fields
                    .iter()
                    .map(|f| {
                        let mut obj = Map::new();
                        obj.insert("name".into(), json!(f.name));
                        obj.insert("type".into(), f.schema.to_json_inner(seen));
                        if let Some(doc) = &f.doc {
                            obj.insert("doc".into(), json!(doc));
                        }
                        if let Some(default) = &f.default {
                            obj.insert("default".into(), default.clone());
                        }
                        if let Some(id) = f.field_id {
                            obj.insert("field-id".into(), json!(id));
                        }
                        Value::Object(obj)
                    })
                    .collect();
                json!({"type": "record", "name": r.name, "fields": fields})
            }
        }
    }
}

impl fmt::Display for AvroSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Schema parser with a registry of named types seen so far
#[derive(Default)]
struct Parser {
    named: HashMap<String, AvroSchema>,
}

impl Parser {
    fn parse(&mut self, value: &Value) -> Result<AvroSchema, CodecError> {
        match value {
            Value::String(name) => self.parse_name(name),
            Value::Array(branches) => {
                let branches = branches
                    .iter()
                    .map(|b| self.parse(b))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AvroSchema::Union(branches))
            }
            Value::Object(obj) => self.parse_object(obj),
            other => Err(CodecError::invalid_schema(format!(
                "unexpected schema node: {other}"
            ))),
        }
    }

    fn parse_name(&self, name: &str) -> Result<AvroSchema, CodecError> {
        Ok(match name {
            "null" => AvroSchema::Null,
            "boolean" => AvroSchema::Boolean,
            "int" => AvroSchema::Int,
            "long" => AvroSchema::Long,
            "float" => AvroSchema::Float,
            "double" => AvroSchema::Double,
            "bytes" => AvroSchema::Bytes,
            "string" => AvroSchema::String,
            other => {
                let short = other.rsplit('.').next().unwrap_or(other);
                return self
                    .named
                    .get(other)
                    .or_else(|| self.named.get(short))
                    .cloned()
                    .ok_or_else(|| CodecError::invalid_schema(format!("unknown type: {other}")));
            }
        })
    }

    fn register(&mut self, name: &str, schema: &AvroSchema) {
        self.named.insert(name.to_string(), schema.clone());
        if let Some(short) = name.rsplit('.').next() {
            self.named.insert(short.to_string(), schema.clone());
        }
    }

    fn parse_object(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, CodecError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| CodecError::invalid_schema("schema object without 'type'"))?;
        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            nested => return self.parse(nested),
        };
        let logical = obj.get("logicalType").and_then(Value::as_str);

        match type_name {
            "record" | "error" => self.parse_record(obj),
            "array" => {
                let items = self.parse(
                    obj.get("items")
                        .ok_or_else(|| CodecError::invalid_schema("array without 'items'"))?,
                )?;
                Ok(AvroSchema::Array(Box::new(ArraySchema {
                    items,
                    element_id: int_attr(obj, "element-id")?,
                    logical_map: logical == Some("map"),
                })))
            }
            "map" => {
                let values = self.parse(
                    obj.get("values")
                        .ok_or_else(|| CodecError::invalid_schema("map without 'values'"))?,
                )?;
                Ok(AvroSchema::Map(Box::new(MapSchema {
                    values,
                    key_id: int_attr(obj, "key-id")?,
                    value_id: int_attr(obj, "value-id")?,
                })))
            }
            "fixed" => {
                let name = str_attr(obj, "name")?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| CodecError::invalid_schema("fixed without 'size'"))?
                    as usize;
                let schema = match logical {
                    Some("decimal") => AvroSchema::Decimal(DecimalSchema {
                        name: name.clone(),
                        precision: u32_attr(obj, "precision")?.unwrap_or(38),
                        scale: u32_attr(obj, "scale")?.unwrap_or(0),
                        size,
                    }),
                    Some("uuid") if size == 16 => AvroSchema::Uuid,
                    _ => AvroSchema::Fixed(FixedSchema {
                        name: name.clone(),
                        size,
                    }),
                };
                self.register(&name, &schema);
                Ok(schema)
            }
            "enum" => Err(CodecError::invalid_schema("enum types are not supported")),
            "int" if logical == Some("date") => Ok(AvroSchema::Date),
            "long" if logical == Some("time-micros") => Ok(AvroSchema::TimeMicros),
            "long" if logical == Some("timestamp-micros") => Ok(AvroSchema::TimestampMicros {
                adjust_to_utc: obj
                    .get("adjust-to-utc")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            primitive => self.parse_name(primitive),
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, CodecError> {
        let name = str_attr(obj, "name")?;
        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| CodecError::invalid_schema(format!("record {name} without fields")))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field = raw
                .as_object()
                .ok_or_else(|| CodecError::invalid_schema("record field is not an object"))?;
            let field_name = str_attr(field, "name")?;
            let schema = self.parse(
                field
                    .get("type")
                    .ok_or_else(|| CodecError::invalid_schema(format!("field {field_name} without type")))?,
            )?;
            fields.push(RecordField {
                name: field_name,
                schema,
                field_id: int_attr(field, "field-id")?,
                default: field.get("default").cloned(),
                doc: field.get("doc").and_then(Value::as_str).map(str::to_string),
            });
        }
        let schema = AvroSchema::Record(Box::new(RecordSchema {
            name: name.clone(),
            fields,
        }));
        self.register(&name, &schema);
        Ok(schema)
    }
}

fn str_attr(obj: &Map<String, Value>, key: &str) -> Result<String, CodecError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CodecError::invalid_schema(format!("missing '{key}'")))
}

fn int_attr(obj: &Map<String, Value>, key: &str) -> Result<Option<i32>, CodecError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| CodecError::invalid_schema(format!("'{key}' is not an int: {v}"))),
    }
}

fn u32_attr(obj: &Map<String, Value>, key: &str) -> Result<Option<u32>, CodecError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| CodecError::invalid_schema(format!("'{key}' is not a u32: {v}"))),
    }
}
