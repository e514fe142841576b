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

//! Table schemas
//!
//! Every field at every nesting depth (struct fields, list elements, map keys
//! and values) carries a table-wide unique id. Ids are what readers use to
//! match columns across schema versions; names and positions may change.
//!
//! A field id of `0` means "not yet assigned": such fields receive fresh ids
//! from the table's `last-column-id` when the schema is added to a table.

use crate::error::ValidationErr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Placeholder id for fields that have not been assigned one yet
pub const UNASSIGNED_FIELD_ID: i32 = 0;

// ============================================================================
// Types
// ============================================================================

/// Primitive data types
///
/// Serialized as the Iceberg type strings, e.g. `"long"`, `"decimal(9,2)"`,
/// `"fixed[16]"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Boolean value
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE 754 floating point
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// Fixed-point decimal
    Decimal {
        /// Total number of digits
        precision: u32,
        /// Number of digits after decimal point
        scale: u32,
    },
    /// Calendar date (no time component)
    Date,
    /// Time of day in microseconds (no date component)
    Time,
    /// Timestamp in microseconds without timezone
    Timestamp,
    /// Timestamp in microseconds with timezone
    Timestamptz,
    /// Variable-length character string
    String,
    /// UUID
    Uuid,
    /// Fixed-length byte array
    Fixed(u64),
    /// Variable-length byte array
    Binary,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Time => write!(f, "time"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Timestamptz => write!(f, "timestamptz"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Uuid => write!(f, "uuid"),
            PrimitiveType::Fixed(len) => write!(f, "fixed[{len}]"),
            PrimitiveType::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = ValidationErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s {
            "boolean" => PrimitiveType::Boolean,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            "date" => PrimitiveType::Date,
            "time" => PrimitiveType::Time,
            "timestamp" => PrimitiveType::Timestamp,
            "timestamptz" => PrimitiveType::Timestamptz,
            "string" => PrimitiveType::String,
            "uuid" => PrimitiveType::Uuid,
            "binary" => PrimitiveType::Binary,
            other => {
                if let Some(args) = other
                    .strip_prefix("decimal(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    let (p, s) = args
                        .split_once(',')
                        .ok_or_else(|| ValidationErr::invalid(format!("invalid decimal type: {other}")))?;
                    let precision = p
                        .trim()
                        .parse()
                        .map_err(|_| ValidationErr::invalid(format!("invalid decimal precision: {other}")))?;
                    let scale = s
                        .trim()
                        .parse()
                        .map_err(|_| ValidationErr::invalid(format!("invalid decimal scale: {other}")))?;
                    if precision == 0 || precision > 38 {
                        return Err(ValidationErr::invalid(format!(
                            "decimal precision must be in 1..=38: {other}"
                        )));
                    }
                    PrimitiveType::Decimal { precision, scale }
                } else if let Some(len) = other
                    .strip_prefix("fixed[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    PrimitiveType::Fixed(
                        len.trim()
                            .parse()
                            .map_err(|_| ValidationErr::invalid(format!("invalid fixed length: {other}")))?,
                    )
                } else {
                    return Err(ValidationErr::invalid(format!("unknown primitive type: {other}")));
                }
            }
        };
        Ok(parsed)
    }
}

impl Serialize for PrimitiveType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrimitiveType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! type_tag {
    ($name:ident, $tag:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        enum $name {
            #[default]
            #[serde(rename = $tag)]
            Tag,
        }
    };
}

type_tag!(StructTag, "struct");
type_tag!(ListTag, "list");
type_tag!(MapTag, "map");

/// Iceberg field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Type {
    /// Primitive types (int, long, string, etc.)
    Primitive(PrimitiveType),
    /// Struct type with nested fields
    Struct(StructType),
    /// List (array) type
    List(Box<ListType>),
    /// Map (key-value) type
    Map(Box<MapType>),
}

impl Type {
    pub fn as_primitive(&self) -> Option<&PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }
}

impl From<PrimitiveType> for Type {
    fn from(p: PrimitiveType) -> Self {
        Type::Primitive(p)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Struct(_) => write!(f, "struct"),
            Type::List(l) => write!(f, "list<{}>", l.element),
            Type::Map(m) => write!(f, "map<{}, {}>", m.key, m.value),
        }
    }
}

/// Struct type with named fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructType {
    #[serde(rename = "type")]
    tag: StructTag,
    /// Fields in the struct
    pub fields: Vec<NestedField>,
}

impl StructType {
    pub fn new(fields: Vec<NestedField>) -> Self {
        StructType {
            tag: StructTag::Tag,
            fields,
        }
    }
}

/// List (array) type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListType {
    #[serde(rename = "type")]
    tag: ListTag,
    /// Field ID for list elements
    #[serde(rename = "element-id")]
    pub element_id: i32,
    /// Whether list elements are required (cannot be null)
    #[serde(rename = "element-required")]
    pub element_required: bool,
    /// Element type
    pub element: Type,
}

impl ListType {
    pub fn new(element_id: i32, element_required: bool, element: Type) -> Self {
        ListType {
            tag: ListTag::Tag,
            element_id,
            element_required,
            element,
        }
    }
}

/// Map (key-value) type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapType {
    #[serde(rename = "type")]
    tag: MapTag,
    /// Field ID for map keys
    #[serde(rename = "key-id")]
    pub key_id: i32,
    /// Key type
    pub key: Type,
    /// Field ID for map values
    #[serde(rename = "value-id")]
    pub value_id: i32,
    /// Whether map values are required (cannot be null)
    #[serde(rename = "value-required")]
    pub value_required: bool,
    /// Value type
    pub value: Type,
}

impl MapType {
    pub fn new(key_id: i32, key: Type, value_id: i32, value_required: bool, value: Type) -> Self {
        MapType {
            tag: MapTag::Tag,
            key_id,
            key,
            value_id,
            value_required,
            value,
        }
    }
}

/// Schema field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedField {
    /// Unique field identifier within the table
    pub id: i32,
    /// Field name
    pub name: String,
    /// Whether this field is required (not null)
    pub required: bool,
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: Type,
    /// Optional documentation for this field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl NestedField {
    pub fn required(id: i32, name: impl Into<String>, field_type: impl Into<Type>) -> Self {
        NestedField {
            id,
            name: name.into(),
            required: true,
            field_type: field_type.into(),
            doc: None,
        }
    }

    pub fn optional(id: i32, name: impl Into<String>, field_type: impl Into<Type>) -> Self {
        NestedField {
            id,
            name: name.into(),
            required: false,
            field_type: field_type.into(),
            doc: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Iceberg table schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default)]
    tag: StructTag,
    /// Unique identifier for this schema version
    #[serde(rename = "schema-id", default)]
    pub schema_id: i32,
    /// Field IDs that form the table's identifier
    #[serde(
        rename = "identifier-field-ids",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub identifier_field_ids: Vec<i32>,
    /// Top-level fields
    #[serde(default)]
    pub fields: Vec<NestedField>,
}

impl Schema {
    pub fn new(schema_id: i32, fields: Vec<NestedField>) -> Self {
        Schema {
            tag: StructTag::Tag,
            schema_id,
            identifier_field_ids: Vec::new(),
            fields,
        }
    }

    pub fn with_identifier_field_ids(mut self, ids: Vec<i32>) -> Self {
        self.identifier_field_ids = ids;
        self
    }

    /// Top-level fields as a struct type
    pub fn as_struct(&self) -> StructType {
        StructType::new(self.fields.clone())
    }

    /// Finds a field at any nesting depth by id
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        fn walk<'a>(fields: &'a [NestedField], id: i32) -> Option<&'a NestedField> {
            for field in fields {
                if field.id == id {
                    return Some(field);
                }
                if let Some(found) = walk_type(&field.field_type, id) {
                    return Some(found);
                }
            }
            None
        }
        fn walk_type(t: &Type, id: i32) -> Option<&NestedField> {
            match t {
                Type::Struct(s) => walk(&s.fields, id),
                Type::List(l) => walk_type(&l.element, id),
                Type::Map(m) => walk_type(&m.key, id).or_else(|| walk_type(&m.value, id)),
                Type::Primitive(_) => None,
            }
        }
        walk(&self.fields, id)
    }

    /// Finds a top-level field by name
    pub fn field_by_name(&self, name: &str) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every id in the schema, including list element and map key/value ids
    pub fn field_ids(&self) -> Vec<i32> {
        let mut ids = Vec::new();
        visit_ids(&self.fields, &mut |id| ids.push(id));
        ids
    }

    /// Highest id in the schema, or 0 for an empty schema
    pub fn highest_field_id(&self) -> i32 {
        self.field_ids().into_iter().max().unwrap_or(0)
    }

    /// True when both schemas have the same fields, ignoring the schema id
    pub fn same_fields(&self, other: &Schema) -> bool {
        self.fields == other.fields && self.identifier_field_ids == other.identifier_field_ids
    }

    /// Replaces every unassigned id with the next id after `last_column_id`
    pub(crate) fn assign_missing_ids(&mut self, last_column_id: &mut i32) {
        fn assign(fields: &mut [NestedField], next: &mut i32) {
            for field in fields.iter_mut() {
                if field.id == UNASSIGNED_FIELD_ID {
                    *next += 1;
                    field.id = *next;
                }
            }
            for field in fields.iter_mut() {
                assign_type(&mut field.field_type, next);
            }
        }
        fn assign_type(t: &mut Type, next: &mut i32) {
            match t {
                Type::Struct(s) => assign(&mut s.fields, next),
                Type::List(l) => {
                    if l.element_id == UNASSIGNED_FIELD_ID {
                        *next += 1;
                        l.element_id = *next;
                    }
                    assign_type(&mut l.element, next);
                }
                Type::Map(m) => {
                    if m.key_id == UNASSIGNED_FIELD_ID {
                        *next += 1;
                        m.key_id = *next;
                    }
                    if m.value_id == UNASSIGNED_FIELD_ID {
                        *next += 1;
                        m.value_id = *next;
                    }
                    assign_type(&mut m.key, next);
                    assign_type(&mut m.value, next);
                }
                Type::Primitive(_) => {}
            }
        }
        assign(&mut self.fields, last_column_id);
    }

    /// Checks id uniqueness, sibling name uniqueness and identifier fields
    pub fn validate(&self) -> Result<(), ValidationErr> {
        let mut seen = HashSet::new();
        let mut duplicate = None;
        let mut unassigned = false;
        visit_ids(&self.fields, &mut |id| {
            if id <= UNASSIGNED_FIELD_ID {
                unassigned = true;
            } else if !seen.insert(id) && duplicate.is_none() {
                duplicate = Some(id);
            }
        });
        if unassigned {
            return Err(ValidationErr::invalid("schema contains fields without an assigned id"));
        }
        if let Some(field_id) = duplicate {
            return Err(ValidationErr::DuplicateFieldId { field_id });
        }
        check_names(&self.fields)?;

        for id in &self.identifier_field_ids {
            let field = self
                .field_by_id(*id)
                .ok_or(ValidationErr::SourceFieldNotFound { source_id: *id })?;
            if !field.required || !field.field_type.is_primitive() {
                return Err(ValidationErr::invalid(format!(
                    "identifier field {id} must be a required primitive"
                )));
            }
        }
        Ok(())
    }
}

fn visit_ids(fields: &[NestedField], f: &mut impl FnMut(i32)) {
    fn visit_type(t: &Type, f: &mut impl FnMut(i32)) {
        match t {
            Type::Struct(s) => visit_ids(&s.fields, f),
            Type::List(l) => {
                f(l.element_id);
                visit_type(&l.element, f);
            }
            Type::Map(m) => {
                f(m.key_id);
                f(m.value_id);
                visit_type(&m.key, f);
                visit_type(&m.value, f);
            }
            Type::Primitive(_) => {}
        }
    }
    for field in fields {
        f(field.id);
        visit_type(&field.field_type, f);
    }
}

fn check_names(fields: &[NestedField]) -> Result<(), ValidationErr> {
    let mut names = HashSet::new();
    for field in fields {
        if field.name.is_empty() {
            return Err(ValidationErr::invalid(format!("field {} has an empty name", field.id)));
        }
        if !names.insert(field.name.as_str()) {
            return Err(ValidationErr::DuplicateFieldName {
                name: field.name.clone(),
            });
        }
    }
    for field in fields {
        let mut t = &field.field_type;
        loop {
            match t {
                Type::Struct(s) => {
                    check_names(&s.fields)?;
                    break;
                }
                Type::List(l) => t = &l.element,
                Type::Map(m) => t = &m.value,
                Type::Primitive(_) => break,
            }
        }
    }
    Ok(())
}
