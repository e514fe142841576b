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

//! Partition specs, transforms and sort orders

use super::schema::{NestedField, PrimitiveType, Schema, StructType, Type};
use crate::error::ValidationErr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// First id handed out to partition fields
pub const PARTITION_DATA_ID_START: i32 = 1000;

/// `last-partition-id` of a table that never had a partition field
pub const UNPARTITIONED_LAST_ASSIGNED_ID: i32 = PARTITION_DATA_ID_START - 1;

// ============================================================================
// Transforms
// ============================================================================

/// Transform functions for partitioning and sorting
///
/// Serialized as the Iceberg transform strings: `identity`, `bucket[16]`,
/// `truncate[10]`, `year`, `month`, `day`, `hour`, `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Identity transform (no transformation)
    Identity,
    /// Hash bucket transform
    Bucket(u32),
    /// Truncate string or number to width
    Truncate(u32),
    /// Years since 1970
    Year,
    /// Months since 1970-01
    Month,
    /// Days since 1970-01-01
    Day,
    /// Hours since 1970-01-01 00:00
    Hour,
    /// Always null
    Void,
}

impl Transform {
    /// Type of the values this transform produces from `source`
    ///
    /// Fails when the transform cannot be applied to the source type.
    pub fn result_type(&self, source: &Type) -> Result<PrimitiveType, ValidationErr> {
        let incompatible = || ValidationErr::IncompatibleTransform {
            transform: self.to_string(),
            source_type: source.to_string(),
        };
        let Type::Primitive(p) = source else {
            return Err(incompatible());
        };
        use PrimitiveType as P;
        match self {
            Transform::Identity | Transform::Void => Ok(p.clone()),
            Transform::Bucket(_) => match p {
                P::Boolean | P::Float | P::Double => Err(incompatible()),
                _ => Ok(P::Int),
            },
            Transform::Truncate(_) => match p {
                P::Int | P::Long | P::Decimal { .. } | P::String | P::Binary => Ok(p.clone()),
                _ => Err(incompatible()),
            },
            Transform::Year | Transform::Month => match p {
                P::Date | P::Timestamp | P::Timestamptz => Ok(P::Int),
                _ => Err(incompatible()),
            },
            Transform::Day => match p {
                P::Date | P::Timestamp | P::Timestamptz => Ok(P::Date),
                _ => Err(incompatible()),
            },
            Transform::Hour => match p {
                P::Timestamp | P::Timestamptz => Ok(P::Int),
                _ => Err(incompatible()),
            },
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Bucket(n) => write!(f, "bucket[{n}]"),
            Transform::Truncate(w) => write!(f, "truncate[{w}]"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Void => write!(f, "void"),
        }
    }
}

impl FromStr for Transform {
    type Err = ValidationErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_arg = |prefix: &str| -> Option<Result<u32, ValidationErr>> {
            s.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|n| {
                    n.trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ValidationErr::invalid(format!("invalid transform argument: {s}")))
                })
        };
        match s {
            "identity" => Ok(Transform::Identity),
            "year" => Ok(Transform::Year),
            "month" => Ok(Transform::Month),
            "day" => Ok(Transform::Day),
            "hour" => Ok(Transform::Hour),
            "void" => Ok(Transform::Void),
            _ => {
                if let Some(n) = parse_arg("bucket[") {
                    return Ok(Transform::Bucket(n?));
                }
                if let Some(w) = parse_arg("truncate[") {
                    return Ok(Transform::Truncate(w?));
                }
                Err(ValidationErr::invalid(format!("unknown transform: {s}")))
            }
        }
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Partition Spec Types
// ============================================================================

/// Partition field definition
///
/// A `field_id` of 0 is assigned when the spec is added to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionField {
    /// Source field ID from schema
    #[serde(rename = "source-id")]
    pub source_id: i32,
    /// Partition field ID
    #[serde(rename = "field-id")]
    pub field_id: i32,
    /// Partition field name
    pub name: String,
    /// Transform function applied to source field
    pub transform: Transform,
}

impl PartitionField {
    pub fn new(source_id: i32, field_id: i32, name: impl Into<String>, transform: Transform) -> Self {
        PartitionField {
            source_id,
            field_id,
            name: name.into(),
            transform,
        }
    }

    /// Same source column and transform
    pub fn is_equivalent(&self, other: &PartitionField) -> bool {
        self.source_id == other.source_id && self.transform == other.transform
    }
}

/// Partition specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Unique identifier for this partition spec
    #[serde(rename = "spec-id")]
    pub spec_id: i32,
    /// Partition fields
    pub fields: Vec<PartitionField>,
}

impl PartitionSpec {
    pub fn new(spec_id: i32, fields: Vec<PartitionField>) -> Self {
        PartitionSpec { spec_id, fields }
    }

    /// Spec with no fields and id 0
    pub fn unpartitioned() -> Self {
        PartitionSpec::new(0, Vec::new())
    }

    pub fn is_unpartitioned(&self) -> bool {
        self.fields.iter().all(|f| f.transform == Transform::Void)
    }

    /// Same fields, ignoring the spec id
    pub fn same_fields(&self, other: &PartitionSpec) -> bool {
        self.fields == other.fields
    }

    pub fn highest_field_id(&self) -> Option<i32> {
        self.fields.iter().map(|f| f.field_id).max()
    }

    /// Struct type of this spec's partition tuples under `schema`
    ///
    /// Partition values are always optional.
    pub fn partition_type(&self, schema: &Schema) -> Result<StructType, ValidationErr> {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let source = schema
                    .field_by_id(f.source_id)
                    .ok_or(ValidationErr::SourceFieldNotFound {
                        source_id: f.source_id,
                    })?;
                let result = f.transform.result_type(&source.field_type)?;
                Ok(NestedField::optional(f.field_id, f.name.clone(), result))
            })
            .collect::<Result<Vec<_>, ValidationErr>>()?;
        Ok(StructType::new(fields))
    }

    /// Checks field ids, names and transforms against `schema`
    pub fn validate(&self, schema: &Schema) -> Result<(), ValidationErr> {
        let mut ids = std::collections::HashSet::new();
        let mut names = std::collections::HashSet::new();
        for f in &self.fields {
            if !ids.insert(f.field_id) {
                return Err(ValidationErr::PartitionFieldIdCollision {
                    field_id: f.field_id,
                });
            }
            if f.name.is_empty() || !names.insert(f.name.as_str()) {
                return Err(ValidationErr::DuplicateFieldName {
                    name: f.name.clone(),
                });
            }
        }
        self.partition_type(schema).map(|_| ())
    }
}

// ============================================================================
// Sort Order Types
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

/// Null value ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullOrder {
    /// Null values sorted before non-null values
    NullsFirst,
    /// Null values sorted after non-null values
    NullsLast,
}

/// Sort field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Source field ID from schema
    #[serde(rename = "source-id")]
    pub source_id: i32,
    /// Transform applied before sorting
    pub transform: Transform,
    /// Sort direction
    pub direction: SortDirection,
    /// Null value ordering
    #[serde(rename = "null-order")]
    pub null_order: NullOrder,
}

/// Sort order specification
///
/// Order id 0 is reserved for the unsorted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Unique identifier for this sort order
    #[serde(rename = "order-id")]
    pub order_id: i32,
    /// Sort fields
    pub fields: Vec<SortField>,
}

impl SortOrder {
    pub const UNSORTED_ORDER_ID: i32 = 0;

    pub fn unsorted() -> Self {
        SortOrder {
            order_id: Self::UNSORTED_ORDER_ID,
            fields: Vec::new(),
        }
    }

    pub fn is_unsorted(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn validate(&self, schema: &Schema) -> Result<(), ValidationErr> {
        for f in &self.fields {
            let source = schema
                .field_by_id(f.source_id)
                .ok_or(ValidationErr::SourceFieldNotFound {
                    source_id: f.source_id,
                })?;
            f.transform.result_type(&source.field_type)?;
        }
        Ok(())
    }
}
