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

//! Typed single values: partition tuples, column bounds, summary bounds
//!
//! Bounds are stored in manifests using Iceberg's single-value binary
//! serialization, see [`Literal::to_bytes`] and [`Literal::from_bytes`].

use super::schema::PrimitiveType;
use crate::avro::{AvroSchema, BinaryDecoder, BinaryEncoder, Resolved};
use crate::avro::schema::{DecimalSchema, FixedSchema};
use crate::error::CodecError;
use std::cmp::Ordering;
use uuid::Uuid;

/// A single primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Days since 1970-01-01
    Date(i32),
    /// Microseconds since midnight
    Time(i64),
    /// Microseconds since the epoch, no zone
    Timestamp(i64),
    /// Microseconds since the epoch, UTC
    Timestamptz(i64),
    String(String),
    Uuid(Uuid),
    Fixed(Vec<u8>),
    Binary(Vec<u8>),
    /// Unscaled value; scale comes from the type
    Decimal(i128),
}

/// Bytes needed to hold an unscaled decimal of `precision` digits
pub fn decimal_required_bytes(precision: u32) -> usize {
    // smallest n such that 2^(8n-1) > 10^precision
    let digits = precision as f64;
    ((digits * std::f64::consts::LOG2_10 + 1.0) / 8.0).ceil() as usize
}

/// Avro encoding of an Iceberg primitive type
pub fn primitive_to_avro(ty: &PrimitiveType, name: &str) -> AvroSchema {
    match ty {
        PrimitiveType::Boolean => AvroSchema::Boolean,
        PrimitiveType::Int => AvroSchema::Int,
        PrimitiveType::Long => AvroSchema::Long,
        PrimitiveType::Float => AvroSchema::Float,
        PrimitiveType::Double => AvroSchema::Double,
        PrimitiveType::Decimal { precision, scale } => AvroSchema::Decimal(DecimalSchema {
            name: format!("decimal_{precision}_{scale}"),
            precision: *precision,
            scale: *scale,
            size: decimal_required_bytes(*precision),
        }),
        PrimitiveType::Date => AvroSchema::Date,
        PrimitiveType::Time => AvroSchema::TimeMicros,
        PrimitiveType::Timestamp => AvroSchema::TimestampMicros {
            adjust_to_utc: false,
        },
        PrimitiveType::Timestamptz => AvroSchema::TimestampMicros {
            adjust_to_utc: true,
        },
        PrimitiveType::String => AvroSchema::String,
        PrimitiveType::Uuid => AvroSchema::Uuid,
        PrimitiveType::Fixed(len) => AvroSchema::Fixed(FixedSchema {
            name: format!("fixed_{name}_{len}"),
            size: *len as usize,
        }),
        PrimitiveType::Binary => AvroSchema::Bytes,
    }
}

fn type_error(ty: &PrimitiveType, message: impl Into<String>) -> CodecError {
    CodecError::invalid_value(ty.to_string(), message)
}

fn array<const N: usize>(ty: &PrimitiveType, bytes: &[u8]) -> Result<[u8; N], CodecError> {
    bytes
        .try_into()
        .map_err(|_| type_error(ty, format!("expected {N} bytes, found {}", bytes.len())))
}

fn decimal_from_be(ty: &PrimitiveType, bytes: &[u8]) -> Result<i128, CodecError> {
    if bytes.is_empty() || bytes.len() > 16 {
        return Err(type_error(ty, format!("invalid decimal length {}", bytes.len())));
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

/// Minimal two's complement big-endian form
fn decimal_to_be_minimal(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 15 {
        let b = bytes[start];
        let next_sign = bytes[start + 1] & 0x80;
        if (b == 0 && next_sign == 0) || (b == 0xff && next_sign != 0) {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

fn decimal_to_be_sized(value: i128, size: usize) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    if size >= 16 {
        let fill = if value < 0 { 0xff } else { 0 };
        let mut out = vec![fill; size - 16];
        out.extend_from_slice(&bytes);
        return out;
    }
    bytes[16 - size..].to_vec()
}

impl Literal {
    /// Iceberg single-value binary serialization
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Literal::Boolean(v) => vec![u8::from(*v)],
            Literal::Int(v) | Literal::Date(v) => v.to_le_bytes().to_vec(),
            Literal::Long(v) | Literal::Time(v) | Literal::Timestamp(v) | Literal::Timestamptz(v) => {
                v.to_le_bytes().to_vec()
            }
            Literal::Float(v) => v.to_le_bytes().to_vec(),
            Literal::Double(v) => v.to_le_bytes().to_vec(),
            Literal::String(v) => v.as_bytes().to_vec(),
            Literal::Uuid(v) => v.as_bytes().to_vec(),
            Literal::Fixed(v) | Literal::Binary(v) => v.clone(),
            Literal::Decimal(v) => decimal_to_be_minimal(*v),
        }
    }

    /// Parses a single-value binary serialization of type `ty`
    pub fn from_bytes(ty: &PrimitiveType, bytes: &[u8]) -> Result<Literal, CodecError> {
        Ok(match ty {
            PrimitiveType::Boolean => match bytes {
                [0] => Literal::Boolean(false),
                [1] => Literal::Boolean(true),
                _ => return Err(type_error(ty, "invalid boolean")),
            },
            PrimitiveType::Int => Literal::Int(i32::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Date => Literal::Date(i32::from_le_bytes(array(ty, bytes)?)),
            // Promoted int columns may still carry 4-byte bounds
            PrimitiveType::Long if bytes.len() == 4 => {
                Literal::Long(i64::from(i32::from_le_bytes(array(ty, bytes)?)))
            }
            PrimitiveType::Long => Literal::Long(i64::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Time => Literal::Time(i64::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Timestamp => Literal::Timestamp(i64::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Timestamptz => Literal::Timestamptz(i64::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Float => Literal::Float(f32::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::Double if bytes.len() == 4 => {
                Literal::Double(f64::from(f32::from_le_bytes(array(ty, bytes)?)))
            }
            PrimitiveType::Double => Literal::Double(f64::from_le_bytes(array(ty, bytes)?)),
            PrimitiveType::String => Literal::String(
                std::str::from_utf8(bytes)
                    .map_err(|_| CodecError::InvalidUtf8)?
                    .to_string(),
            ),
            PrimitiveType::Uuid => Literal::Uuid(Uuid::from_bytes(array(ty, bytes)?)),
            PrimitiveType::Fixed(len) => {
                if bytes.len() as u64 != *len {
                    return Err(type_error(ty, format!("expected {len} bytes, found {}", bytes.len())));
                }
                Literal::Fixed(bytes.to_vec())
            }
            PrimitiveType::Binary => Literal::Binary(bytes.to_vec()),
            PrimitiveType::Decimal { .. } => Literal::Decimal(decimal_from_be(ty, bytes)?),
        })
    }

    /// True for float and double NaN
    pub fn is_nan(&self) -> bool {
        match self {
            Literal::Float(v) => v.is_nan(),
            Literal::Double(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Whether the value can be stored in a column of type `ty`
    pub fn matches_type(&self, ty: &PrimitiveType) -> bool {
        matches!(
            (self, ty),
            (Literal::Boolean(_), PrimitiveType::Boolean)
                | (Literal::Int(_), PrimitiveType::Int)
                | (Literal::Long(_), PrimitiveType::Long)
                | (Literal::Float(_), PrimitiveType::Float)
                | (Literal::Double(_), PrimitiveType::Double)
                | (Literal::Date(_), PrimitiveType::Date)
                | (Literal::Time(_), PrimitiveType::Time)
                | (Literal::Timestamp(_), PrimitiveType::Timestamp)
                | (Literal::Timestamptz(_), PrimitiveType::Timestamptz)
                | (Literal::String(_), PrimitiveType::String)
                | (Literal::Uuid(_), PrimitiveType::Uuid)
                | (Literal::Binary(_), PrimitiveType::Binary)
                | (Literal::Decimal(_), PrimitiveType::Decimal { .. })
        ) || matches!((self, ty), (Literal::Fixed(v), PrimitiveType::Fixed(len)) if v.len() as u64 == *len)
    }

    /// Writes the value in the Avro encoding of `ty`
    pub fn write_avro(&self, ty: &PrimitiveType, e: &mut BinaryEncoder<'_>) {
        match self {
            Literal::Boolean(v) => e.write_boolean(*v),
            Literal::Int(v) | Literal::Date(v) => e.write_int(*v),
            Literal::Long(v) | Literal::Time(v) | Literal::Timestamp(v) | Literal::Timestamptz(v) => {
                e.write_long(*v)
            }
            Literal::Float(v) => e.write_float(*v),
            Literal::Double(v) => e.write_double(*v),
            Literal::String(v) => e.write_str(v),
            Literal::Uuid(v) => e.write_fixed(v.as_bytes()),
            Literal::Fixed(v) => e.write_fixed(v),
            Literal::Binary(v) => e.write_bytes(v),
            Literal::Decimal(v) => {
                let size = match ty {
                    PrimitiveType::Decimal { precision, .. } => decimal_required_bytes(*precision),
                    _ => 16,
                };
                e.write_fixed(&decimal_to_be_sized(*v, size))
            }
        }
    }

    /// Reads a value of type `ty` through a resolved writer type
    pub fn read_avro(
        ty: &PrimitiveType,
        r: &Resolved,
        d: &mut BinaryDecoder<'_>,
        field: &str,
    ) -> Result<Option<Literal>, CodecError> {
        Ok(match ty {
            PrimitiveType::Boolean => r.read_boolean(d, field)?.map(Literal::Boolean),
            PrimitiveType::Int => r.read_int(d, field)?.map(Literal::Int),
            PrimitiveType::Date => r.read_int(d, field)?.map(Literal::Date),
            PrimitiveType::Long => r.read_long(d, field)?.map(Literal::Long),
            PrimitiveType::Time => r.read_long(d, field)?.map(Literal::Time),
            PrimitiveType::Timestamp => r.read_long(d, field)?.map(Literal::Timestamp),
            PrimitiveType::Timestamptz => r.read_long(d, field)?.map(Literal::Timestamptz),
            PrimitiveType::Float => r.read_float(d, field)?.map(Literal::Float),
            PrimitiveType::Double => r.read_double(d, field)?.map(Literal::Double),
            PrimitiveType::String => r.read_string(d, field)?.map(Literal::String),
            PrimitiveType::Uuid => match r.read_bytes(d, field)? {
                Some(b) => Some(Literal::Uuid(Uuid::from_bytes(array(ty, b)?))),
                None => None,
            },
            PrimitiveType::Fixed(_) => r.read_bytes(d, field)?.map(|b| Literal::Fixed(b.to_vec())),
            PrimitiveType::Binary => r.read_bytes(d, field)?.map(|b| Literal::Binary(b.to_vec())),
            PrimitiveType::Decimal { .. } => match r.read_bytes(d, field)? {
                Some(b) => Some(Literal::Decimal(decimal_from_be(ty, b)?)),
                None => None,
            },
        })
    }
}

impl PartialOrd for Literal {
    /// Values of the same kind compare naturally; NaN and mixed kinds do not compare
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Literal as L;
        match (self, other) {
            (L::Boolean(a), L::Boolean(b)) => a.partial_cmp(b),
            (L::Int(a), L::Int(b)) | (L::Date(a), L::Date(b)) => a.partial_cmp(b),
            (L::Long(a), L::Long(b))
            | (L::Time(a), L::Time(b))
            | (L::Timestamp(a), L::Timestamp(b))
            | (L::Timestamptz(a), L::Timestamptz(b)) => a.partial_cmp(b),
            (L::Float(a), L::Float(b)) => a.partial_cmp(b),
            (L::Double(a), L::Double(b)) => a.partial_cmp(b),
            (L::String(a), L::String(b)) => a.partial_cmp(b),
            (L::Uuid(a), L::Uuid(b)) => a.partial_cmp(b),
            (L::Fixed(a), L::Fixed(b)) | (L::Binary(a), L::Binary(b)) => a.partial_cmp(b),
            (L::Decimal(a), L::Decimal(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_serialization() {
        assert_eq!(Literal::Int(1).to_bytes(), vec![1, 0, 0, 0]);
        assert_eq!(Literal::Long(-1).to_bytes(), vec![0xff; 8]);
        assert_eq!(Literal::Boolean(true).to_bytes(), vec![1]);
        assert_eq!(Literal::String("iceberg".into()).to_bytes(), b"iceberg".to_vec());
        assert_eq!(Literal::Decimal(1234).to_bytes(), vec![0x04, 0xd2]);
        assert_eq!(Literal::Decimal(-1).to_bytes(), vec![0xff]);
        assert_eq!(Literal::Decimal(128).to_bytes(), vec![0x00, 0x80]);

        let ty = PrimitiveType::Decimal {
            precision: 9,
            scale: 2,
        };
        assert_eq!(Literal::from_bytes(&ty, &[0xff, 0x38]).unwrap(), Literal::Decimal(-200));
        assert_eq!(
            Literal::from_bytes(&PrimitiveType::Long, &[5, 0, 0, 0]).unwrap(),
            Literal::Long(5)
        );
        assert!(Literal::from_bytes(&PrimitiveType::Int, &[1, 2]).is_err());
        assert!(Literal::from_bytes(&PrimitiveType::Boolean, &[2]).is_err());
    }

    #[test]
    fn test_decimal_required_bytes() {
        assert_eq!(decimal_required_bytes(1), 1);
        assert_eq!(decimal_required_bytes(2), 1);
        assert_eq!(decimal_required_bytes(3), 2);
        assert_eq!(decimal_required_bytes(9), 4);
        assert_eq!(decimal_required_bytes(10), 5);
        assert_eq!(decimal_required_bytes(18), 8);
        assert_eq!(decimal_required_bytes(38), 16);
    }

    #[test]
    fn test_avro_decimal_is_sign_extended() {
        let ty = PrimitiveType::Decimal {
            precision: 9,
            scale: 2,
        };
        let mut buf = Vec::new();
        Literal::Decimal(-5).write_avro(&ty, &mut BinaryEncoder::new(&mut buf));
        assert_eq!(buf, vec![0xff, 0xff, 0xff, 0xfb]);

        let mut d = BinaryDecoder::new(&buf);
        let value = Literal::read_avro(&ty, &Resolved::Fixed(4), &mut d, "d").unwrap();
        assert_eq!(value, Some(Literal::Decimal(-5)));
    }

    #[test]
    fn test_ordering() {
        assert!(Literal::Int(1) < Literal::Int(2));
        assert!(Literal::String("a".into()) < Literal::String("b".into()));
        assert_eq!(Literal::Int(1).partial_cmp(&Literal::Long(1)), None);
        assert_eq!(Literal::Double(f64::NAN).partial_cmp(&Literal::Double(1.0)), None);
        assert!(Literal::Float(f32::NAN).is_nan());
    }
}
