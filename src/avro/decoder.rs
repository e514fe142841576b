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

//! Avro binary decoding primitives
//!
//! [`BinaryDecoder`] is a cursor over a borrowed byte slice. Strings and
//! bytes are returned as slices into the input, so decoding allocates only
//! when the caller copies a value out.

use super::schema::AvroSchema;
use crate::error::CodecError;

/// Maximum encoded length of a 64-bit varint
const MAX_VARINT_LEN: usize = 10;

/// Decodes a zig-zag encoded unsigned value
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Cursor over Avro binary data
#[derive(Debug, Clone)]
pub struct BinaryDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        BinaryDecoder { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Zig-zag varint as `long`
    pub fn read_long(&mut self) -> Result<i64, CodecError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self.buf.get(self.pos).ok_or(CodecError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })?;
            self.pos += 1;
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(CodecError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(zigzag_decode(value));
            }
            shift += 7;
        }
        Err(CodecError::VarintOverflow)
    }

    /// Zig-zag varint as `int`; fails when the value needs more than 32 bits
    pub fn read_int(&mut self) -> Result<i32, CodecError> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| CodecError::IntOverflow { value })
    }

    pub fn read_boolean(&mut self) -> Result<bool, CodecError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidBoolean { value }),
        }
    }

    pub fn read_float(&mut self) -> Result<f32, CodecError> {
        let raw = self.take(4)?;
        Ok(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_double(&mut self) -> Result<f64, CodecError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }

    /// Non-negative length prefix
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let length = self.read_long()?;
        usize::try_from(length).map_err(|_| CodecError::InvalidLength { length })
    }

    /// Length-prefixed bytes, borrowed from the input
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Length-prefixed UTF-8 string, borrowed from the input
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        let raw = self.read_bytes()?;
        std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn read_fixed(&mut self, size: usize) -> Result<&'a [u8], CodecError> {
        self.take(size)
    }

    /// Union branch selector, checked against the number of branches
    pub fn read_union_index(&mut self, branches: usize) -> Result<usize, CodecError> {
        let index = self.read_long()?;
        match usize::try_from(index) {
            Ok(i) if i < branches => Ok(i),
            _ => Err(CodecError::InvalidUnionBranch { index, branches }),
        }
    }

    /// Item count of the next array or map block; `0` ends the sequence
    ///
    /// A negative count is followed by the block's byte size, which is
    /// consumed here.
    pub fn read_block_count(&mut self) -> Result<usize, CodecError> {
        let count = self.read_long()?;
        if count < 0 {
            self.read_len()?;
            return Ok(count.unsigned_abs() as usize);
        }
        Ok(count as usize)
    }

    /// Skips one value written with `schema`
    pub fn skip(&mut self, schema: &AvroSchema) -> Result<(), CodecError> {
        match schema {
            AvroSchema::Null => Ok(()),
            AvroSchema::Boolean => self.take(1).map(|_| ()),
            AvroSchema::Int
            | AvroSchema::Long
            | AvroSchema::Date
            | AvroSchema::TimeMicros
            | AvroSchema::TimestampMicros { .. } => self.read_long().map(|_| ()),
            AvroSchema::Float => self.take(4).map(|_| ()),
            AvroSchema::Double => self.take(8).map(|_| ()),
            AvroSchema::Bytes | AvroSchema::String => self.read_bytes().map(|_| ()),
            AvroSchema::Fixed(f) => self.take(f.size).map(|_| ()),
            AvroSchema::Decimal(d) => self.take(d.size).map(|_| ()),
            AvroSchema::Uuid => self.take(16).map(|_| ()),
            AvroSchema::Union(branches) => {
                let index = self.read_union_index(branches.len())?;
                self.skip(&branches[index])
            }
            AvroSchema::Record(r) => {
                for field in &r.fields {
                    self.skip(&field.schema)?;
                }
                Ok(())
            }
            AvroSchema::Array(a) => self.skip_blocks(|d| d.skip(&a.items)),
            AvroSchema::Map(m) => self.skip_blocks(|d| {
                d.read_bytes()?;
                d.skip(&m.values)
            }),
        }
    }

    /// Skips a block-encoded sequence, jumping over sized blocks whole
    fn skip_blocks(
        &mut self,
        mut skip_item: impl FnMut(&mut Self) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        loop {
            let count = self.read_long()?;
            if count == 0 {
                return Ok(());
            }
            if count < 0 {
                let size = self.read_len()?;
                self.take(size)?;
                continue;
            }
            for _ in 0..count {
                skip_item(self)?;
            }
        }
    }
}
