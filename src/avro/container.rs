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

//! Avro object container files
//!
//! # File Structure
//!
//! ```text
//! +----------------------+
//! | Magic "Obj\x01"      | 4 bytes
//! +----------------------+
//! | Metadata map         | map<bytes>: avro.schema, avro.codec, ...
//! +----------------------+
//! | Sync marker          | 16 bytes
//! +----------------------+
//! | Block 1              | count, byte size, payload, sync marker
//! +----------------------+
//! | ...                  |
//! +----------------------+
//! ```
//!
//! # Compression Support
//!
//! Blocks are either stored (`null` codec) or compressed with zstandard.
//! Enable the `zstd` feature for the latter:
//!
//! ```toml
//! floe = { version = "0.1", features = ["zstd"] }
//! ```
//!
//! Without this feature, opening a zstandard file returns
//! [`CodecError::UnsupportedCodec`].

use super::decoder::BinaryDecoder;
use super::encoder::BinaryEncoder;
use super::schema::AvroSchema;
use crate::error::CodecError;
use bytes::Bytes;
use std::collections::HashMap;

/// Container magic bytes
pub const AVRO_MAGIC: &[u8; 4] = b"Obj\x01";

/// Length of the block sync marker
pub const SYNC_SIZE: usize = 16;

/// Metadata key holding the writer schema
pub const SCHEMA_KEY: &str = "avro.schema";

/// Metadata key holding the block codec
pub const CODEC_KEY: &str = "avro.codec";

/// Uncompressed block size at which the writer starts a new block
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Block compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    Null,
    Zstandard,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Null => "null",
            Codec::Zstandard => "zstandard",
        }
    }

    /// Parses an `avro.codec` header value
    pub fn from_header(name: &str) -> Result<Self, CodecError> {
        match name {
            "" | "null" => Ok(Codec::Null),
            "zstandard" if is_compression_available() => Ok(Codec::Zstandard),
            other => Err(CodecError::UnsupportedCodec {
                codec: other.to_string(),
            }),
        }
    }

    /// Parses the `write.avro.compression-codec` table property
    pub fn from_property(name: &str) -> Result<Self, CodecError> {
        match name.to_ascii_lowercase().as_str() {
            "uncompressed" | "none" | "null" => Ok(Codec::Null),
            "zstd" | "zstandard" if is_compression_available() => Ok(Codec::Zstandard),
            other => Err(CodecError::UnsupportedCodec {
                codec: other.to_string(),
            }),
        }
    }
}

/// Check if zstandard support is compiled in
pub fn is_compression_available() -> bool {
    cfg!(feature = "zstd")
}

#[cfg(feature = "zstd")]
fn decompress_into(data: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    zstd::stream::copy_decode(data, out).map_err(|e| CodecError::Compression {
        message: format!("zstd decompression failed: {e}"),
    })
}

#[cfg(not(feature = "zstd"))]
fn decompress_into(_data: &[u8], _out: &mut Vec<u8>) -> Result<(), CodecError> {
    Err(CodecError::UnsupportedCodec {
        codec: Codec::Zstandard.as_str().to_string(),
    })
}

#[cfg(feature = "zstd")]
fn compress_into(data: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    zstd::stream::copy_encode(data, out, 3).map_err(|e| CodecError::Compression {
        message: format!("zstd compression failed: {e}"),
    })
}

#[cfg(not(feature = "zstd"))]
fn compress_into(_data: &[u8], _out: &mut Vec<u8>) -> Result<(), CodecError> {
    Err(CodecError::UnsupportedCodec {
        codec: Codec::Zstandard.as_str().to_string(),
    })
}

/// Forward-only reader over the records of a container file
///
/// The block buffer is allocated once and reused for every block. Each
/// reader owns its cursor, so independent readers over the same bytes do
/// not interfere.
#[derive(Debug)]
pub struct ContainerReader {
    data: Bytes,
    pos: usize,
    schema: AvroSchema,
    metadata: HashMap<String, Vec<u8>>,
    codec: Codec,
    sync: [u8; SYNC_SIZE],
    block: Vec<u8>,
    block_pos: usize,
    block_remaining: usize,
    blocks_read: usize,
    done: bool,
}

impl ContainerReader {
    /// Validates the header and parses the writer schema
    pub fn open(data: Bytes) -> Result<Self, CodecError> {
        if data.len() < AVRO_MAGIC.len() || &data[..AVRO_MAGIC.len()] != AVRO_MAGIC {
            return Err(CodecError::InvalidMagic);
        }
        let mut d = BinaryDecoder::new(&data[AVRO_MAGIC.len()..]);

        let mut metadata = HashMap::new();
        loop {
            let count = d.read_block_count()?;
            if count == 0 {
                break;
            }
            for _ in 0..count {
                let key = d.read_str()?.to_string();
                let value = d.read_bytes()?.to_vec();
                metadata.insert(key, value);
            }
        }

        let mut sync = [0u8; SYNC_SIZE];
        sync.copy_from_slice(d.read_fixed(SYNC_SIZE)?);
        let pos = AVRO_MAGIC.len() + d.position();

        let schema_text = metadata
            .get(SCHEMA_KEY)
            .ok_or_else(|| CodecError::MissingMetadata {
                key: SCHEMA_KEY.to_string(),
            })?;
        let schema_text =
            std::str::from_utf8(schema_text).map_err(|_| CodecError::InvalidUtf8)?;
        let schema = AvroSchema::parse_str(schema_text)?;

        let codec = match metadata.get(CODEC_KEY) {
            None => Codec::Null,
            Some(raw) => Codec::from_header(
                std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?,
            )?,
        };

        Ok(ContainerReader {
            data,
            pos,
            schema,
            metadata,
            codec,
            sync,
            block: Vec::new(),
            block_pos: 0,
            block_remaining: 0,
            blocks_read: 0,
            done: false,
        })
    }

    /// Writer schema from the header
    pub fn schema(&self) -> &AvroSchema {
        &self.schema
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Raw header metadata value
    pub fn metadata(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(Vec::as_slice)
    }

    /// Header metadata value as UTF-8
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Loads the next non-empty block; false at end of file
    fn load_block(&mut self) -> Result<bool, CodecError> {
        while self.block_remaining == 0 {
            if self.pos >= self.data.len() {
                return Ok(false);
            }
            let mut d = BinaryDecoder::new(&self.data[self.pos..]);
            let count = d.read_len()?;
            let size = d.read_len()?;
            let payload = d.read_fixed(size)?;
            let marker = d.read_fixed(SYNC_SIZE)?;
            if marker != self.sync.as_slice() {
                return Err(CodecError::SyncMismatch {
                    block: self.blocks_read,
                });
            }

            self.block.clear();
            match self.codec {
                Codec::Null => self.block.extend_from_slice(payload),
                Codec::Zstandard => decompress_into(payload, &mut self.block)?,
            }
            self.pos += d.position();
            self.block_pos = 0;
            self.block_remaining = count;
            self.blocks_read += 1;
        }
        Ok(true)
    }

    /// Decodes the next record with `decode`; `None` at end of file
    ///
    /// After the first error the reader yields `None`.
    pub fn next_datum<T>(
        &mut self,
        decode: impl FnOnce(&mut BinaryDecoder<'_>) -> Result<T, CodecError>,
    ) -> Option<Result<T, CodecError>> {
        if self.done {
            return None;
        }
        match self.load_block() {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        }

        let mut d = BinaryDecoder::new(&self.block[self.block_pos..]);
        let result = decode(&mut d);
        match result {
            Ok(value) => {
                self.block_pos += d.position();
                self.block_remaining -= 1;
                if self.block_remaining == 0 && self.block_pos != self.block.len() {
                    self.done = true;
                    return Some(Err(CodecError::invalid_value(
                        "block",
                        format!(
                            "block {} has {} bytes after its last record",
                            self.blocks_read - 1,
                            self.block.len() - self.block_pos
                        ),
                    )));
                }
                Some(Ok(value))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes records into a container file held in memory
#[derive(Debug)]
pub struct ContainerWriter {
    out: Vec<u8>,
    block: Vec<u8>,
    compressed: Vec<u8>,
    block_count: usize,
    block_size: usize,
    codec: Codec,
    sync: [u8; SYNC_SIZE],
    records: u64,
}

impl ContainerWriter {
    /// Starts a file; `metadata` is stored in the header next to the schema and codec
    pub fn new<I, K, V>(schema: &AvroSchema, codec: Codec, metadata: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let sync = *uuid::Uuid::new_v4().as_bytes();
        let schema_json = schema.to_json().to_string();

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            (SCHEMA_KEY.to_string(), schema_json.into_bytes()),
            (CODEC_KEY.to_string(), codec.as_str().as_bytes().to_vec()),
        ];
        entries.extend(
            metadata
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_vec())),
        );

        let mut out = Vec::with_capacity(1024);
        out.extend_from_slice(AVRO_MAGIC);
        let mut e = BinaryEncoder::new(&mut out);
        e.write_array(&entries, |e, (k, v)| {
            e.write_str(k);
            e.write_bytes(v);
        });
        e.write_fixed(&sync);

        ContainerWriter {
            out,
            block: Vec::new(),
            compressed: Vec::new(),
            block_count: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            codec,
            sync,
            records: 0,
        }
    }

    /// Overrides the uncompressed size at which blocks are cut
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Appends one record written by `encode`
    pub fn append(&mut self, encode: impl FnOnce(&mut BinaryEncoder<'_>)) -> Result<(), CodecError> {
        encode(&mut BinaryEncoder::new(&mut self.block));
        self.block_count += 1;
        self.records += 1;
        if self.block.len() >= self.block_size {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Records appended so far
    pub fn record_count(&self) -> u64 {
        self.records
    }

    fn flush_block(&mut self) -> Result<(), CodecError> {
        if self.block_count == 0 {
            return Ok(());
        }
        let payload: &[u8] = match self.codec {
            Codec::Null => &self.block,
            Codec::Zstandard => {
                self.compressed.clear();
                compress_into(&self.block, &mut self.compressed)?;
                &self.compressed
            }
        };
        let mut e = BinaryEncoder::new(&mut self.out);
        e.write_long(self.block_count as i64);
        e.write_bytes(payload);
        e.write_fixed(&self.sync);

        self.block.clear();
        self.block_count = 0;
        Ok(())
    }

    /// Flushes the last block and returns the file contents
    pub fn finish(mut self) -> Result<Bytes, CodecError> {
        self.flush_block()?;
        Ok(Bytes::from(self.out))
    }
}
