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

//! Error types for table, manifest and catalog operations
//!
//! Three layers:
//! - [`ValidationErr`]: a requested change or a user-supplied name violates a
//!   rule of the metadata model. Never retried.
//! - [`CodecError`]: binary manifest data is malformed or cannot be resolved
//!   against the reader schema.
//! - [`Error`]: everything an operation can surface to the caller.

use thiserror::Error;

/// Violations of metadata-model invariants and identifier rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErr {
    // Identifier errors
    /// Invalid namespace
    #[error("Invalid namespace '{namespace}': {cause}")]
    InvalidNamespace {
        /// The rejected namespace
        namespace: String,
        /// Reason why it was rejected
        cause: String,
    },
    /// Invalid table name
    #[error("Invalid table name '{name}': {cause}")]
    InvalidTableName {
        /// The rejected table name
        name: String,
        /// Reason why it was rejected
        cause: String,
    },
    /// Invalid metadata location
    #[error("Invalid metadata location '{location}': {cause}")]
    InvalidMetadataLocation {
        /// The rejected location
        location: String,
        /// Reason why it was rejected
        cause: String,
    },

    // Snapshot errors
    /// Snapshot sequence number does not advance the table's history
    #[error(
        "Snapshot sequence number {sequence_number} must be greater than last sequence number {last_sequence_number}"
    )]
    StaleSequenceNumber {
        /// Sequence number of the rejected snapshot
        sequence_number: i64,
        /// Highest sequence number already assigned
        last_sequence_number: i64,
    },
    /// Snapshot parent is not the current snapshot
    #[error("Snapshot parent {actual:?} does not match current snapshot {expected:?}")]
    ParentMismatch {
        /// Current snapshot of the base metadata
        expected: Option<i64>,
        /// Parent declared by the new snapshot
        actual: Option<i64>,
    },
    /// A snapshot with this id already exists
    #[error("Snapshot already exists: {snapshot_id}")]
    DuplicateSnapshot {
        /// Conflicting snapshot id
        snapshot_id: i64,
    },
    /// Referenced snapshot does not exist
    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound {
        /// Missing snapshot id
        snapshot_id: i64,
    },
    /// Referenced branch or tag does not exist
    #[error("Snapshot reference not found: {name}")]
    RefNotFound {
        /// Missing reference name
        name: String,
    },
    /// The current snapshot cannot be removed
    #[error("Cannot remove current snapshot {snapshot_id}")]
    RemoveCurrentSnapshot {
        /// Id of the current snapshot
        snapshot_id: i64,
    },

    // Schema errors
    /// Referenced schema does not exist
    #[error("Schema not found: {schema_id}")]
    SchemaNotFound {
        /// Missing schema id
        schema_id: i32,
    },
    /// Two fields share an id
    #[error("Duplicate field id: {field_id}")]
    DuplicateFieldId {
        /// Repeated field id
        field_id: i32,
    },
    /// Two sibling fields share a name
    #[error("Duplicate field name: {name}")]
    DuplicateFieldName {
        /// Repeated field name
        name: String,
    },

    // Partition and sort order errors
    /// Referenced partition spec does not exist
    #[error("Partition spec not found: {spec_id}")]
    PartitionSpecNotFound {
        /// Missing spec id
        spec_id: i32,
    },
    /// Partition field id reused with a different definition
    #[error("Partition field id {field_id} collides with an existing partition field")]
    PartitionFieldIdCollision {
        /// Colliding partition field id
        field_id: i32,
    },
    /// Partition or sort field references a column missing from the schema
    #[error("Source field not found in current schema: {source_id}")]
    SourceFieldNotFound {
        /// Missing source field id
        source_id: i32,
    },
    /// Transform cannot be applied to the source column type
    #[error("Transform {transform} cannot be applied to type {source_type}")]
    IncompatibleTransform {
        /// Transform name
        transform: String,
        /// Source column type
        source_type: String,
    },
    /// Referenced sort order does not exist
    #[error("Sort order not found: {order_id}")]
    SortOrderNotFound {
        /// Missing sort order id
        order_id: i32,
    },

    // Table level errors
    /// Format version cannot be lowered
    #[error("Cannot downgrade format version from {current} to {requested}")]
    FormatVersionDowngrade {
        /// Format version of the base metadata
        current: i32,
        /// Requested format version
        requested: i32,
    },
    /// Format version is not understood
    #[error("Unsupported format version: {version}")]
    UnsupportedFormatVersion {
        /// Rejected format version
        version: i32,
    },
    /// A commit requirement does not hold for the base metadata
    #[error("Requirement failed: {message}")]
    RequirementFailed {
        /// Which requirement failed and why
        message: String,
    },
    /// Any other invalid argument
    #[error("{message}")]
    InvalidArgument {
        /// Description of the problem
        message: String,
    },
}

impl ValidationErr {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ValidationErr::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn requirement(message: impl Into<String>) -> Self {
        ValidationErr::RequirementFailed {
            message: message.into(),
        }
    }
}

/// Malformed or unresolvable Avro data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended in the middle of a value
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the value being read
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },
    /// Variable-length integer longer than 10 bytes
    #[error("Variable-length integer overflows 64 bits")]
    VarintOverflow,
    /// Length prefix or block size is negative where it cannot be
    #[error("Invalid length: {length}")]
    InvalidLength {
        /// The decoded length
        length: i64,
    },
    /// Decoded int does not fit in 32 bits
    #[error("Int value out of range: {value}")]
    IntOverflow {
        /// The decoded long
        value: i64,
    },
    /// Union branch index outside the writer's union
    #[error("Invalid union branch {index} for union of {branches} branches")]
    InvalidUnionBranch {
        /// Decoded branch index
        index: i64,
        /// Number of branches in the writer union
        branches: usize,
    },
    /// Boolean byte is neither 0 nor 1
    #[error("Invalid boolean byte: {value}")]
    InvalidBoolean {
        /// The offending byte
        value: u8,
    },
    /// String value is not UTF-8
    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8,
    /// A null was found where the reader requires a value
    #[error("Unexpected null for required field '{field}'")]
    UnexpectedNull {
        /// Field name in the reader schema
        field: String,
    },
    /// A value does not fit the declared logical type
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field or type name
        field: String,
        /// Description of the problem
        message: String,
    },

    // Container framing
    /// File does not start with the Avro magic
    #[error("Not an Avro object container file")]
    InvalidMagic,
    /// Block did not end with the header's sync marker
    #[error("Sync marker mismatch after block {block}")]
    SyncMismatch {
        /// Zero-based block index
        block: usize,
    },
    /// Container compression codec is not supported
    #[error("Unsupported codec: {codec}")]
    UnsupportedCodec {
        /// Codec name from the header
        codec: String,
    },
    /// Compression or decompression failed
    #[error("Compression error: {message}")]
    Compression {
        /// Underlying failure
        message: String,
    },
    /// Required header metadata key is absent
    #[error("Missing container metadata: {key}")]
    MissingMetadata {
        /// Missing key
        key: String,
    },

    // Schemas
    /// Avro schema JSON could not be interpreted
    #[error("Invalid Avro schema: {message}")]
    InvalidSchema {
        /// Description of the problem
        message: String,
    },
    /// Writer and reader types cannot be resolved
    #[error("Cannot resolve field '{field}': writer type {writer} is not compatible with reader type {reader}")]
    IncompatibleTypes {
        /// Reader field name
        field: String,
        /// Writer type
        writer: String,
        /// Reader type
        reader: String,
    },
    /// Required reader field has no writer counterpart and no default
    #[error("Required field '{name}' (id {field_id:?}) is missing from writer schema and has no default")]
    MissingRequiredField {
        /// Reader field name
        name: String,
        /// Reader field id, when the schema carries ids
        field_id: Option<i32>,
    },
}

impl CodecError {
    pub(crate) fn invalid_schema(message: impl Into<String>) -> Self {
        CodecError::InvalidSchema {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by floe operations
#[derive(Debug, Error)]
pub enum Error {
    /// A requested change violates the metadata model
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErr),
    /// Identifier has no catalog binding
    #[error("Table not found: {table}")]
    TableNotFound {
        /// Table identifier
        table: String,
    },
    /// Identifier already has a catalog binding
    #[error("Table already exists: {table}")]
    TableAlreadyExists {
        /// Table identifier
        table: String,
    },
    /// The catalog pointer moved under an optimistic commit
    #[error("Commit conflict on table {table} after {attempts} attempt(s)")]
    CommitConflict {
        /// Table identifier
        table: String,
        /// Number of attempts made, including the first one
        attempts: u32,
    },
    /// Manifest or manifest-list data could not be decoded or encoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    /// Storage location does not exist
    #[error("File not found: {location}")]
    FileNotFound {
        /// The missing location
        location: String,
    },
    /// Storage location is already taken
    #[error("File already exists: {location}")]
    FileAlreadyExists {
        /// The taken location
        location: String,
    },
    /// Storage layer failure
    #[error("Storage error at {location}: {source}")]
    Storage {
        /// Location being accessed
        location: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
    /// Metadata document could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Catalog backend failure
    #[error("Catalog error: {message}")]
    Catalog {
        /// Description of the failure
        message: String,
    },
    /// Client was not configured correctly
    #[error("Client configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

impl Error {
    /// True when another attempt against refreshed metadata may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CommitConflict { .. })
    }

    /// True for `TableNotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TableNotFound { .. })
    }

    /// True for `TableAlreadyExists`
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::TableAlreadyExists { .. })
    }

    pub(crate) fn storage(location: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            location: location.into(),
            source,
        }
    }
}
