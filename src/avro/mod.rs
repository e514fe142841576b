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

//! Avro binary codec used by manifest and manifest-list files
//!
//! - [`decoder`]: zig-zag varints, length-prefixed values, unions and blocks
//! - [`encoder`]: the inverse direction
//! - [`schema`]: Avro schemas with Iceberg field ids
//! - [`resolver`]: compiled writer/reader resolution plans
//! - [`container`]: object container framing

pub mod container;
pub mod decoder;
pub mod encoder;
pub mod resolver;
pub mod schema;

pub use container::{Codec, ContainerReader, ContainerWriter};
pub use decoder::BinaryDecoder;
pub use encoder::BinaryEncoder;
pub use resolver::{FieldDefault, RecordPlan, Resolved, required};
pub use schema::{AvroSchema, RecordField};
