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

//! # Floe
//!
//! Client library for Apache Iceberg tables. It covers the table metadata
//! model, the Avro manifest and manifest-list codec, and the optimistic
//! commit protocol that lets independent writers update a table through a
//! catalog offering only compare-and-swap on a metadata pointer.
//!
//! Each catalog operation has an argument builder (e.g.
//! [`builders::CreateTable`], [`builders::CommitTable`]) obtained from a
//! [`client::CatalogClient`] method. Builders implement
//! [`builders::CatalogApi`], whose async [`send`](builders::CatalogApi::send)
//! runs the operation and returns a typed response.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use floe::builders::CatalogApi;
//! use floe::catalog::{MemoryCatalog, TableIdent};
//! use floe::client::CatalogClient;
//! use floe::commit::AppendFiles;
//! use floe::io::MemoryFileIO;
//! use floe::manifest::DataFile;
//! use floe::metadata::{NestedField, PrimitiveType, Schema};
//! use floe::response::HasTable;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = CatalogClient::builder()
//!         .catalog(MemoryCatalog::new())
//!         .file_io(MemoryFileIO::new())
//!         .warehouse("mem://warehouse")
//!         .build()
//!         .expect("invalid client configuration");
//!
//!     let ident = TableIdent::parse("analytics.events").unwrap();
//!     let schema = Schema::new(0, vec![NestedField::required(1, "id", PrimitiveType::Long)]);
//!     client.create_table(ident.clone(), schema).build().send().await.expect("create failed");
//!
//!     let file = DataFile::builder()
//!         .file_path("mem://warehouse/analytics/events/data/00000.parquet")
//!         .record_count(100)
//!         .file_size_in_bytes(4096)
//!         .build();
//!     let committed = client
//!         .commit_table(ident, AppendFiles::new().add_file(file))
//!         .build()
//!         .send()
//!         .await
//!         .expect("commit failed");
//!
//!     println!("snapshot: {:?}", committed.metadata().current_snapshot().map(|s| s.snapshot_id));
//! }
//! ```
//!
//! ## Design
//! - [`metadata`] is a pure model: every change is a [`metadata::TableUpdate`]
//!   applied to an immutable [`metadata::TableMetadata`], yielding a new value
//! - [`commit`] writes a new metadata file per attempt and publishes it with
//!   [`catalog::Catalog::compare_and_swap`]; lost races are retried from a
//!   fresh load
//! - [`manifest`] reads and writes manifests through the [`avro`] container
//!   codec, resolving fields by id so files written with older schemas decode

#![allow(clippy::result_large_err)]
#![allow(clippy::too_many_arguments)]

pub mod avro;
pub mod builders;
pub mod catalog;
pub mod client;
pub mod commit;
pub mod error;
pub mod io;
pub mod manifest;
pub mod metadata;
pub mod response;
pub mod table;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;
