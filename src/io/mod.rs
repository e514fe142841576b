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

//! Storage collaborator contract
//!
//! Metadata, manifest-list and manifest files are written once to fresh
//! locations and never rewritten, so [`FileIO::write`] refuses to replace
//! an existing object.

mod local;
mod memory;

pub use local::LocalFileIO;
pub use memory::MemoryFileIO;

use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Object storage used for table files
#[async_trait]
pub trait FileIO: fmt::Debug + Send + Sync {
    /// Whole content of `location`; [`Error::FileNotFound`] when absent
    async fn read(&self, location: &str) -> Result<Bytes, Error>;

    /// Creates `location` with `data`
    ///
    /// Fails with [`Error::FileAlreadyExists`] if the location is taken.
    async fn write(&self, location: &str, data: Bytes) -> Result<(), Error>;

    async fn exists(&self, location: &str) -> Result<bool, Error>;

    /// Removes `location`; removing a missing file is not an error
    async fn delete(&self, location: &str) -> Result<(), Error>;
}
