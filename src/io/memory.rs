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

use super::FileIO;
use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Object store kept in process memory; clones share their contents
#[derive(Debug, Clone, Default)]
pub struct MemoryFileIO {
    files: Arc<DashMap<String, Bytes>>,
}

impl MemoryFileIO {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored locations starting with `prefix`, sorted
    pub fn list(&self, prefix: &str) -> Vec<String> {
        let mut locations: Vec<String> = self
            .files
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        locations.sort();
        locations
    }
}

#[async_trait]
impl FileIO for MemoryFileIO {
    async fn read(&self, location: &str) -> Result<Bytes, Error> {
        self.files
            .get(location)
            .map(|data| data.value().clone())
            .ok_or_else(|| Error::FileNotFound {
                location: location.to_string(),
            })
    }

    async fn write(&self, location: &str, data: Bytes) -> Result<(), Error> {
        match self.files.entry(location.to_string()) {
            Entry::Occupied(_) => Err(Error::FileAlreadyExists {
                location: location.to_string(),
            }),
            Entry::Vacant(v) => {
                v.insert(data);
                Ok(())
            }
        }
    }

    async fn exists(&self, location: &str) -> Result<bool, Error> {
        Ok(self.files.contains_key(location))
    }

    async fn delete(&self, location: &str) -> Result<(), Error> {
        self.files.remove(location);
        Ok(())
    }
}
