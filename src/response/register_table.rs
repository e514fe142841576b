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

//! Response type for RegisterTable operation

use crate::catalog::{MetadataLocation, TableIdent};
use crate::metadata::TableMetadata;
use std::sync::Arc;

/// Response from RegisterTable operation
#[derive(Clone, Debug)]
pub struct RegisterTableResponse {
    ident: TableIdent,
    metadata_location: MetadataLocation,
    metadata: Option<Arc<TableMetadata>>,
}

impl RegisterTableResponse {
    pub(crate) fn new(
        ident: TableIdent,
        metadata_location: MetadataLocation,
        metadata: Option<Arc<TableMetadata>>,
    ) -> Self {
        Self {
            ident,
            metadata_location,
            metadata,
        }
    }

    pub fn ident(&self) -> &TableIdent {
        &self.ident
    }

    pub fn metadata_location(&self) -> &MetadataLocation {
        &self.metadata_location
    }

    /// Metadata read while validating; `None` when validation was skipped
    pub fn metadata(&self) -> Option<&Arc<TableMetadata>> {
        self.metadata.as_ref()
    }
}
