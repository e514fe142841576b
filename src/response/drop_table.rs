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

//! Response type for DropTable operation

use crate::catalog::{MetadataLocation, TableIdent};

/// Response from DropTable operation
#[derive(Clone, Debug)]
pub struct DropTableResponse {
    ident: TableIdent,
    metadata_location: MetadataLocation,
    purged: bool,
}

impl DropTableResponse {
    pub(crate) fn new(ident: TableIdent, metadata_location: MetadataLocation, purged: bool) -> Self {
        Self {
            ident,
            metadata_location,
            purged,
        }
    }

    pub fn ident(&self) -> &TableIdent {
        &self.ident
    }

    /// Metadata location the identifier was bound to when dropped
    ///
    /// Unless the table was purged this can be passed to RegisterTable to
    /// restore the table.
    pub fn metadata_location(&self) -> &MetadataLocation {
        &self.metadata_location
    }

    pub fn purged(&self) -> bool {
        self.purged
    }
}
