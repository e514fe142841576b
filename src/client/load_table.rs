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

//! Client method for LoadTable operation

use crate::builders::{LoadTable, LoadTableBldr};
use crate::catalog::TableIdent;
use crate::client::CatalogClient;

impl CatalogClient {
    /// Loads the current version of a table
    ///
    /// Fails with `TableNotFound` when the identifier is not bound and with
    /// `FileNotFound` when the bound metadata file is missing.
    pub fn load_table(&self, ident: TableIdent) -> LoadTableBldr {
        LoadTable::builder().client(self.clone()).ident(ident)
    }
}
