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

//! Client method for CreateTable operation

use crate::builders::{CreateTable, CreateTableBldr};
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::metadata::Schema;

impl CatalogClient {
    /// Creates a new table
    ///
    /// # Arguments
    ///
    /// * `ident` - Identifier to bind the new table to
    /// * `schema` - Initial schema; field ids are kept as given
    ///
    /// # Optional Parameters
    ///
    /// * `partition_spec` - Partitioning, unpartitioned by default
    /// * `sort_order` - Sort order, unsorted by default
    /// * `properties` - Table properties
    /// * `location` - Table root, defaults to `{warehouse}/{namespace}/{table}`
    /// * `format_version` - Format version 1 or 2
    ///
    /// Fails with `TableAlreadyExists` when the identifier is bound.
    pub fn create_table(&self, ident: TableIdent, schema: Schema) -> CreateTableBldr {
        CreateTable::builder().client(self.clone()).ident(ident).schema(schema)
    }
}
