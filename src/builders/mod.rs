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

//! Argument builders for catalog operations

use crate::error::Error;
use std::future::Future;

// Table lifecycle
mod create_table;
mod drop_table;
mod register_table;
mod rename_table;

pub use create_table::{CreateTable, CreateTableBldr};
pub use drop_table::{DropTable, DropTableBldr};
pub use register_table::{RegisterTable, RegisterTableBldr};
pub use rename_table::{RenameTable, RenameTableBldr};

// Lookup
mod list_tables;
mod load_table;
mod table_exists;

pub use list_tables::{ListTables, ListTablesBldr};
pub use load_table::{LoadTable, LoadTableBldr};
pub use table_exists::{TableExists, TableExistsBldr};

// Commits
mod commit_table;

pub use commit_table::{CommitTable, CommitTableBldr};

/// Execute a catalog operation
pub trait CatalogApi {
    /// Response type for this operation
    type CatalogResponse;

    /// Run the operation
    ///
    /// # Errors
    ///
    /// Returns `Error` if validation, storage or the catalog fails.
    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send;
}
