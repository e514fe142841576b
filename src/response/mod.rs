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

//! Response types for catalog operations

mod commit_table;
mod create_table;
mod drop_table;
mod list_tables;
mod load_table;
mod register_table;
mod rename_table;
mod table_exists;

pub use commit_table::CommitTableResponse;
pub use create_table::CreateTableResponse;
pub use drop_table::DropTableResponse;
pub use list_tables::ListTablesResponse;
pub use load_table::LoadTableResponse;
pub use register_table::RegisterTableResponse;
pub use rename_table::RenameTableResponse;
pub use table_exists::TableExistsResponse;

use crate::catalog::{MetadataLocation, TableIdent};
use crate::metadata::TableMetadata;
use crate::table::Table;
use std::sync::Arc;

/// Responses carrying a loaded [`Table`]
pub trait HasTable {
    fn table(&self) -> &Table;

    fn ident(&self) -> &TableIdent {
        self.table().ident()
    }

    fn metadata(&self) -> &Arc<TableMetadata> {
        self.table().metadata()
    }

    fn metadata_location(&self) -> &MetadataLocation {
        self.table().metadata_location()
    }
}

#[macro_export]
/// Implements [`HasTable`] and the `new`/`into_table` pair for responses
/// wrapping a single `table` field.
macro_rules! impl_has_table {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub(crate) fn new(table: $crate::table::Table) -> Self {
                    Self { table }
                }

                /// Consumes the response, returning the table handle
                pub fn into_table(self) -> $crate::table::Table {
                    self.table
                }
            }

            impl $crate::response::HasTable for $ty {
                fn table(&self) -> &$crate::table::Table {
                    &self.table
                }
            }
        )*
    };
}
