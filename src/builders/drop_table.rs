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

//! Builder for DropTable operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::commit;
use crate::error::Error;
use crate::response::DropTableResponse;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for DropTable operation
///
/// Removes the catalog binding. Table files stay in storage unless
/// `purge` is set, so a dropped table can be registered again from its
/// last metadata location.
#[derive(Clone, Debug, TypedBuilder)]
pub struct DropTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
    /// Also delete data, manifest and metadata files
    #[builder(default = false)]
    purge: bool,
}

/// Builder type for DropTable
pub type DropTableBldr = DropTableBuilder<((CatalogClient,), (TableIdent,), ())>;

impl CatalogApi for DropTable {
    type CatalogResponse = DropTableResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let shared = &self.client.shared;
            let location = commit::drop_table(
                shared.catalog.as_ref(),
                shared.file_io.as_ref(),
                &self.ident,
                self.purge,
            )
            .await?;
            Ok(DropTableResponse::new(self.ident, location, self.purge))
        }
    }
}
