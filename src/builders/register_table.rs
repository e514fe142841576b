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

//! Builder for RegisterTable operation

use crate::builders::CatalogApi;
use crate::catalog::{MetadataLocation, TableIdent};
use crate::client::CatalogClient;
use crate::commit;
use crate::error::Error;
use crate::response::RegisterTableResponse;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for RegisterTable operation
///
/// Binds an identifier to a metadata file that already exists in storage,
/// for example the last location of a dropped table or a table written by
/// another engine. Nothing is written to storage.
///
/// # Example
///
/// ```no_run
/// use floe::builders::CatalogApi;
/// use floe::catalog::{MetadataLocation, TableIdent};
/// use floe::client::CatalogClient;
///
/// # async fn example(client: CatalogClient) -> Result<(), floe::error::Error> {
/// let location = MetadataLocation::new("s3://warehouse/db/t/metadata/00003-6a1f.metadata.json")?;
/// client
///     .register_table(TableIdent::parse("db.t")?, location)
///     .build()
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, TypedBuilder)]
pub struct RegisterTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
    #[builder(!default)]
    metadata_location: MetadataLocation,
    /// Read and check the metadata file before binding
    #[builder(default = true)]
    validate: bool,
}

/// Builder type for RegisterTable
pub type RegisterTableBldr =
    RegisterTableBuilder<((CatalogClient,), (TableIdent,), (MetadataLocation,), ())>;

impl CatalogApi for RegisterTable {
    type CatalogResponse = RegisterTableResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let shared = &self.client.shared;
            let metadata = commit::register_table(
                shared.catalog.as_ref(),
                shared.file_io.as_ref(),
                &self.ident,
                &self.metadata_location,
                self.validate,
            )
            .await?;
            Ok(RegisterTableResponse::new(self.ident, self.metadata_location, metadata))
        }
    }
}
