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

//! Builder for LoadTable operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::commit::load_metadata;
use crate::error::Error;
use crate::response::LoadTableResponse;
use crate::table::Table;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for LoadTable operation
///
/// Resolves the identifier through the catalog and reads the metadata file
/// it points at.
#[derive(Clone, Debug, TypedBuilder)]
pub struct LoadTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
}

/// Builder type for LoadTable
pub type LoadTableBldr = LoadTableBuilder<((CatalogClient,), (TableIdent,))>;

impl CatalogApi for LoadTable {
    type CatalogResponse = LoadTableResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let shared = &self.client.shared;
            let (metadata, location) =
                load_metadata(shared.catalog.as_ref(), shared.file_io.as_ref(), &self.ident).await?;
            log::debug!("loaded {} from {location}", self.ident);
            Ok(LoadTableResponse::new(Table::new(
                self.ident,
                metadata,
                location,
                shared.file_io.clone(),
            )))
        }
    }
}
