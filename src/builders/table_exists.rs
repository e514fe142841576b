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

//! Builder for TableExists operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::error::Error;
use crate::response::TableExistsResponse;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for TableExists operation
///
/// Checks the catalog binding only; the metadata file is not read.
#[derive(Clone, Debug, TypedBuilder)]
pub struct TableExists {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
}

/// Builder type for TableExists
pub type TableExistsBldr = TableExistsBuilder<((CatalogClient,), (TableIdent,))>;

impl CatalogApi for TableExists {
    type CatalogResponse = TableExistsResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let exists = self.client.catalog().exists(&self.ident).await?;
            Ok(TableExistsResponse::new(self.ident, exists))
        }
    }
}
