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

//! Builder for RenameTable operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::error::{Error, ValidationErr};
use crate::response::RenameTableResponse;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for RenameTable operation
///
/// Moves the catalog binding; the metadata files keep their locations.
#[derive(Clone, Debug, TypedBuilder)]
pub struct RenameTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    from: TableIdent,
    #[builder(!default)]
    to: TableIdent,
}

/// Builder type for RenameTable
pub type RenameTableBldr = RenameTableBuilder<((CatalogClient,), (TableIdent,), (TableIdent,))>;

impl CatalogApi for RenameTable {
    type CatalogResponse = RenameTableResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            if self.from == self.to {
                return Err(ValidationErr::invalid(format!("cannot rename {} to itself", self.from)).into());
            }
            self.client.catalog().rename_binding(&self.from, &self.to).await?;
            log::info!("renamed {} to {}", self.from, self.to);
            Ok(RenameTableResponse::new(self.from, self.to))
        }
    }
}
