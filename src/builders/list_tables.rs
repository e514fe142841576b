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

//! Builder for ListTables operation

use crate::builders::CatalogApi;
use crate::catalog::Namespace;
use crate::client::CatalogClient;
use crate::error::Error;
use crate::response::ListTablesResponse;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Argument builder for ListTables operation
///
/// Lists the tables bound directly under a namespace.
#[derive(Clone, Debug, TypedBuilder)]
pub struct ListTables {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    namespace: Namespace,
}

/// Builder type for ListTables
pub type ListTablesBldr = ListTablesBuilder<((CatalogClient,), (Namespace,))>;

impl CatalogApi for ListTables {
    type CatalogResponse = ListTablesResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let identifiers = self.client.catalog().list_bindings(&self.namespace).await?;
            Ok(ListTablesResponse::new(self.namespace, identifiers))
        }
    }
}
