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

//! Catalog client for table operations
//!
//! Each operation method returns a typed builder; optional arguments are set
//! on the builder and the operation runs on [`CatalogApi::send`].
//!
//! [`CatalogApi::send`]: crate::builders::CatalogApi::send

mod commit_table;
mod create_table;
mod drop_table;
mod list_tables;
mod load_table;
mod register_table;
mod rename_table;
mod table_exists;

use crate::catalog::Catalog;
use crate::commit::RetryPolicy;
use crate::error::Error;
use crate::io::FileIO;
use std::sync::Arc;

/// Client Builder manufactures a [`CatalogClient`] from its collaborators.
#[derive(Debug, Default)]
pub struct CatalogClientBuilder {
    catalog: Option<Arc<dyn Catalog>>,
    file_io: Option<Arc<dyn FileIO>>,
    /// Root under which tables created without a location are placed
    warehouse: Option<String>,
    retry_policy: RetryPolicy,
}

impl CatalogClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog backend holding the table pointers
    pub fn catalog<C: Catalog + 'static>(mut self, catalog: C) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Storage for metadata, manifest-list and manifest files
    pub fn file_io<F: FileIO + 'static>(mut self, file_io: F) -> Self {
        self.file_io = Some(Arc::new(file_io));
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Default retry policy for commits; table properties override it
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CatalogClient, Error> {
        let catalog = self.catalog.ok_or_else(|| Error::Config {
            message: "no catalog configured".to_string(),
        })?;
        let file_io = self.file_io.ok_or_else(|| Error::Config {
            message: "no file IO configured".to_string(),
        })?;
        let warehouse = match self.warehouse {
            Some(w) if w.trim_end_matches('/').is_empty() => {
                return Err(Error::Config {
                    message: format!("invalid warehouse location {w:?}"),
                });
            }
            other => other,
        };
        Ok(CatalogClient {
            shared: Arc::new(SharedClientItems {
                catalog,
                file_io,
                warehouse,
                retry_policy: self.retry_policy,
            }),
        })
    }
}

#[derive(Debug)]
pub(crate) struct SharedClientItems {
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) file_io: Arc<dyn FileIO>,
    pub(crate) warehouse: Option<String>,
    pub(crate) retry_policy: RetryPolicy,
}

/// Client for creating, loading, committing to and dropping tables
///
/// Cloning is cheap; clones share the catalog and storage.
///
/// # Example
///
/// ```no_run
/// use floe::builders::CatalogApi;
/// use floe::catalog::{MemoryCatalog, TableIdent};
/// use floe::client::CatalogClient;
/// use floe::io::MemoryFileIO;
/// use floe::metadata::{NestedField, PrimitiveType, Schema};
/// use floe::response::HasTable;
///
/// # async fn example() -> Result<(), floe::error::Error> {
/// let client = CatalogClient::builder()
///     .catalog(MemoryCatalog::new())
///     .file_io(MemoryFileIO::new())
///     .warehouse("mem://warehouse")
///     .build()?;
///
/// let ident = TableIdent::parse("analytics.events")?;
/// let schema = Schema::new(0, vec![NestedField::required(1, "id", PrimitiveType::Long)]);
/// let table = client.create_table(ident.clone(), schema).build().send().await?;
/// assert_eq!(table.metadata().format_version(), 2);
/// assert!(client.table_exists(ident).build().send().await?.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CatalogClient {
    pub(crate) shared: Arc<SharedClientItems>,
}

impl CatalogClient {
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::new()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.shared.catalog.as_ref()
    }

    pub fn file_io(&self) -> &Arc<dyn FileIO> {
        &self.shared.file_io
    }

    pub fn warehouse(&self) -> Option<&str> {
        self.shared.warehouse.as_deref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.shared.retry_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::io::MemoryFileIO;

    #[test]
    fn test_builder_requires_collaborators() {
        let err = CatalogClient::builder().file_io(MemoryFileIO::new()).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        let err = CatalogClient::builder().catalog(MemoryCatalog::new()).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        let err = CatalogClient::builder()
            .catalog(MemoryCatalog::new())
            .file_io(MemoryFileIO::new())
            .warehouse("/")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let client = CatalogClient::builder()
            .catalog(MemoryCatalog::new())
            .file_io(MemoryFileIO::new())
            .retry_policy(RetryPolicy::no_retries())
            .build()
            .unwrap();
        assert_eq!(client.retry_policy().num_retries, 0);
        assert_eq!(client.warehouse(), None);
    }
}
