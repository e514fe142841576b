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

//! Builder for CommitTable operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::commit::{RetryPolicy, UpdateProducer, commit_with_retry};
use crate::error::Error;
use crate::response::CommitTableResponse;
use crate::table::Table;
use std::future::Future;
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// Argument builder for CommitTable operation
///
/// Runs the optimistic commit loop: load the table, let the producer derive
/// its change from that version, write the new files and swap the catalog
/// pointer. A lost swap is retried against the refreshed table.
///
/// # Example
///
/// ```no_run
/// use floe::builders::CatalogApi;
/// use floe::catalog::TableIdent;
/// use floe::client::CatalogClient;
/// use floe::commit::AppendFiles;
/// use floe::manifest::DataFile;
///
/// # async fn example(client: CatalogClient) -> Result<(), floe::error::Error> {
/// let file = DataFile::builder()
///     .file_path("s3://warehouse/db/t/data/00000-0.parquet")
///     .record_count(1024)
///     .file_size_in_bytes(65536)
///     .build();
/// let committed = client
///     .commit_table(TableIdent::parse("db.t")?, AppendFiles::new().add_file(file))
///     .build()
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, TypedBuilder)]
pub struct CommitTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
    #[builder(!default)]
    producer: Arc<dyn UpdateProducer>,
    /// Replaces the client's default retry policy for this commit
    #[builder(default, setter(strip_option))]
    retry_policy: Option<RetryPolicy>,
}

/// Builder type for CommitTable
pub type CommitTableBldr =
    CommitTableBuilder<((CatalogClient,), (TableIdent,), (Arc<dyn UpdateProducer>,), ())>;

impl CatalogApi for CommitTable {
    type CatalogResponse = CommitTableResponse;

    fn send(self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let shared = &self.client.shared;
            let policy = self.retry_policy.unwrap_or(shared.retry_policy);
            let (metadata, location) = commit_with_retry(
                shared.catalog.as_ref(),
                shared.file_io.as_ref(),
                &self.ident,
                self.producer.as_ref(),
                &policy,
            )
            .await?;
            Ok(CommitTableResponse::new(Table::new(
                self.ident,
                metadata,
                location,
                shared.file_io.clone(),
            )))
        }
    }
}
