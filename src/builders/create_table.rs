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

//! Builder for CreateTable operation

use crate::builders::CatalogApi;
use crate::catalog::TableIdent;
use crate::client::CatalogClient;
use crate::commit::{self, location::default_table_location};
use crate::error::{Error, ValidationErr};
use crate::metadata::{
    DEFAULT_FORMAT_VERSION, PartitionSpec, Properties, Schema, SortOrder, TableMetadata,
};
use crate::response::CreateTableResponse;
use crate::table::Table;
use std::future::Future;
use typed_builder::TypedBuilder;

/// Table property requesting a format version at creation
///
/// It is consumed by table creation and not stored with the table.
pub const FORMAT_VERSION_PROPERTY: &str = "format-version";

/// Argument builder for CreateTable operation
///
/// Creates a new table: writes metadata version 0 and binds the identifier
/// to it. Without an explicit location the table is placed under the
/// client's warehouse.
///
/// # Example
///
/// ```no_run
/// use floe::builders::CatalogApi;
/// use floe::catalog::TableIdent;
/// use floe::client::CatalogClient;
/// use floe::metadata::{NestedField, PartitionField, PartitionSpec, PrimitiveType, Schema, Transform};
///
/// # async fn example(client: CatalogClient) -> Result<(), floe::error::Error> {
/// let schema = Schema::new(
///     0,
///     vec![
///         NestedField::required(1, "id", PrimitiveType::Long),
///         NestedField::required(2, "ts", PrimitiveType::Timestamptz),
///     ],
/// );
/// let response = client
///     .create_table(TableIdent::parse("analytics.events")?, schema)
///     .partition_spec(PartitionSpec::new(0, vec![PartitionField::new(2, 0, "ts_day", Transform::Day)]))
///     .format_version(2)
///     .build()
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, TypedBuilder)]
pub struct CreateTable {
    #[builder(!default)]
    client: CatalogClient,
    #[builder(!default)]
    ident: TableIdent,
    #[builder(!default)]
    schema: Schema,
    #[builder(default, setter(into, strip_option))]
    partition_spec: Option<PartitionSpec>,
    #[builder(default, setter(into, strip_option))]
    sort_order: Option<SortOrder>,
    #[builder(default, setter(into))]
    properties: Properties,
    #[builder(default, setter(into, strip_option))]
    location: Option<String>,
    /// Overrides the `format-version` property
    #[builder(default, setter(strip_option))]
    format_version: Option<i32>,
}

/// Builder type for CreateTable
pub type CreateTableBldr = CreateTableBuilder<(
    (CatalogClient,),
    (TableIdent,),
    (Schema,),
    (),
    (),
    (),
    (),
    (),
)>;

impl CreateTable {
    fn to_metadata(&mut self) -> Result<TableMetadata, Error> {
        let requested = self.properties.remove(FORMAT_VERSION_PROPERTY);
        let format_version = match (self.format_version, requested) {
            (Some(v), _) => v,
            (None, Some(v)) => v.trim().parse().map_err(|_| {
                ValidationErr::invalid(format!("invalid {FORMAT_VERSION_PROPERTY} property {v:?}"))
            })?,
            (None, None) => DEFAULT_FORMAT_VERSION,
        };
        let location = match (self.location.take(), self.client.warehouse()) {
            (Some(location), _) => location,
            (None, Some(warehouse)) => default_table_location(warehouse, &self.ident),
            (None, None) => {
                return Err(Error::Config {
                    message: format!("no location given for {} and no warehouse configured", self.ident),
                });
            }
        };
        Ok(TableMetadata::create(
            std::mem::replace(&mut self.schema, Schema::new(0, Vec::new())),
            self.partition_spec.take().unwrap_or_else(PartitionSpec::unpartitioned),
            self.sort_order.take().unwrap_or_else(SortOrder::unsorted),
            location,
            std::mem::take(&mut self.properties),
            format_version,
        )?)
    }
}

impl CatalogApi for CreateTable {
    type CatalogResponse = CreateTableResponse;

    fn send(mut self) -> impl Future<Output = Result<Self::CatalogResponse, Error>> + Send {
        async move {
            let metadata = self.to_metadata()?;
            let shared = &self.client.shared;
            let (metadata, location) =
                commit::create_table(shared.catalog.as_ref(), shared.file_io.as_ref(), &self.ident, metadata)
                    .await?;
            Ok(CreateTableResponse::new(Table::new(
                self.ident,
                metadata,
                location,
                shared.file_io.clone(),
            )))
        }
    }
}
