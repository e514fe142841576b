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

//! Catalog contract
//!
//! A catalog holds exactly one metadata-location pointer per table
//! identifier. Every operation here works on that pointer only; no catalog
//! operation reads or writes metadata file contents.
//!
//! Commit correctness rests on [`Catalog::compare_and_swap`], which every
//! backend must implement as a true conditional update on its side (a
//! transactional update, a versioned put, a conditional object write),
//! never as a client-side read followed by an unconditional write.

mod ident;
mod memory;

pub use ident::{MetadataLocation, Namespace, TableIdent, TableName};
pub use memory::MemoryCatalog;

use crate::error::Error;
use async_trait::async_trait;
use std::fmt;

/// Outcome of a compare-and-swap on a table pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The pointer now holds the new location
    Swapped,
    /// The pointer did not hold the expected location; it holds `actual`
    Conflict { actual: MetadataLocation },
}

/// Abstract catalog backend
#[async_trait]
pub trait Catalog: fmt::Debug + Send + Sync {
    /// Current metadata location bound to `ident`
    ///
    /// Fails with [`Error::TableNotFound`] when unbound.
    async fn lookup(&self, ident: &TableIdent) -> Result<MetadataLocation, Error>;

    /// Binds `ident` to `location` if it is unbound
    ///
    /// Fails with [`Error::TableAlreadyExists`] and leaves the existing
    /// binding untouched otherwise.
    async fn create_binding(&self, ident: &TableIdent, location: &MetadataLocation) -> Result<(), Error>;

    /// Atomically replaces `expected` with `new`
    ///
    /// Fails with [`Error::TableNotFound`] when unbound.
    async fn compare_and_swap(
        &self,
        ident: &TableIdent,
        expected: &MetadataLocation,
        new: &MetadataLocation,
    ) -> Result<SwapOutcome, Error>;

    /// Removes the binding and returns the location it held
    async fn drop_binding(&self, ident: &TableIdent) -> Result<MetadataLocation, Error>;

    /// Identifiers bound under `namespace`, sorted
    async fn list_bindings(&self, namespace: &Namespace) -> Result<Vec<TableIdent>, Error>;

    /// Moves the binding of `from` to `to`
    ///
    /// The default creates the new binding first and drops the old one, and
    /// removes the new binding again if the drop fails. Backends that can
    /// rename in one step should override it.
    async fn rename_binding(&self, from: &TableIdent, to: &TableIdent) -> Result<(), Error> {
        let location = self.lookup(from).await?;
        self.create_binding(to, &location).await?;
        if let Err(e) = self.drop_binding(from).await {
            if let Err(undo) = self.drop_binding(to).await {
                log::warn!("could not undo binding of {to} after failed rename from {from}: {undo}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Whether `ident` is bound
    async fn exists(&self, ident: &TableIdent) -> Result<bool, Error> {
        match self.lookup(ident).await {
            Ok(_) => Ok(true),
            Err(Error::TableNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
