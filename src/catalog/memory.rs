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

use super::{Catalog, MetadataLocation, Namespace, SwapOutcome, TableIdent};
use crate::error::Error;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-process catalog backend
///
/// Pointer updates run under the map's per-key lock, which makes
/// [`Catalog::compare_and_swap`] and [`Catalog::create_binding`] atomic
/// among all clones of the catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    bindings: Arc<DashMap<TableIdent, MetadataLocation>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound tables
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn not_found(ident: &TableIdent) -> Error {
    Error::TableNotFound {
        table: ident.to_string(),
    }
}

fn already_exists(ident: &TableIdent) -> Error {
    Error::TableAlreadyExists {
        table: ident.to_string(),
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn lookup(&self, ident: &TableIdent) -> Result<MetadataLocation, Error> {
        self.bindings
            .get(ident)
            .map(|loc| loc.value().clone())
            .ok_or_else(|| not_found(ident))
    }

    async fn create_binding(&self, ident: &TableIdent, location: &MetadataLocation) -> Result<(), Error> {
        match self.bindings.entry(ident.clone()) {
            Entry::Occupied(_) => Err(already_exists(ident)),
            Entry::Vacant(v) => {
                v.insert(location.clone());
                log::debug!("bound {ident} to {location}");
                Ok(())
            }
        }
    }

    async fn compare_and_swap(
        &self,
        ident: &TableIdent,
        expected: &MetadataLocation,
        new: &MetadataLocation,
    ) -> Result<SwapOutcome, Error> {
        let mut current = self.bindings.get_mut(ident).ok_or_else(|| not_found(ident))?;
        if current.value() != expected {
            return Ok(SwapOutcome::Conflict {
                actual: current.value().clone(),
            });
        }
        *current = new.clone();
        Ok(SwapOutcome::Swapped)
    }

    async fn drop_binding(&self, ident: &TableIdent) -> Result<MetadataLocation, Error> {
        self.bindings
            .remove(ident)
            .map(|(_, location)| location)
            .ok_or_else(|| not_found(ident))
    }

    async fn list_bindings(&self, namespace: &Namespace) -> Result<Vec<TableIdent>, Error> {
        let mut idents: Vec<TableIdent> = self
            .bindings
            .iter()
            .filter(|e| e.key().namespace() == namespace)
            .map(|e| e.key().clone())
            .collect();
        idents.sort();
        Ok(idents)
    }

    /// Removes the old binding and inserts the new one, restoring the old
    /// binding if the target is taken
    ///
    /// Readers may briefly observe neither binding.
    async fn rename_binding(&self, from: &TableIdent, to: &TableIdent) -> Result<(), Error> {
        if from == to {
            return self.lookup(from).await.map(|_| ());
        }
        let (_, location) = self.bindings.remove(from).ok_or_else(|| not_found(from))?;
        match self.bindings.entry(to.clone()) {
            Entry::Vacant(v) => {
                v.insert(location);
                Ok(())
            }
            Entry::Occupied(o) => {
                drop(o);
                self.restore_binding(from, location);
                Err(already_exists(to))
            }
        }
    }
}

impl MemoryCatalog {
    /// Puts back a binding taken out by a failed rename
    ///
    /// A table created under the same identifier in the meantime wins.
    fn restore_binding(&self, ident: &TableIdent, location: MetadataLocation) {
        match self.bindings.entry(ident.clone()) {
            Entry::Vacant(v) => {
                v.insert(location);
            }
            Entry::Occupied(current) => {
                log::warn!(
                    "{ident} was re-created at {} during a failed rename; dropping binding to {location}",
                    current.get()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> TableIdent {
        TableIdent::parse(&format!("db.{name}")).unwrap()
    }

    fn loc(v: u32) -> MetadataLocation {
        MetadataLocation::new(format!("mem://t/metadata/{v:05}.metadata.json")).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let catalog = MemoryCatalog::new();
        assert!(catalog.lookup(&ident("t")).await.unwrap_err().is_not_found());
        catalog.create_binding(&ident("t"), &loc(0)).await.unwrap();
        assert_eq!(catalog.lookup(&ident("t")).await.unwrap(), loc(0));

        let err = catalog.create_binding(&ident("t"), &loc(1)).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(catalog.lookup(&ident("t")).await.unwrap(), loc(0));
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let catalog = MemoryCatalog::new();
        catalog.create_binding(&ident("t"), &loc(0)).await.unwrap();
        assert_eq!(
            catalog.compare_and_swap(&ident("t"), &loc(0), &loc(1)).await.unwrap(),
            SwapOutcome::Swapped
        );
        assert_eq!(
            catalog.compare_and_swap(&ident("t"), &loc(0), &loc(2)).await.unwrap(),
            SwapOutcome::Conflict { actual: loc(1) }
        );
        assert!(
            catalog
                .compare_and_swap(&ident("x"), &loc(0), &loc(1))
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_concurrent_swaps_have_one_winner() {
        let catalog = MemoryCatalog::new();
        catalog.create_binding(&ident("t"), &loc(0)).await.unwrap();
        let mut handles = Vec::new();
        for i in 1..=16 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                catalog.compare_and_swap(&ident("t"), &loc(0), &loc(i)).await.unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() == SwapOutcome::Swapped {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_recreated_source() {
        let catalog = MemoryCatalog::new();
        catalog.create_binding(&ident("a"), &loc(7)).await.unwrap();
        catalog.restore_binding(&ident("a"), loc(0));
        assert_eq!(catalog.lookup(&ident("a")).await.unwrap(), loc(7));

        catalog.restore_binding(&ident("b"), loc(3));
        assert_eq!(catalog.lookup(&ident("b")).await.unwrap(), loc(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_failed_renames_never_overwrite() {
        let catalog = MemoryCatalog::new();
        catalog.create_binding(&ident("src"), &loc(0)).await.unwrap();
        catalog.create_binding(&ident("dst"), &loc(1)).await.unwrap();

        let renamer = {
            let catalog = catalog.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let err = catalog.rename_binding(&ident("src"), &ident("dst")).await.unwrap_err();
                    assert!(err.is_already_exists() || err.is_not_found());
                }
            })
        };
        let creator = {
            let catalog = catalog.clone();
            tokio::spawn(async move {
                let mut created = 0;
                for _ in 0..200 {
                    if catalog.create_binding(&ident("src"), &loc(2)).await.is_ok() {
                        created += 1;
                    }
                    tokio::task::yield_now().await;
                }
                created
            })
        };
        renamer.await.unwrap();
        let created = creator.await.unwrap();

        assert_eq!(catalog.lookup(&ident("dst")).await.unwrap(), loc(1));
        let src = catalog.lookup(&ident("src")).await.unwrap();
        if created > 0 {
            assert_eq!(src, loc(2));
        } else {
            assert_eq!(src, loc(0));
        }
    }

    #[tokio::test]
    async fn test_drop_list_rename() {
        let catalog = MemoryCatalog::new();
        for name in ["b", "a", "c"] {
            catalog.create_binding(&ident(name), &loc(0)).await.unwrap();
        }
        let other = TableIdent::parse("other.z").unwrap();
        catalog.create_binding(&other, &loc(9)).await.unwrap();

        let listed = catalog.list_bindings(&Namespace::single("db").unwrap()).await.unwrap();
        assert_eq!(listed, vec![ident("a"), ident("b"), ident("c")]);

        assert_eq!(catalog.drop_binding(&ident("c")).await.unwrap(), loc(0));
        assert!(catalog.drop_binding(&ident("c")).await.unwrap_err().is_not_found());

        catalog.rename_binding(&ident("a"), &ident("d")).await.unwrap();
        assert!(!catalog.exists(&ident("a")).await.unwrap());
        assert!(catalog.exists(&ident("d")).await.unwrap());

        let err = catalog.rename_binding(&ident("b"), &ident("d")).await.unwrap_err();
        assert!(err.is_already_exists());
        assert!(catalog.exists(&ident("b")).await.unwrap());
        assert_eq!(catalog.len(), 3);
    }
}
