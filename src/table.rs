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

//! Handle on one loaded table version

use crate::catalog::{MetadataLocation, TableIdent};
use crate::error::Error;
use crate::io::FileIO;
use crate::manifest::{
    DataFile, ManifestContent, ManifestEntry, ManifestFile, ManifestListReader, read_manifest_for_table,
};
use crate::metadata::{Snapshot, TableMetadata};
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Stream of data files, see [`Table::data_files`]
pub type DataFileStream = Pin<Box<dyn Stream<Item = Result<DataFile, Error>> + Send>>;

/// A table as of the metadata version it was loaded at
///
/// The handle never refreshes itself; load the table again to observe
/// later commits.
#[derive(Clone, Debug)]
pub struct Table {
    ident: TableIdent,
    metadata: Arc<TableMetadata>,
    metadata_location: MetadataLocation,
    io: Arc<dyn FileIO>,
}

impl Table {
    pub fn new(
        ident: TableIdent,
        metadata: Arc<TableMetadata>,
        metadata_location: MetadataLocation,
        io: Arc<dyn FileIO>,
    ) -> Self {
        Table {
            ident,
            metadata,
            metadata_location,
            io,
        }
    }

    pub fn ident(&self) -> &TableIdent {
        &self.ident
    }

    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    pub fn metadata_location(&self) -> &MetadataLocation {
        &self.metadata_location
    }

    pub fn current_snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.metadata.current_snapshot()
    }

    /// Manifest-list entries of the current snapshot; empty when there is none
    pub async fn manifests(&self) -> Result<Vec<ManifestFile>, Error> {
        let Some(snapshot) = self.current_snapshot() else {
            return Ok(Vec::new());
        };
        let data = self.io.read(&snapshot.manifest_list).await?;
        Ok(ManifestListReader::open(data)?.collect::<Result<_, _>>()?)
    }

    /// Live data files of the current snapshot
    ///
    /// Manifests for which `filter` returns false are skipped without being
    /// read, so a filter over partition summaries prunes whole manifests.
    /// Entries are decoded lazily as the stream is polled.
    pub fn data_files<F>(&self, filter: F) -> DataFileStream
    where
        F: Fn(&ManifestFile) -> bool + Send + 'static,
    {
        let table = self.clone();
        Box::pin(async_stream::try_stream! {
            for manifest in table.manifests().await? {
                if manifest.content != ManifestContent::Data || !filter(&manifest) {
                    continue;
                }
                let data = table.io.read(&manifest.manifest_path).await?;
                let mut reader = read_manifest_for_table(&table.metadata, &manifest, data).map_err(Error::from)?;
                let mut entry = ManifestEntry::default();
                while reader.next_into(&mut entry).map_err(Error::from)? {
                    if entry.is_alive() {
                        yield entry.data_file.clone();
                    }
                }
            }
        })
    }

    /// Collects [`Table::data_files`] without pruning
    pub async fn all_data_files(&self) -> Result<Vec<DataFile>, Error> {
        use futures_util::TryStreamExt;
        self.data_files(|_| true).try_collect().await
    }
}
