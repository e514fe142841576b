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

use super::location::{metadata_file_location, next_metadata_location};
use super::{RetryPolicy, TableChange, UpdateProducer};
use crate::catalog::{Catalog, MetadataLocation, SwapOutcome, TableIdent};
use crate::error::{Error, ValidationErr};
use crate::io::FileIO;
use crate::manifest::{ManifestListReader, read_manifest_for_table};
use crate::metadata::{MetadataLogEntry, TableMetadata};
use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Table property bounding the metadata log
pub const METADATA_PREVIOUS_VERSIONS_MAX: &str = "write.metadata.previous-versions-max";
const DEFAULT_PREVIOUS_VERSIONS_MAX: usize = 100;

fn previous_versions_max(metadata: &TableMetadata) -> Result<usize, ValidationErr> {
    match metadata.property(METADATA_PREVIOUS_VERSIONS_MAX) {
        None => Ok(DEFAULT_PREVIOUS_VERSIONS_MAX),
        Some(v) => v.trim().parse().map_err(|_| {
            ValidationErr::invalid(format!(
                "table property {METADATA_PREVIOUS_VERSIONS_MAX} has invalid value {v:?}"
            ))
        }),
    }
}

/// Deletes `locations`, logging failures
async fn cleanup(io: &dyn FileIO, locations: impl IntoIterator<Item = &str>) {
    for location in locations {
        if let Err(e) = io.delete(location).await {
            log::warn!("failed to clean up {location}: {e}");
        }
    }
}

/// Reads the metadata document the catalog points at
pub async fn load_metadata(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
) -> Result<(Arc<TableMetadata>, MetadataLocation), Error> {
    let location = catalog.lookup(ident).await?;
    let data = io.read(location.as_str()).await?;
    let metadata = TableMetadata::from_json(&data)?;
    Ok((Arc::new(metadata), location))
}

/// Commits `change` on top of `base`, which was read from `base_location`
///
/// Requirements are checked and updates applied before anything is
/// written, so a validation failure leaves storage and catalog untouched.
/// A change without updates commits nothing and returns the base.
///
/// When the catalog pointer has moved the files written for this attempt
/// are deleted and [`Error::CommitConflict`] is returned. Any other catalog
/// failure leaves the commit outcome unknown, so the files are kept.
pub async fn commit(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
    base: &TableMetadata,
    base_location: &MetadataLocation,
    change: TableChange,
) -> Result<(Arc<TableMetadata>, MetadataLocation), Error> {
    for requirement in &change.requirements {
        requirement.check(Some(base))?;
    }
    if change.is_empty() {
        log::debug!("nothing to commit for {ident}");
        return Ok((Arc::new(base.clone()), base_location.clone()));
    }
    let applied = base.apply(&change.updates)?;
    let previous = MetadataLogEntry {
        timestamp_ms: base.last_updated_ms(),
        metadata_file: base_location.to_string(),
    };
    let max_entries = previous_versions_max(&applied)?;
    let metadata = applied.with_previous_metadata(previous, max_entries);
    let location = next_metadata_location(&metadata, base_location)?;
    let json = Bytes::from(metadata.to_json()?);

    let mut written: Vec<&str> = Vec::with_capacity(change.staged_files.len() + 1);
    for (path, data) in &change.staged_files {
        if let Err(e) = io.write(path, data.clone()).await {
            cleanup(io, written).await;
            return Err(e);
        }
        written.push(path);
    }
    if let Err(e) = io.write(location.as_str(), json).await {
        cleanup(io, written).await;
        return Err(e);
    }
    written.push(location.as_str());

    match catalog.compare_and_swap(ident, base_location, &location).await {
        Ok(SwapOutcome::Swapped) => {
            log::info!("committed {ident}: {base_location} -> {location}");
            Ok((Arc::new(metadata), location))
        }
        Ok(SwapOutcome::Conflict { actual }) => {
            log::info!("commit conflict on {ident}: expected {base_location}, found {actual}");
            cleanup(io, written).await;
            Err(Error::CommitConflict {
                table: ident.to_string(),
                attempts: 1,
            })
        }
        Err(e) if e.is_not_found() => {
            cleanup(io, written).await;
            Err(e)
        }
        Err(e) => {
            log::warn!("commit state of {ident} unknown, keeping {location}: {e}");
            Err(e)
        }
    }
}

/// Commits the change produced against the latest metadata, retrying on conflict
///
/// Every attempt reloads the table and asks `producer` for a new change.
/// `policy` supplies the defaults; the table's `commit.retry.*` properties
/// override them. Only [`Error::CommitConflict`] is retried, and once the
/// retries or the total timeout are used up it is returned with the number
/// of attempts made.
pub async fn commit_with_retry(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
    producer: &dyn UpdateProducer,
    policy: &RetryPolicy,
) -> Result<(Arc<TableMetadata>, MetadataLocation), Error> {
    let start = Instant::now();
    let mut effective: Option<RetryPolicy> = None;
    let mut attempt = 1;
    loop {
        let (base, base_location) = load_metadata(catalog, io, ident).await?;
        let policy = match effective {
            Some(p) => p,
            None => *effective.insert(policy.with_properties(base.properties())?),
        };
        let change = producer.produce(&base, io, attempt).await?;
        log::debug!("commit attempt {attempt} on {ident} from {base_location}");
        match commit(catalog, io, ident, &base, &base_location, change).await {
            Err(e) if e.is_retryable() => {
                if attempt > policy.num_retries || start.elapsed() >= policy.total_timeout() {
                    log::warn!("giving up on {ident} after {attempt} attempt(s)");
                    return Err(Error::CommitConflict {
                        table: ident.to_string(),
                        attempts: attempt,
                    });
                }
                let wait = policy.backoff(attempt);
                log::info!("retrying commit on {ident} in {wait:?} (attempt {attempt} conflicted)");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Binds `ident` to an existing metadata file
///
/// Nothing is written to storage. With `validate` the file is read, parsed
/// and checked first and the parsed metadata is returned. Fails with
/// [`Error::TableAlreadyExists`] if `ident` is bound, leaving that binding
/// unchanged.
pub async fn register_table(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
    location: &MetadataLocation,
    validate: bool,
) -> Result<Option<Arc<TableMetadata>>, Error> {
    let metadata = if validate {
        let data = io.read(location.as_str()).await?;
        let metadata = TableMetadata::from_json(&data)?;
        metadata.validate()?;
        Some(Arc::new(metadata))
    } else {
        None
    };
    catalog.create_binding(ident, location).await?;
    log::info!("registered {ident} at {location}");
    Ok(metadata)
}

/// Writes version 0 of a new table and binds `ident` to it
pub async fn create_table(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
    metadata: TableMetadata,
) -> Result<(Arc<TableMetadata>, MetadataLocation), Error> {
    if catalog.exists(ident).await? {
        return Err(Error::TableAlreadyExists {
            table: ident.to_string(),
        });
    }
    let location = metadata_file_location(&metadata, 0)?;
    io.write(location.as_str(), Bytes::from(metadata.to_json()?))
        .await?;
    if let Err(e) = catalog.create_binding(ident, &location).await {
        if e.is_already_exists() {
            cleanup(io, [location.as_str()]).await;
        }
        return Err(e);
    }
    log::info!("created {ident} at {location}");
    Ok((Arc::new(metadata), location))
}

/// Removes the binding of `ident` and returns the location it held
///
/// With `purge` the files reachable from the current metadata are deleted
/// as well: data files, manifests, manifest lists and metadata files.
/// Purging is best effort; failures are logged and skipped.
pub async fn drop_table(
    catalog: &dyn Catalog,
    io: &dyn FileIO,
    ident: &TableIdent,
    purge: bool,
) -> Result<MetadataLocation, Error> {
    let metadata = if purge {
        Some(load_metadata(catalog, io, ident).await?.0)
    } else {
        None
    };
    let location = catalog.drop_binding(ident).await?;
    log::info!("dropped {ident} (was {location})");
    if let Some(metadata) = metadata {
        purge_files(io, &metadata, &location).await;
    }
    Ok(location)
}

async fn purge_files(io: &dyn FileIO, metadata: &TableMetadata, location: &MetadataLocation) {
    let mut manifests = BTreeSet::new();
    let mut files = BTreeSet::new();
    for snapshot in metadata.snapshots() {
        let list = match io.read(&snapshot.manifest_list).await {
            Ok(data) => ManifestListReader::open(data),
            Err(e) => {
                log::warn!("purge: cannot read {}: {e}", snapshot.manifest_list);
                continue;
            }
        };
        let list = match list {
            Ok(list) => list,
            Err(e) => {
                log::warn!("purge: cannot decode {}: {e}", snapshot.manifest_list);
                continue;
            }
        };
        for manifest in list.flatten() {
            if !manifests.insert(manifest.manifest_path.clone()) {
                continue;
            }
            let entries = match io.read(&manifest.manifest_path).await {
                Ok(data) => read_manifest_for_table(metadata, &manifest, data),
                Err(e) => {
                    log::warn!("purge: cannot read {}: {e}", manifest.manifest_path);
                    continue;
                }
            };
            match entries {
                Ok(entries) => files.extend(entries.flatten().map(|e| e.data_file.file_path)),
                Err(e) => log::warn!("purge: cannot decode {}: {e}", manifest.manifest_path),
            }
        }
    }
    log::info!(
        "purging {} data files and {} manifests of {location}",
        files.len(),
        manifests.len()
    );
    cleanup(io, files.iter().map(String::as_str)).await;
    cleanup(io, manifests.iter().map(String::as_str)).await;
    let manifest_lists: Vec<&str> = metadata.snapshots().map(|s| s.manifest_list.as_str()).collect();
    cleanup(io, manifest_lists).await;
    let metadata_files: Vec<&str> =
        metadata.metadata_log().iter().map(|e| e.metadata_file.as_str()).collect();
    cleanup(io, metadata_files).await;
    cleanup(io, [location.as_str()]).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::commit::{AppendFiles, compute_with};
    use crate::io::MemoryFileIO;
    use crate::manifest::DataFile;
    use crate::metadata::{
        NestedField, Operation, PartitionSpec, PrimitiveType, Schema, Snapshot, SortOrder,
        Summary, TableUpdate,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ident() -> TableIdent {
        TableIdent::parse("db.events").unwrap()
    }

    fn new_metadata(properties: HashMap<String, String>) -> TableMetadata {
        TableMetadata::create(
            Schema::new(0, vec![NestedField::required(1, "id", PrimitiveType::Long)]),
            PartitionSpec::unpartitioned(),
            SortOrder::unsorted(),
            "mem://wh/db/events",
            properties,
            2,
        )
        .unwrap()
    }

    fn file(path: &str) -> DataFile {
        DataFile::builder()
            .file_path(path)
            .record_count(1)
            .file_size_in_bytes(100)
            .build()
    }

    fn fast_retries(num_retries: u32) -> RetryPolicy {
        RetryPolicy {
            num_retries,
            min_wait_ms: 1,
            max_wait_ms: 5,
            total_timeout_ms: 60_000,
        }
    }

    async fn setup() -> (MemoryCatalog, MemoryFileIO, MetadataLocation) {
        let catalog = MemoryCatalog::new();
        let io = MemoryFileIO::new();
        let (_, location) = create_table(&catalog, &io, &ident(), new_metadata(HashMap::new()))
            .await
            .unwrap();
        (catalog, io, location)
    }

    #[tokio::test]
    async fn test_create_and_commit() {
        let (catalog, io, v0) = setup().await;
        assert!(v0.as_str().starts_with("mem://wh/db/events/metadata/00000-"));

        let (base, loc) = load_metadata(&catalog, &io, &ident()).await.unwrap();
        assert_eq!(loc, v0);
        let snapshot_before = base.as_ref().clone();

        let change = AppendFiles::new()
            .add_file(file("d1.parquet"))
            .produce(&base, &io, 1)
            .await
            .unwrap();
        let (committed, v1) = commit(&catalog, &io, &ident(), &base, &loc, change).await.unwrap();
        assert_eq!(*base, snapshot_before);
        assert!(v1.as_str().contains("/metadata/00001-"));
        assert_eq!(catalog.lookup(&ident()).await.unwrap(), v1);
        assert_eq!(committed.current_snapshot().unwrap().sequence_number, 1);
        assert_eq!(committed.metadata_log().last().unwrap().metadata_file, v0.as_str());
    }

    #[tokio::test]
    async fn test_create_existing() {
        let (catalog, io, v0) = setup().await;
        let before = io.list("mem://").len();
        let err = create_table(&catalog, &io, &ident(), new_metadata(HashMap::new()))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(io.list("mem://").len(), before);
        assert_eq!(catalog.lookup(&ident()).await.unwrap(), v0);
    }

    #[tokio::test]
    async fn test_conflict_cleans_up() {
        let (catalog, io, v0) = setup().await;
        let (base, _) = load_metadata(&catalog, &io, &ident()).await.unwrap();

        let first = AppendFiles::new().add_file(file("a.parquet")).produce(&base, &io, 1).await.unwrap();
        let second = AppendFiles::new().add_file(file("b.parquet")).produce(&base, &io, 1).await.unwrap();
        let second_files: Vec<String> = second.staged_files.iter().map(|(p, _)| p.clone()).collect();

        commit(&catalog, &io, &ident(), &base, &v0, first).await.unwrap();
        let files_after_first = io.list("mem://");
        let err = commit(&catalog, &io, &ident(), &base, &v0, second).await.unwrap_err();
        assert!(matches!(err, Error::CommitConflict { attempts: 1, .. }));
        assert_eq!(io.list("mem://"), files_after_first);
        for path in second_files {
            assert!(!io.exists(&path).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_stale_sequence_rejected() {
        let (catalog, io, v0) = setup().await;
        let (base, _) = load_metadata(&catalog, &io, &ident()).await.unwrap();
        let change = AppendFiles::new().add_file(file("a.parquet")).produce(&base, &io, 1).await.unwrap();
        let (m1, v1) = commit(&catalog, &io, &ident(), &base, &v0, change).await.unwrap();
        let files_before = io.list("mem://");

        let current = m1.current_snapshot().unwrap();
        let stale = Snapshot {
            snapshot_id: current.snapshot_id + 1,
            parent_snapshot_id: Some(current.snapshot_id),
            sequence_number: m1.last_sequence_number(),
            timestamp_ms: current.timestamp_ms,
            manifest_list: current.manifest_list.clone(),
            summary: Summary::new(Operation::Append),
            schema_id: Some(0),
        };
        let err = commit(
            &catalog,
            &io,
            &ident(),
            &m1,
            &v1,
            TableChange::new(vec![TableUpdate::AddSnapshot { snapshot: stale }]),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationErr::StaleSequenceNumber { .. })
        ));
        assert_eq!(catalog.lookup(&ident()).await.unwrap(), v1);
        assert_eq!(io.list("mem://"), files_before);
    }

    #[tokio::test]
    async fn test_retry_after_conflict() {
        let (catalog, io, _) = setup().await;
        let calls = AtomicU32::new(0);
        let interferer = (catalog.clone(), io.clone());
        let producer = compute_with(|base: TableMetadata, attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            let (catalog, io) = interferer.clone();
            async move {
                if attempt == 1 {
                    // another writer wins the race
                    let change = AppendFiles::new().add_file(file("other.parquet")).produce(&base, &io, 1).await?;
                    let location = catalog.lookup(&ident()).await?;
                    commit(&catalog, &io, &ident(), &base, &location, change).await?;
                }
                AppendFiles::new().add_file(file("mine.parquet")).produce(&base, &io, attempt).await
            }
        });
        let (m, _) = commit_with_retry(&catalog, &io, &ident(), &producer, &fast_retries(3))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let snapshot = m.current_snapshot().unwrap();
        assert_eq!(snapshot.sequence_number, 2);
        assert_eq!(snapshot.summary.counter("total-data-files"), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let (catalog, io, _) = setup().await;
        let producer = compute_with(|base: TableMetadata, _| {
            let (catalog, io) = (catalog.clone(), io.clone());
            async move {
                let change = AppendFiles::new().add_file(file("x.parquet")).produce(&base, &io, 1).await?;
                let location = catalog.lookup(&ident()).await?;
                commit(&catalog, &io, &ident(), &base, &location, change).await?;
                AppendFiles::new().add_file(file("y.parquet")).produce(&base, &io, 1).await
            }
        });
        let err = commit_with_retry(&catalog, &io, &ident(), &producer, &fast_retries(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommitConflict { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_validation_not_retried() {
        let (catalog, io, _) = setup().await;
        let calls = AtomicU32::new(0);
        let producer = compute_with(|_base: TableMetadata, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(TableChange::new(vec![TableUpdate::SetCurrentSchema { schema_id: 42 }])) }
        });
        let err = commit_with_retry(&catalog, &io, &ident(), &producer, &fast_retries(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_table_properties_override_policy() {
        let catalog = MemoryCatalog::new();
        let io = MemoryFileIO::new();
        let properties = HashMap::from([("commit.retry.num-retries".to_string(), "0".to_string())]);
        create_table(&catalog, &io, &ident(), new_metadata(properties)).await.unwrap();
        let producer = compute_with(|base: TableMetadata, _| {
            let (catalog, io) = (catalog.clone(), io.clone());
            async move {
                let change = AppendFiles::new().add_file(file("x.parquet")).produce(&base, &io, 1).await?;
                let location = catalog.lookup(&ident()).await?;
                commit(&catalog, &io, &ident(), &base, &location, change).await?;
                AppendFiles::new().add_file(file("y.parquet")).produce(&base, &io, 1).await
            }
        });
        let err = commit_with_retry(&catalog, &io, &ident(), &producer, &fast_retries(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommitConflict { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_metadata_log_trimmed() {
        let catalog = MemoryCatalog::new();
        let io = MemoryFileIO::new();
        let properties = HashMap::from([(METADATA_PREVIOUS_VERSIONS_MAX.to_string(), "2".to_string())]);
        create_table(&catalog, &io, &ident(), new_metadata(properties)).await.unwrap();
        for i in 0..4 {
            let append = AppendFiles::new().add_file(file(&format!("{i}.parquet")));
            commit_with_retry(&catalog, &io, &ident(), &append, &fast_retries(0)).await.unwrap();
        }
        let (m, _) = load_metadata(&catalog, &io, &ident()).await.unwrap();
        assert_eq!(m.metadata_log().len(), 2);
        assert!(m.metadata_log()[1].metadata_file.contains("/00003-"));
    }

    #[tokio::test]
    async fn test_register_drop_register() {
        let (catalog, io, v0) = setup().await;
        let append = AppendFiles::new().add_file(file("a.parquet"));
        let (_, v1) = commit_with_retry(&catalog, &io, &ident(), &append, &fast_retries(0)).await.unwrap();

        assert_eq!(drop_table(&catalog, &io, &ident(), false).await.unwrap(), v1);
        assert!(!catalog.exists(&ident()).await.unwrap());
        assert!(io.exists(v1.as_str()).await.unwrap());

        let registered = register_table(&catalog, &io, &ident(), &v1, true).await.unwrap().unwrap();
        assert_eq!(registered.current_snapshot().unwrap().sequence_number, 1);
        assert_eq!(catalog.lookup(&ident()).await.unwrap(), v1);

        let err = register_table(&catalog, &io, &ident(), &v0, false).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(catalog.lookup(&ident()).await.unwrap(), v1);
    }

    #[tokio::test]
    async fn test_register_validates() {
        let catalog = MemoryCatalog::new();
        let io = MemoryFileIO::new();
        let missing = MetadataLocation::new("mem://wh/none.metadata.json").unwrap();
        let err = register_table(&catalog, &io, &ident(), &missing, true).await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert!(!catalog.exists(&ident()).await.unwrap());

        io.write("mem://wh/bad.metadata.json", Bytes::from_static(b"{}")).await.unwrap();
        let bad = MetadataLocation::new("mem://wh/bad.metadata.json").unwrap();
        assert!(matches!(
            register_table(&catalog, &io, &ident(), &bad, true).await,
            Err(Error::Json(_))
        ));
        assert!(register_table(&catalog, &io, &ident(), &bad, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_purge() {
        let (catalog, io, _) = setup().await;
        io.write("mem://wh/db/events/data/a.parquet", Bytes::from_static(b"PAR1")).await.unwrap();
        let append = AppendFiles::new().add_file(file("mem://wh/db/events/data/a.parquet"));
        commit_with_retry(&catalog, &io, &ident(), &append, &fast_retries(0)).await.unwrap();

        drop_table(&catalog, &io, &ident(), true).await.unwrap();
        assert_eq!(io.list("mem://wh/db/events/"), Vec::<String>::new());
        assert!(drop_table(&catalog, &io, &ident(), false).await.unwrap_err().is_not_found());
    }
}
