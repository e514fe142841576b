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

//! Snapshot producers: append, delete and overwrite of data files

use super::location::{manifest_list_location, manifest_location, new_snapshot_id};
use super::{TableChange, UpdateProducer};
use crate::avro::Codec;
use crate::error::{Error, ValidationErr};
use crate::io::FileIO;
use crate::manifest::{
    DataContentType, DataFile, ManifestContent, ManifestEntry, ManifestFile, ManifestListReader,
    ManifestListWriter, ManifestWriter, read_manifest_for_table,
};
use crate::metadata::table_metadata::now_ms;
use crate::metadata::{
    MAIN_BRANCH, Operation, Snapshot, SnapshotReference, Summary, TableMetadata, TableRequirement,
    TableUpdate,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Table property selecting the manifest container codec
pub const AVRO_COMPRESSION_CODEC: &str = "write.avro.compression-codec";

const ADDED_DATA_FILES: &str = "added-data-files";
const ADDED_RECORDS: &str = "added-records";
const ADDED_FILE_SIZE: &str = "added-files-size";
const DELETED_DATA_FILES: &str = "deleted-data-files";
const DELETED_RECORDS: &str = "deleted-records";
const REMOVED_FILE_SIZE: &str = "removed-files-size";
const TOTAL_DATA_FILES: &str = "total-data-files";
const TOTAL_RECORDS: &str = "total-records";
const TOTAL_FILE_SIZE: &str = "total-files-size";

#[derive(Debug, Default)]
struct FileStats {
    files: i64,
    records: i64,
    size: i64,
}

impl FileStats {
    fn add(&mut self, file: &DataFile) {
        self.files += 1;
        self.records += file.record_count;
        self.size += file.file_size_in_bytes;
    }
}

/// What a snapshot adds and removes
#[derive(Debug, Clone, Default)]
struct SnapshotChanges {
    added: Vec<DataFile>,
    deleted: BTreeSet<String>,
    properties: HashMap<String, String>,
}

impl SnapshotChanges {
    /// Writes the manifests and manifest list for one attempt
    async fn produce(
        &self,
        operation: Operation,
        base: &TableMetadata,
        io: &dyn FileIO,
        attempt: u32,
    ) -> Result<TableChange, Error> {
        let format_version = base.format_version();
        let parent = base.current_snapshot();
        let parent_id = parent.map(|p| p.snapshot_id);
        let snapshot_id = new_snapshot_id(base);
        let sequence_number = base.next_sequence_number();
        let commit_uuid = Uuid::new_v4();
        let codec = match base.property(AVRO_COMPRESSION_CODEC) {
            Some(name) => Codec::from_property(name)?,
            None => Codec::Null,
        };
        let schema = base.current_schema().clone();

        let mut change = TableChange::default();
        let mut manifests: Vec<ManifestFile> = Vec::new();
        let mut added = FileStats::default();
        let mut deleted = FileStats::default();

        if !self.added.is_empty() {
            let mut writer = ManifestWriter::new(
                format_version,
                snapshot_id,
                schema.clone(),
                base.default_partition_spec().as_ref().clone(),
                ManifestContent::Data,
                codec,
            )?;
            for file in &self.added {
                if file.content != DataContentType::Data {
                    return Err(ValidationErr::invalid(format!(
                        "{} is a delete file; only data files can be appended",
                        file.file_path
                    ))
                    .into());
                }
                added.add(file);
                writer.add(file.clone())?;
            }
            let path = manifest_location(base, commit_uuid, manifests.len() as u32);
            let (bytes, manifest) = writer.finish(path.as_str())?;
            change.staged_files.push((path, bytes));
            manifests.push(manifest);
        }

        let mut found: BTreeSet<&str> = BTreeSet::new();
        if let Some(parent) = parent {
            let data = io.read(&parent.manifest_list).await?;
            for manifest in ManifestListReader::open(data)? {
                let manifest = manifest?;
                let rewrite = !self.deleted.is_empty()
                    && manifest.content == ManifestContent::Data
                    && (manifest.has_added_files() || manifest.has_existing_files());
                if !rewrite {
                    manifests.push(manifest);
                    continue;
                }

                let data = io.read(&manifest.manifest_path).await?;
                let reader = read_manifest_for_table(base, &manifest, data)?;
                let manifest_schema = reader.metadata().schema.clone();
                let manifest_spec = reader.metadata().partition_spec.clone();
                // deletes recorded by earlier snapshots are not carried forward
                let entries: Vec<ManifestEntry> = reader
                    .filter(|e| e.as_ref().map_or(true, ManifestEntry::is_alive))
                    .collect::<Result<_, _>>()?;
                if !entries.iter().any(|e| self.deleted.contains(e.file_path())) {
                    manifests.push(manifest);
                    continue;
                }

                let mut writer = ManifestWriter::new(
                    format_version,
                    snapshot_id,
                    manifest_schema,
                    manifest_spec,
                    ManifestContent::Data,
                    codec,
                )?;
                for entry in entries {
                    match self.deleted.get(entry.file_path()) {
                        Some(path) => {
                            found.insert(path.as_str());
                            deleted.add(&entry.data_file);
                            writer.delete(entry)?;
                        }
                        None => writer.existing(entry)?,
                    }
                }
                let path = manifest_location(base, commit_uuid, manifests.len() as u32);
                log::debug!(
                    "rewrote manifest {} as {path} ({} entries)",
                    manifest.manifest_path,
                    writer.entry_count()
                );
                let (bytes, rewritten) = writer.finish(path.as_str())?;
                change.staged_files.push((path, bytes));
                manifests.push(rewritten);
            }
        }

        if let Some(missing) = self.deleted.iter().find(|p| !found.contains(p.as_str())) {
            return Err(ValidationErr::invalid(format!(
                "cannot delete {missing}: file is not part of the current snapshot"
            ))
            .into());
        }

        let mut list = ManifestListWriter::new(format_version, snapshot_id, parent_id, sequence_number, codec);
        list.add_all(&manifests)?;
        let list_path = manifest_list_location(base, snapshot_id, attempt, commit_uuid);
        change.staged_files.push((list_path.clone(), list.finish()?));

        let summary = self.summary(operation, parent.map(|p| &p.summary), &added, &deleted);
        let snapshot = Snapshot {
            snapshot_id,
            parent_snapshot_id: parent_id,
            sequence_number,
            timestamp_ms: now_ms(),
            manifest_list: list_path,
            summary,
            schema_id: Some(schema.schema_id),
        };
        log::debug!(
            "produced {} snapshot {snapshot_id} (sequence {sequence_number}, {} manifests, attempt {attempt})",
            operation.as_str(),
            manifests.len()
        );

        change.requirements.push(TableRequirement::AssertRefSnapshotId {
            r#ref: MAIN_BRANCH.to_string(),
            snapshot_id: parent_id,
        });
        change.updates.push(TableUpdate::AddSnapshot { snapshot });
        change.updates.push(TableUpdate::SetSnapshotRef {
            ref_name: MAIN_BRANCH.to_string(),
            reference: SnapshotReference::branch(snapshot_id),
        });
        Ok(change)
    }

    fn summary(
        &self,
        operation: Operation,
        previous: Option<&Summary>,
        added: &FileStats,
        deleted: &FileStats,
    ) -> Summary {
        let mut summary = Summary::new(operation);
        summary.properties.extend(self.properties.clone());
        let mut set = |key: &str, value: i64| {
            summary.properties.insert(key.to_string(), value.to_string());
        };
        if added.files > 0 {
            set(ADDED_DATA_FILES, added.files);
            set(ADDED_RECORDS, added.records);
            set(ADDED_FILE_SIZE, added.size);
        }
        if deleted.files > 0 {
            set(DELETED_DATA_FILES, deleted.files);
            set(DELETED_RECORDS, deleted.records);
            set(REMOVED_FILE_SIZE, deleted.size);
        }
        let total = |key: &str, plus: i64, minus: i64| previous.map_or(0, |s| s.counter(key)) + plus - minus;
        set(TOTAL_DATA_FILES, total(TOTAL_DATA_FILES, added.files, deleted.files));
        set(TOTAL_RECORDS, total(TOTAL_RECORDS, added.records, deleted.records));
        set(TOTAL_FILE_SIZE, total(TOTAL_FILE_SIZE, added.size, deleted.size));
        summary
    }
}

/// Appends data files in a new manifest, carrying every parent manifest over
#[derive(Debug, Clone, Default)]
pub struct AppendFiles {
    changes: SnapshotChanges,
}

impl AppendFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, file: DataFile) -> Self {
        self.changes.added.push(file);
        self
    }

    pub fn add_files(mut self, files: impl IntoIterator<Item = DataFile>) -> Self {
        self.changes.added.extend(files);
        self
    }

    /// Extra snapshot summary property
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.changes.properties.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl UpdateProducer for AppendFiles {
    async fn produce(&self, base: &TableMetadata, io: &dyn FileIO, attempt: u32) -> Result<TableChange, Error> {
        self.changes.produce(Operation::Append, base, io, attempt).await
    }
}

/// Removes data files by path
///
/// Only manifests holding one of the paths are rewritten. Every path must
/// be live in the current snapshot.
#[derive(Debug, Clone, Default)]
pub struct DeleteFiles {
    changes: SnapshotChanges,
}

impl DeleteFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_file(mut self, path: impl Into<String>) -> Self {
        self.changes.deleted.insert(path.into());
        self
    }

    pub fn delete_files<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.changes.deleted.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.changes.properties.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl UpdateProducer for DeleteFiles {
    async fn produce(&self, base: &TableMetadata, io: &dyn FileIO, attempt: u32) -> Result<TableChange, Error> {
        self.changes.produce(Operation::Delete, base, io, attempt).await
    }
}

/// Deletes and adds data files in one snapshot
#[derive(Debug, Clone, Default)]
pub struct OverwriteFiles {
    changes: SnapshotChanges,
}

impl OverwriteFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, file: DataFile) -> Self {
        self.changes.added.push(file);
        self
    }

    pub fn delete_file(mut self, path: impl Into<String>) -> Self {
        self.changes.deleted.insert(path.into());
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.changes.properties.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl UpdateProducer for OverwriteFiles {
    async fn produce(&self, base: &TableMetadata, io: &dyn FileIO, attempt: u32) -> Result<TableChange, Error> {
        self.changes.produce(Operation::Overwrite, base, io, attempt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFileIO;
    use crate::manifest::{ManifestReader, ManifestStatus};
    use crate::metadata::{NestedField, PartitionSpec, PrimitiveType, Schema, SortOrder};

    fn table() -> TableMetadata {
        TableMetadata::create(
            Schema::new(0, vec![NestedField::required(1, "id", PrimitiveType::Long)]),
            PartitionSpec::unpartitioned(),
            SortOrder::unsorted(),
            "mem://wh/db/t",
            HashMap::new(),
            2,
        )
        .unwrap()
    }

    fn file(path: &str, records: i64) -> DataFile {
        DataFile::builder()
            .file_path(path)
            .record_count(records)
            .file_size_in_bytes(records * 10)
            .build()
    }

    /// Stages the files of `change` and applies its updates
    async fn apply(io: &MemoryFileIO, base: &TableMetadata, change: TableChange) -> TableMetadata {
        for (location, data) in change.staged_files {
            io.write(&location, data).await.unwrap();
        }
        for r in &change.requirements {
            r.check(Some(base)).unwrap();
        }
        base.apply(&change.updates).unwrap()
    }

    async fn live_paths(io: &MemoryFileIO, m: &TableMetadata) -> Vec<String> {
        let snapshot = m.current_snapshot().unwrap();
        let mut paths = Vec::new();
        for manifest in ManifestListReader::open(io.read(&snapshot.manifest_list).await.unwrap()).unwrap() {
            let manifest = manifest.unwrap();
            let data = io.read(&manifest.manifest_path).await.unwrap();
            for entry in read_manifest_for_table(m, &manifest, data).unwrap() {
                let entry = entry.unwrap();
                if entry.is_alive() {
                    paths.push(entry.file_path().to_string());
                }
            }
        }
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_append_then_delete() {
        let io = MemoryFileIO::new();
        let base = table();

        let append = AppendFiles::new().add_file(file("a.parquet", 10)).add_file(file("b.parquet", 5));
        let change = append.produce(&base, &io, 1).await.unwrap();
        assert_eq!(change.staged_files.len(), 2);
        let m1 = apply(&io, &base, change).await;
        let s1 = m1.current_snapshot().unwrap();
        assert_eq!(s1.sequence_number, 1);
        assert_eq!(s1.parent_snapshot_id, None);
        assert_eq!(s1.summary.operation, Operation::Append);
        assert_eq!(s1.summary.counter(ADDED_DATA_FILES), 2);
        assert_eq!(s1.summary.counter(TOTAL_RECORDS), 15);

        let m2 = apply(&io, &m1, AppendFiles::new().add_file(file("c.parquet", 1)).produce(&m1, &io, 1).await.unwrap()).await;
        assert_eq!(live_paths(&io, &m2).await, vec!["a.parquet", "b.parquet", "c.parquet"]);

        let delete = DeleteFiles::new().delete_file("a.parquet");
        let m3 = apply(&io, &m2, delete.produce(&m2, &io, 1).await.unwrap()).await;
        let s3 = m3.current_snapshot().unwrap();
        assert_eq!(s3.sequence_number, 3);
        assert_eq!(s3.summary.counter(DELETED_DATA_FILES), 1);
        assert_eq!(s3.summary.counter(TOTAL_DATA_FILES), 2);
        assert_eq!(s3.summary.counter(TOTAL_RECORDS), 6);
        assert_eq!(live_paths(&io, &m3).await, vec!["b.parquet", "c.parquet"]);
    }

    #[tokio::test]
    async fn test_delete_marks_entries() {
        let io = MemoryFileIO::new();
        let base = table();
        let m1 = apply(&io, &base, AppendFiles::new().add_file(file("a.parquet", 1)).add_file(file("b.parquet", 1)).produce(&base, &io, 1).await.unwrap()).await;
        let m2 = apply(&io, &m1, DeleteFiles::new().delete_file("b.parquet").produce(&m1, &io, 1).await.unwrap()).await;

        let list = io.read(&m2.current_snapshot().unwrap().manifest_list).await.unwrap();
        let manifests: Vec<ManifestFile> = ManifestListReader::open(list).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].existing_files_count, Some(1));
        assert_eq!(manifests[0].deleted_files_count, Some(1));

        let entries: Vec<ManifestEntry> = ManifestReader::open(io.read(&manifests[0].manifest_path).await.unwrap())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let statuses: Vec<_> = entries.iter().map(|e| (e.file_path().to_string(), e.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("a.parquet".to_string(), ManifestStatus::Existing),
                ("b.parquet".to_string(), ManifestStatus::Deleted),
            ]
        );
        assert_eq!(entries[0].sequence_number, Some(1));
    }

    #[tokio::test]
    async fn test_delete_unknown_path() {
        let io = MemoryFileIO::new();
        let base = table();
        let m1 = apply(&io, &base, AppendFiles::new().add_file(file("a.parquet", 1)).produce(&base, &io, 1).await.unwrap()).await;
        let err = DeleteFiles::new().delete_file("zzz.parquet").produce(&m1, &io, 1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = DeleteFiles::new().delete_file("a.parquet").produce(&base, &io, 1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let io = MemoryFileIO::new();
        let base = table();
        let m1 = apply(&io, &base, AppendFiles::new().add_file(file("a.parquet", 4)).produce(&base, &io, 1).await.unwrap()).await;
        let overwrite = OverwriteFiles::new()
            .delete_file("a.parquet")
            .add_file(file("a2.parquet", 3))
            .set("writer", "compaction");
        let m2 = apply(&io, &m1, overwrite.produce(&m1, &io, 1).await.unwrap()).await;
        let s2 = m2.current_snapshot().unwrap();
        assert_eq!(s2.summary.operation, Operation::Overwrite);
        assert_eq!(s2.summary.get("writer"), Some("compaction"));
        assert_eq!(s2.summary.counter(TOTAL_RECORDS), 3);
        assert_eq!(live_paths(&io, &m2).await, vec!["a2.parquet"]);
    }

    #[tokio::test]
    async fn test_requirement_pins_parent() {
        let io = MemoryFileIO::new();
        let base = table();
        let stale = AppendFiles::new().add_file(file("x.parquet", 1)).produce(&base, &io, 1).await.unwrap();
        let m1 = apply(&io, &base, AppendFiles::new().add_file(file("a.parquet", 1)).produce(&base, &io, 1).await.unwrap()).await;
        assert!(stale.requirements.iter().any(|r| r.check(Some(&m1)).is_err()));
    }
}
