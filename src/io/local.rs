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

use super::FileIO;
use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Local filesystem storage
///
/// Locations are either absolute paths or `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct LocalFileIO;

impl LocalFileIO {
    pub fn new() -> Self {
        LocalFileIO
    }

    fn path(location: &str) -> Result<PathBuf, Error> {
        if location.starts_with("file:") {
            let url = Url::parse(location).map_err(|e| Error::Config {
                message: format!("invalid file URL {location}: {e}"),
            })?;
            return url.to_file_path().map_err(|_| Error::Config {
                message: format!("{location} is not a local file URL"),
            });
        }
        let path = PathBuf::from(location);
        if !path.is_absolute() {
            return Err(Error::Config {
                message: format!("{location} is neither an absolute path nor a file:// URL"),
            });
        }
        Ok(path)
    }
}

fn map_err(location: &str, e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::FileNotFound {
            location: location.to_string(),
        },
        ErrorKind::AlreadyExists => Error::FileAlreadyExists {
            location: location.to_string(),
        },
        _ => Error::storage(location, e),
    }
}

#[async_trait]
impl FileIO for LocalFileIO {
    async fn read(&self, location: &str) -> Result<Bytes, Error> {
        let path = Self::path(location)?;
        let data = tokio::fs::read(&path).await.map_err(|e| map_err(location, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, location: &str, data: Bytes) -> Result<(), Error> {
        let path = Self::path(location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_err(location, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| map_err(location, e))?;
        file.write_all(&data).await.map_err(|e| map_err(location, e))?;
        file.sync_all().await.map_err(|e| map_err(location, e))?;
        Ok(())
    }

    async fn exists(&self, location: &str) -> Result<bool, Error> {
        let path = Self::path(location)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| map_err(location, e))
    }

    async fn delete(&self, location: &str) -> Result<(), Error> {
        let path = Self::path(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_err(location, e)),
        }
    }
}
