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

//! Validated table identifiers and metadata locations
//!
//! Names are checked once at construction ("parse, don't validate"), so the
//! catalog and commit layers only ever see well-formed identifiers.

use crate::error::ValidationErr;
use std::fmt;

// ============================================================================
// Namespace
// ============================================================================

/// A validated, possibly multi-level namespace.
///
/// # Example
///
/// ```
/// use floe::catalog::Namespace;
///
/// let ns = Namespace::new(vec!["db".to_string(), "schema".to_string()]).unwrap();
/// assert_eq!(ns.to_string(), "db.schema");
///
/// assert!(Namespace::new(vec![]).is_err());
/// assert!(Namespace::new(vec!["".to_string()]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// Creates a new validated namespace.
    ///
    /// Each level holds letters, digits and underscores, and does not start
    /// or end with an underscore.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErr::InvalidNamespace`] if validation fails.
    pub fn new(levels: Vec<String>) -> Result<Self, ValidationErr> {
        if levels.is_empty() {
            return Err(ValidationErr::InvalidNamespace {
                namespace: String::new(),
                cause: "namespace cannot be empty".to_string(),
            });
        }
        for level in &levels {
            Self::validate_level(&levels, level)?;
        }
        Ok(Self(levels))
    }

    fn validate_level(levels: &[String], level: &str) -> Result<(), ValidationErr> {
        let err = |cause: &str| ValidationErr::InvalidNamespace {
            namespace: levels.join("."),
            cause: cause.to_string(),
        };
        if level.is_empty() {
            return Err(err("namespace levels cannot be empty"));
        }
        if level.starts_with('_') || level.ends_with('_') {
            return Err(err("namespace levels cannot start or end with an underscore"));
        }
        if !level.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(err("namespace can only contain letters, numbers, and underscores"));
        }
        Ok(())
    }

    /// Creates a single-level namespace.
    pub fn single(level: impl Into<String>) -> Result<Self, ValidationErr> {
        Self::new(vec![level.into()])
    }

    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn levels(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed namespace
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl TryFrom<Vec<String>> for Namespace {
    type Error = ValidationErr;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Namespace {
    type Error = ValidationErr;

    /// Parses a dotted namespace such as `db.schema`
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.split('.').map(str::to_string).collect())
    }
}

// ============================================================================
// TableName
// ============================================================================

/// A validated table name.
///
/// # Example
///
/// ```
/// use floe::catalog::TableName;
///
/// let table = TableName::new("events").unwrap();
/// assert_eq!(table.as_str(), "events");
/// assert!(TableName::new("").is_err());
/// assert!(TableName::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a new validated table name.
    ///
    /// Names are non-empty and contain no path separators or dots, since
    /// they become part of the table's default storage location.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErr::InvalidTableName`] if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationErr> {
        let name = name.into();
        let cause = if name.is_empty() {
            Some("table name cannot be empty")
        } else if name.contains(['/', '\\', '.']) {
            Some("table name cannot contain '/', '\\' or '.'")
        } else if name.chars().any(char::is_control) {
            Some("table name cannot contain control characters")
        } else {
            None
        };
        match cause {
            Some(cause) => Err(ValidationErr::InvalidTableName {
                name,
                cause: cause.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for TableName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = ValidationErr;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TableName {
    type Error = ValidationErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ============================================================================
// TableIdent
// ============================================================================

/// Namespace plus table name; the key of a catalog binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TableIdent {
    pub namespace: Namespace,
    pub name: TableName,
}

impl TableIdent {
    pub fn new(namespace: Namespace, name: TableName) -> Self {
        TableIdent { namespace, name }
    }

    /// Parses `ns1.ns2.table`; the last level is the table name
    pub fn parse(ident: &str) -> Result<Self, ValidationErr> {
        let Some((namespace, name)) = ident.rsplit_once('.') else {
            return Err(ValidationErr::InvalidNamespace {
                namespace: String::new(),
                cause: format!("identifier {ident:?} has no namespace"),
            });
        };
        Ok(TableIdent {
            namespace: Namespace::try_from(namespace)?,
            name: TableName::new(name)?,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }
}

impl fmt::Display for TableIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl TryFrom<&str> for TableIdent {
    type Error = ValidationErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

// ============================================================================
// MetadataLocation
// ============================================================================

/// A validated location of a table metadata document.
///
/// # Example
///
/// ```
/// use floe::catalog::MetadataLocation;
///
/// let location = MetadataLocation::new("s3://bucket/db/t/metadata/00001-x.metadata.json").unwrap();
/// assert_eq!(location.as_str(), "s3://bucket/db/t/metadata/00001-x.metadata.json");
/// assert!(MetadataLocation::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct MetadataLocation(String);

impl MetadataLocation {
    /// Creates a new validated metadata location.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErr::InvalidMetadataLocation`] if the location is
    /// empty or contains whitespace.
    pub fn new(location: impl Into<String>) -> Result<Self, ValidationErr> {
        let location = location.into();
        let cause = if location.is_empty() {
            Some("metadata location cannot be empty")
        } else if location.chars().any(char::is_whitespace) {
            Some("metadata location cannot contain whitespace")
        } else {
            None
        };
        match cause {
            Some(cause) => Err(ValidationErr::InvalidMetadataLocation {
                location,
                cause: cause.to_string(),
            }),
            None => Ok(Self(location)),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for MetadataLocation {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MetadataLocation {
    type Error = ValidationErr;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for MetadataLocation {
    type Error = ValidationErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
