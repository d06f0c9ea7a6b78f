use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// One archival record as returned by the catalog API
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RepositoryId(pub u64);

impl Display for RepositoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RepositoryId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[must_use]
pub fn repository_path(repository: RepositoryId) -> String {
    format!("/repositories/{repository}")
}

#[must_use]
pub fn resource_path(repository: RepositoryId, resource: ResourceId) -> String {
    format!("/repositories/{repository}/resources/{resource}")
}

/// Supplies record payloads for filtering
pub trait RecordSource {
    /// # Errors
    /// Returns the classified [`SessionError`] of the underlying read.
    fn fetch_record(
        &self,
        repository: RepositoryId,
        resource: ResourceId,
    ) -> Result<Record, SessionError>;

    /// Fetch records one by one. The first failure aborts the batch and no
    /// partial result is returned.
    ///
    /// # Errors
    /// Returns the first [`SessionError`] raised by [`RecordSource::fetch_record`].
    fn fetch_many(
        &self,
        repository: RepositoryId,
        ids: &[ResourceId],
    ) -> Result<BTreeMap<ResourceId, Record>, SessionError> {
        let mut records = BTreeMap::new();
        for &id in ids {
            let record = self.fetch_record(repository, id)?;
            records.insert(id, record);
        }
        Ok(records)
    }
}
