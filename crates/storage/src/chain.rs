//! Per-key version chains
//!
//! A chain holds every committed entry of one key, oldest first. Versions are
//! strictly increasing, so snapshot reads are a binary search.

use tessera_core::{CommitTimestamp, Error, Result, Value, VersionedValue};

/// Committed history of a single key
#[derive(Debug, Clone, Default)]
pub struct VersionChain {
    versions: Vec<VersionedValue>,
}

impl VersionChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded versions
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether nothing was ever committed
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Highest recorded commit timestamp
    pub fn latest_version(&self) -> Option<CommitTimestamp> {
        self.versions.last().map(|v| v.version)
    }

    /// Check that `version` may be appended
    pub fn check_append(&self, version: CommitTimestamp) -> Result<()> {
        match self.latest_version() {
            Some(head) if head >= version => Err(Error::Internal(format!(
                "version {} does not advance chain head {}",
                version, head
            ))),
            _ => Ok(()),
        }
    }

    /// Append an entry; `value = None` records a tombstone
    pub fn push(
        &mut self,
        value: Option<Value>,
        version: CommitTimestamp,
        timestamp: i64,
    ) -> Result<()> {
        self.check_append(version)?;
        self.versions.push(VersionedValue {
            value,
            version,
            timestamp,
        });
        Ok(())
    }

    /// Latest entry with `version <= as_of`
    pub fn read_at(&self, as_of: CommitTimestamp) -> Option<&VersionedValue> {
        // index of the first entry newer than as_of
        let idx = self.versions.partition_point(|v| v.version <= as_of);
        idx.checked_sub(1).map(|i| &self.versions[i])
    }

    /// All entries, oldest first
    pub fn versions(&self) -> &[VersionedValue] {
        &self.versions
    }
}
