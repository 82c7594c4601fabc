use anyhow::Result;
use backup_console_core::{ArchiveList, PolicyList, ResourceScope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveQuery {
    pub scope: ResourceScope,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyQuery {
    pub scope: ResourceScope,
}

/// Read access to backup archives and policies, implemented by the JSON-file and SQLite catalogs.
///
/// Both listings return newest-inserted records first and report `total` as the
/// number of matches before pagination. Timestamps are passed through untouched.
#[async_trait::async_trait]
pub trait BackupCatalog: Send + Sync {
    /// One page of archives belonging to the query's resource.
    async fn list_archives(&self, query: &ArchiveQuery) -> Result<ArchiveList>;

    /// Every policy attached to the query's resource.
    async fn list_policies(&self, query: &PolicyQuery) -> Result<PolicyList>;
}
