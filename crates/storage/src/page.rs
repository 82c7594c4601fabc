use backup_console_core::{
    group, latest_completed_per_policy, AggregateError, ArchiveList, LastBackupIndex, PageRequest,
    PolicyList, ResourceScope, View,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::store::{ArchiveQuery, BackupCatalog, PolicyQuery};

/// Everything the backups page of one resource renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupsPage {
    pub offset: u64,
    pub limit: u32,
    pub view: View,
    pub backups: ArchiveList,
    pub policies: PolicyList,
    pub last_backup_dates: LastBackupIndex,
}

/// Fetches one page of archives plus the resource's policies and derives the
/// last completed backup of every policy seen on that page.
///
/// A failed fetch degrades to an empty page; only a malformed archive
/// timestamp is reported to the caller.
pub async fn load_backups_page(
    catalog: &dyn BackupCatalog,
    scope: &ResourceScope,
    request: PageRequest,
    now: DateTime<Utc>,
) -> Result<BackupsPage, AggregateError> {
    let offset = request.offset();
    let archive_query = ArchiveQuery {
        scope: scope.clone(),
        limit: request.limit,
        offset,
    };
    let policy_query = PolicyQuery {
        scope: scope.clone(),
    };

    let (archives, policies) = tokio::join!(
        catalog.list_archives(&archive_query),
        catalog.list_policies(&policy_query)
    );
    let (backups, policies) = match (archives, policies) {
        (Ok(archives), Ok(policies)) => (archives, policies),
        (Err(e), _) | (_, Err(e)) => {
            warn!(
                error = %e,
                resource_type = %scope.resource_type,
                resource_id = %scope.resource_id,
                "backup catalog fetch failed, showing an empty page"
            );
            (ArchiveList::default(), PolicyList::default())
        }
    };

    let groups = group(backups.archives.iter().cloned());
    let last_backup_dates = latest_completed_per_policy(&groups, now)?;

    Ok(BackupsPage {
        offset,
        limit: request.limit,
        view: request.view,
        backups,
        policies,
        last_backup_dates,
    })
}
