pub mod aggregate;
pub mod backup;
pub mod error;
pub mod paging;

pub use aggregate::{group, latest_completed_per_policy, LastBackup, LastBackupIndex, PolicyArchiveGroup};
pub use backup::{Archive, ArchiveList, Policy, PolicyList, ResourceScope, DATABASE_RESOURCE};
pub use error::AggregateError;
pub use paging::{page_to_offset, PageRequest, View, CARD_LIMIT};
