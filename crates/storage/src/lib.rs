pub mod json_store;
mod page;
pub mod sqlite_store;
pub mod store;

pub use json_store::{CatalogDocument, JsonCatalog};
pub use page::{load_backups_page, BackupsPage};
pub use sqlite_store::SqliteCatalog;
pub use store::{ArchiveQuery, BackupCatalog, PolicyQuery};
