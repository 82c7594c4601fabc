use std::path::PathBuf;

use anyhow::{Context, Result};
use backup_console_core::{Archive, ArchiveList, Policy, PolicyList, ResourceScope};
use rusqlite::{params, Connection};

use crate::store::{ArchiveQuery, BackupCatalog, PolicyQuery};

/// SQLite-backed catalog. Each call opens a fresh connection on a blocking thread.
pub struct SqliteCatalog {
    db_path: PathBuf,
}

impl SqliteCatalog {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let catalog = Self { db_path };
        catalog.init_db()?;
        Ok(catalog)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path).context("open catalog db")
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS archives (
                id TEXT PRIMARY KEY,
                policy_id TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS archives_scope
                ON archives (resource_type, resource_id);
            CREATE TABLE IF NOT EXISTS policies (
                id TEXT PRIMARY KEY,
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                schedule TEXT,
                retention INTEGER,
                enabled INTEGER NOT NULL DEFAULT 1
            );",
        )
        .context("create catalog tables")?;
        Ok(())
    }

    pub async fn insert_archive(&self, archive: &Archive) -> Result<()> {
        let archive = archive.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).context("open catalog db")?;
            conn.execute(
                "INSERT INTO archives (id, policy_id, resource_type, resource_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    archive.id,
                    archive.policy_id,
                    archive.scope.resource_type,
                    archive.scope.resource_id,
                    archive.created_at
                ],
            )
            .with_context(|| format!("insert archive {}", archive.id))?;
            Ok(())
        })
        .await?
    }

    pub async fn insert_policy(&self, policy: &Policy) -> Result<()> {
        let policy = policy.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).context("open catalog db")?;
            conn.execute(
                "INSERT INTO policies (id, resource_type, resource_id, name, schedule, retention, enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    policy.id,
                    policy.scope.resource_type,
                    policy.scope.resource_id,
                    policy.name,
                    policy.schedule,
                    policy.retention,
                    policy.enabled
                ],
            )
            .with_context(|| format!("insert policy {}", policy.id))?;
            Ok(())
        })
        .await?
    }
}

#[async_trait::async_trait]
impl BackupCatalog for SqliteCatalog {
    async fn list_archives(&self, query: &ArchiveQuery) -> Result<ArchiveList> {
        let query = query.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).context("open catalog db")?;
            let scope = &query.scope;
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM archives WHERE resource_type = ?1 AND resource_id = ?2",
                params![scope.resource_type, scope.resource_id],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, policy_id, resource_type, resource_id, created_at
                 FROM archives WHERE resource_type = ?1 AND resource_id = ?2
                 ORDER BY rowid DESC LIMIT ?3 OFFSET ?4",
            )?;
            let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
            let rows = stmt.query_map(
                params![scope.resource_type, scope.resource_id, query.limit, offset],
                row_to_archive,
            )?;
            let archives = rows.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ArchiveList {
                total: usize::try_from(total).unwrap_or_default(),
                archives,
            })
        })
        .await?
    }

    async fn list_policies(&self, query: &PolicyQuery) -> Result<PolicyList> {
        let scope = query.scope.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).context("open catalog db")?;
            let mut stmt = conn.prepare(
                "SELECT id, resource_type, resource_id, name, schedule, retention, enabled
                 FROM policies WHERE resource_type = ?1 AND resource_id = ?2
                 ORDER BY rowid DESC",
            )?;
            let rows = stmt.query_map(
                params![scope.resource_type, scope.resource_id],
                row_to_policy,
            )?;
            let policies = rows.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(PolicyList {
                total: policies.len(),
                policies,
            })
        })
        .await?
    }
}

fn row_to_archive(row: &rusqlite::Row) -> rusqlite::Result<Archive> {
    Ok(Archive {
        id: row.get(0)?,
        policy_id: row.get(1)?,
        scope: ResourceScope::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
        created_at: row.get(4)?,
    })
}

fn row_to_policy(row: &rusqlite::Row) -> rusqlite::Result<Policy> {
    Ok(Policy {
        id: row.get(0)?,
        scope: ResourceScope::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        name: row.get(3)?,
        schedule: row.get(4)?,
        retention: row.get(5)?,
        enabled: row.get(6)?,
    })
}
