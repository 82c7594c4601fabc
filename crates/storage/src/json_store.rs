use std::path::PathBuf;

use anyhow::{Context, Result};
use backup_console_core::{Archive, ArchiveList, Policy, PolicyList};
use serde::{Deserialize, Serialize};

use crate::store::{ArchiveQuery, BackupCatalog, PolicyQuery};

/// On-disk shape of a JSON catalog. Records are listed oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub archives: Vec<Archive>,
    pub policies: Vec<Policy>,
}

/// Catalog backed by a single JSON document, re-read on every call.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn write_document(&self, document: &CatalogDocument) -> Result<()> {
        let raw = serde_json::to_string_pretty(document).context("serialize catalog document")?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("write catalog: {}", self.path.display()))
    }

    async fn load(&self) -> Result<CatalogDocument> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read catalog: {}", self.path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse catalog: {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl BackupCatalog for JsonCatalog {
    async fn list_archives(&self, query: &ArchiveQuery) -> Result<ArchiveList> {
        let document = self.load().await?;
        let matching: Vec<Archive> = document
            .archives
            .into_iter()
            .rev()
            .filter(|a| a.scope == query.scope)
            .collect();
        let total = matching.len();
        let archives = matching
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();
        Ok(ArchiveList { total, archives })
    }

    async fn list_policies(&self, query: &PolicyQuery) -> Result<PolicyList> {
        let document = self.load().await?;
        let policies: Vec<Policy> = document
            .policies
            .into_iter()
            .rev()
            .filter(|p| p.scope == query.scope)
            .collect();
        Ok(PolicyList {
            total: policies.len(),
            policies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backup_console_core::ResourceScope;

    fn sample_document() -> CatalogDocument {
        let db1 = ResourceScope::database("db1");
        let db2 = ResourceScope::database("db2");
        CatalogDocument {
            archives: vec![
                Archive::new("a1", "p1", db1.clone(), "2024-01-01T00:00:00Z"),
                Archive::new("a2", "p1", db1.clone(), "2024-01-02T00:00:00Z"),
                Archive::new("x1", "p9", db2.clone(), "2024-01-02T00:00:00Z"),
                Archive::new("a3", "p2", db1.clone(), "2024-01-03T00:00:00Z"),
            ],
            policies: vec![
                Policy::new("p1", db1.clone()),
                Policy::new("p2", db1),
                Policy::new("p9", db2),
            ],
        }
    }

    fn archive_ids(list: &ArchiveList) -> Vec<&str> {
        list.archives.iter().map(|a| a.id.as_str()).collect()
    }

    #[tokio::test]
    async fn lists_newest_first_filtered_by_scope() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let catalog = JsonCatalog::new(tmp.path().join("catalog.json"));
        catalog.write_document(&sample_document()).await.expect("write");

        let query = ArchiveQuery {
            scope: ResourceScope::database("db1"),
            limit: 10,
            offset: 0,
        };
        let list = catalog.list_archives(&query).await.expect("list");
        assert_eq!(list.total, 3);
        assert_eq!(archive_ids(&list), vec!["a3", "a2", "a1"]);

        let policies = catalog
            .list_policies(&PolicyQuery {
                scope: ResourceScope::database("db1"),
            })
            .await
            .expect("policies");
        assert_eq!(policies.total, 2);
        assert_eq!(policies.policies[0].id, "p2");
    }

    #[tokio::test]
    async fn paginates_but_reports_full_total() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let catalog = JsonCatalog::new(tmp.path().join("catalog.json"));
        catalog.write_document(&sample_document()).await.expect("write");

        let query = ArchiveQuery {
            scope: ResourceScope::database("db1"),
            limit: 2,
            offset: 2,
        };
        let list = catalog.list_archives(&query).await.expect("list");
        assert_eq!(list.total, 3);
        assert_eq!(archive_ids(&list), vec!["a1"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let catalog = JsonCatalog::new(tmp.path().join("absent.json"));
        let err = catalog
            .list_policies(&PolicyQuery {
                scope: ResourceScope::database("db1"),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read catalog"));
    }
}
