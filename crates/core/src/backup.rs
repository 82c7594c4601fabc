use serde::{Deserialize, Serialize};

/// Resource type the console attaches database backup policies to.
pub const DATABASE_RESOURCE: &str = "database";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ResourceScope {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceScope {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn database(database_id: impl Into<String>) -> Self {
        Self::new(DATABASE_RESOURCE, database_id)
    }
}

/// A single backup instance as reported by the backup service.
///
/// `created_at` is kept in its wire form. It is only interpreted by the
/// aggregator, which rejects values that are not RFC 3339 instants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Archive {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "policyId")]
    pub policy_id: String,
    #[serde(flatten)]
    pub scope: ResourceScope,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
}

impl Archive {
    pub fn new(
        id: impl Into<String>,
        policy_id: impl Into<String>,
        scope: ResourceScope,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            policy_id: policy_id.into(),
            scope,
            created_at: created_at.into(),
        }
    }
}

/// A backup schedule/retention rule applied to one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub scope: ResourceScope,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<u32>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Policy {
    pub fn new(id: impl Into<String>, scope: ResourceScope) -> Self {
        Self {
            id: id.into(),
            scope,
            name: String::new(),
            schedule: None,
            retention: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveList {
    pub total: usize,
    pub archives: Vec<Archive>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyList {
    pub total: usize,
    pub policies: Vec<Policy>,
}
