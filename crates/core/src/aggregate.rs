//! Grouping of backup archives by policy and last-backup lookup.
//!
//! Both mappings keep policies in the order they were first seen in the
//! archive list, which is the order the console renders policy rows in.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::backup::Archive;
use crate::error::AggregateError;

/// Insertion-ordered map keyed by policy id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PolicyMap<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> Default for PolicyMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<V> PolicyMap<V> {
    fn get(&self, policy_id: &str) -> Option<&V> {
        self.positions.get(policy_id).map(|&pos| &self.entries[pos].1)
    }

    fn get_or_insert_with(&mut self, policy_id: &str, init: impl FnOnce() -> V) -> &mut V {
        let pos = match self.positions.get(policy_id) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.entries.push((policy_id.to_owned(), init()));
                self.positions.insert(policy_id.to_owned(), pos);
                pos
            }
        };
        &mut self.entries[pos].1
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), v))
    }
}

/// Archives partitioned by the policy that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyArchiveGroup {
    groups: PolicyMap<Vec<Archive>>,
}

impl PolicyArchiveGroup {
    pub fn get(&self, policy_id: &str) -> Option<&[Archive]> {
        self.groups.get(policy_id).map(Vec::as_slice)
    }

    /// Iterates `(policy_id, archives)` in first-seen policy order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Archive])> {
        self.groups.iter().map(|(id, archives)| (id, archives.as_slice()))
    }

    pub fn policy_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.groups.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.entries.is_empty()
    }

    /// All archives, group by group.
    pub fn flatten(&self) -> Vec<Archive> {
        self.groups
            .entries
            .iter()
            .flat_map(|(_, archives)| archives.iter().cloned())
            .collect()
    }
}

impl Serialize for PolicyArchiveGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (policy_id, archives) in self.iter() {
            map.serialize_entry(policy_id, archives)?;
        }
        map.end()
    }
}

/// The most recent completed archive of one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastBackup {
    pub archive_id: String,
    pub created_at: DateTime<Utc>,
}

/// Policy id to last completed backup. Policies without one are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastBackupIndex {
    latest: PolicyMap<LastBackup>,
}

impl LastBackupIndex {
    pub fn get(&self, policy_id: &str) -> Option<&LastBackup> {
        self.latest.get(policy_id)
    }

    pub fn contains(&self, policy_id: &str) -> bool {
        self.latest.positions.contains_key(policy_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LastBackup)> {
        self.latest.iter()
    }

    pub fn len(&self) -> usize {
        self.latest.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.entries.is_empty()
    }
}

impl Serialize for LastBackupIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (policy_id, last) in self.iter() {
            let stamp = last.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            map.serialize_entry(policy_id, &stamp)?;
        }
        map.end()
    }
}

/// Partitions `archives` by policy id.
///
/// Archives keep their input order within a group; groups appear in the
/// order their policy id was first seen. Archives referencing a policy the
/// caller does not know about are grouped like any other.
pub fn group<I>(archives: I) -> PolicyArchiveGroup
where
    I: IntoIterator<Item = Archive>,
{
    let mut grouped = PolicyArchiveGroup::default();
    for archive in archives {
        grouped
            .groups
            .get_or_insert_with(&archive.policy_id, Vec::new)
            .push(archive);
    }
    grouped
}

/// Finds, per policy, the newest archive created strictly before `now`.
///
/// Archives at or after `now` are pending and never count; a policy with
/// nothing older is left out. Archives sharing a timestamp resolve to the
/// one that came first in the group.
///
/// Every timestamp is parsed before any selection happens, so a single
/// malformed value fails the whole call.
pub fn latest_completed_per_policy(
    groups: &PolicyArchiveGroup,
    now: DateTime<Utc>,
) -> Result<LastBackupIndex, AggregateError> {
    let parsed = groups
        .iter()
        .map(|(policy_id, archives)| {
            archives
                .iter()
                .map(|archive| parse_created_at(archive).map(|ts| (ts, archive)))
                .collect::<Result<Vec<_>, _>>()
                .map(|stamped| (policy_id, stamped))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut index = LastBackupIndex::default();
    for (policy_id, stamped) in parsed {
        let newest = stamped
            .iter()
            .enumerate()
            .filter(|(_, (ts, _))| *ts < now)
            .max_by_key(|(pos, (ts, _))| (*ts, Reverse(*pos)))
            .map(|(_, entry)| entry);

        if let Some((created_at, archive)) = newest {
            index.latest.get_or_insert_with(policy_id, || LastBackup {
                archive_id: archive.id.clone(),
                created_at: *created_at,
            });
        }
    }
    Ok(index)
}

fn parse_created_at(archive: &Archive) -> Result<DateTime<Utc>, AggregateError> {
    DateTime::parse_from_rfc3339(&archive.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AggregateError::MalformedTimestamp {
            archive_id: archive.id.clone(),
            value: archive.created_at.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::ResourceScope;
    use chrono::Duration;

    fn archive(id: &str, policy_id: &str, created_at: &str) -> Archive {
        Archive::new(id, policy_id, ResourceScope::database("db1"), created_at)
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    fn stamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn ids(archives: &[Archive]) -> Vec<&str> {
        archives.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn groups_and_indexes_console_example() {
        let archives = vec![
            archive("a1", "p1", "2024-01-01T00:00:00Z"),
            archive("a2", "p1", "2024-01-03T00:00:00Z"),
            archive("a3", "p2", "2024-02-01T00:00:00Z"),
        ];
        let groups = group(archives);

        assert_eq!(groups.policy_ids().collect::<Vec<_>>(), vec!["p1", "p2"]);
        assert_eq!(ids(groups.get("p1").expect("p1")), vec!["a1", "a2"]);
        assert_eq!(ids(groups.get("p2").expect("p2")), vec!["a3"]);

        let index = latest_completed_per_policy(&groups, ts("2024-01-15T00:00:00Z"))
            .expect("aggregate");
        assert_eq!(index.len(), 1);
        let p1 = index.get("p1").expect("p1 last backup");
        assert_eq!(p1.archive_id, "a2");
        assert_eq!(p1.created_at, ts("2024-01-03T00:00:00Z"));
        assert!(!index.contains("p2"));

        let json = serde_json::to_value(&index).expect("serialize");
        assert_eq!(json, serde_json::json!({"p1": "2024-01-03T00:00:00Z"}));
    }

    #[test]
    fn pending_archive_does_not_hide_completed_ones() {
        let now = ts("2024-06-01T12:00:00Z");
        let groups = group(vec![
            archive("old", "p1", &stamp(now - Duration::days(2))),
            archive("future", "p1", &stamp(now + Duration::days(1))),
            archive("recent", "p1", &stamp(now - Duration::days(1))),
        ]);

        let index = latest_completed_per_policy(&groups, now).expect("aggregate");
        let p1 = index.get("p1").expect("p1 last backup");
        assert_eq!(p1.archive_id, "recent");
        assert_eq!(p1.created_at, now - Duration::days(1));
    }

    #[test]
    fn only_future_archives_leave_policy_absent() {
        let now = ts("2024-06-01T12:00:00Z");
        let groups = group(vec![archive("a1", "p1", &stamp(now + Duration::hours(1)))]);

        let index = latest_completed_per_policy(&groups, now).expect("aggregate");
        assert!(index.is_empty());
        assert_eq!(serde_json::to_value(&index).expect("json"), serde_json::json!({}));
    }

    #[test]
    fn archive_created_exactly_now_is_not_completed() {
        let now = ts("2024-06-01T12:00:00Z");
        let groups = group(vec![archive("a1", "p1", &stamp(now))]);

        let index = latest_completed_per_policy(&groups, now).expect("aggregate");
        assert!(!index.contains("p1"));
    }

    #[test]
    fn equal_timestamps_resolve_to_first_seen_archive() {
        let groups = group(vec![
            archive("b", "p1", "2024-01-02T00:00:00Z"),
            archive("a", "p1", "2024-01-02T00:00:00Z"),
            archive("c", "p1", "2024-01-01T00:00:00Z"),
        ]);

        let index = latest_completed_per_policy(&groups, ts("2024-02-01T00:00:00Z"))
            .expect("aggregate");
        assert_eq!(index.get("p1").expect("p1").archive_id, "b");
    }

    #[test]
    fn offsets_are_compared_as_instants() {
        // 01:00+02:00 is 23:00Z the previous day, older than 00:30Z.
        let groups = group(vec![
            archive("later", "p1", "2024-01-02T00:30:00Z"),
            archive("earlier", "p1", "2024-01-02T01:00:00+02:00"),
        ]);

        let index = latest_completed_per_policy(&groups, ts("2024-02-01T00:00:00Z"))
            .expect("aggregate");
        assert_eq!(index.get("p1").expect("p1").archive_id, "later");
    }

    #[test]
    fn malformed_timestamp_fails_fast() {
        let groups = group(vec![
            archive("ok", "p1", "2024-01-02T00:00:00Z"),
            archive("bad", "p2", "yesterday"),
        ]);

        let err = latest_completed_per_policy(&groups, ts("2024-02-01T00:00:00Z"))
            .expect_err("malformed timestamp");
        assert_eq!(
            err,
            AggregateError::MalformedTimestamp {
                archive_id: "bad".to_owned(),
                value: "yesterday".to_owned(),
            }
        );
        assert_eq!(err.archive_id(), "bad");
    }

    #[test]
    fn malformed_older_archive_still_fails() {
        let groups = group(vec![
            archive("newest", "p1", "2024-01-05T00:00:00Z"),
            archive("broken", "p1", ""),
        ]);

        let err = latest_completed_per_policy(&groups, ts("2024-02-01T00:00:00Z"))
            .expect_err("malformed timestamp");
        assert_eq!(err.archive_id(), "broken");
    }

    #[test]
    fn unknown_policy_ids_are_grouped() {
        let groups = group(vec![archive("a1", "no-such-policy", "2024-01-01T00:00:00Z")]);
        assert_eq!(ids(groups.get("no-such-policy").expect("group")), vec!["a1"]);
    }

    #[test]
    fn empty_input_yields_empty_outputs() {
        let groups = group(Vec::new());
        assert!(groups.is_empty());

        let index = latest_completed_per_policy(&groups, Utc::now()).expect("aggregate");
        assert!(index.is_empty());
    }

    #[test]
    fn group_serializes_in_first_seen_order() {
        let groups = group(vec![
            archive("a1", "zeta", "2024-01-01T00:00:00Z"),
            archive("a2", "alpha", "2024-01-01T00:00:00Z"),
        ]);
        let json = serde_json::to_string(&groups).expect("serialize");
        let zeta = json.find("\"zeta\"").expect("zeta key");
        let alpha = json.find("\"alpha\"").expect("alpha key");
        assert!(zeta < alpha);
    }
}
