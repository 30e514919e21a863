// Label Directories
//
// Read-only lookups from system and user ids to display metadata. The
// aggregator only reads them to snapshot labels; ids missing from a
// directory resolve to a placeholder so their accesses still count.

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{AccessLogRow, Profile, SystemInfo};

pub const UNKNOWN_USER: &str = "Unknown User";
pub const UNKNOWN_SYSTEM: &str = "System";
pub const UNCATEGORIZED: &str = "Uncategorized";

/// SystemDirectory maps a system id to its catalog entry
#[derive(Debug, Clone, Default)]
pub struct SystemDirectory {
    systems: HashMap<Uuid, SystemInfo>,
}

impl SystemDirectory {
    pub fn new(systems: impl IntoIterator<Item = SystemInfo>) -> Self {
        Self {
            systems: systems.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&SystemInfo> {
        self.systems.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.systems.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn display_name(&self, id: &Uuid) -> Option<&str> {
        self.systems.get(id).map(|s| s.name.as_str())
    }

    pub fn category(&self, id: &Uuid) -> Option<&str> {
        self.systems.get(id).map(|s| s.category.as_str())
    }
}

/// ProfileDirectory maps a user id to their display name and avatar
#[derive(Debug, Clone, Default)]
pub struct ProfileDirectory {
    profiles: HashMap<Uuid, Profile>,
}

impl ProfileDirectory {
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Build the directory from the profile data joined onto log rows.
    /// The first row carrying usable enrichment for a user wins.
    pub fn from_rows(rows: &[AccessLogRow]) -> Self {
        let mut directory = Self::default();
        for row in rows {
            let Some(user_id) = row.user_id else { continue };
            if directory.profiles.contains_key(&user_id) {
                continue;
            }
            if let Some(enrichment) = row.profile.as_ref().and_then(ProfileEnrichment::parse) {
                directory.insert(enrichment.into_profile(user_id));
            }
        }
        directory
    }

    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    /// Fill in users this directory does not know yet from another one
    pub fn merge_missing(&mut self, other: ProfileDirectory) {
        for (id, profile) in other.profiles {
            self.profiles.entry(id).or_insert(profile);
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// The user's name, or None when the user is unknown or the name is blank
    pub fn display_name(&self, id: &Uuid) -> Option<&str> {
        self.profiles
            .get(id)
            .map(|p| p.name.as_str())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// ProfileEnrichment is the denormalized profile joined onto a log row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileEnrichment {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileEnrichment {
    /// Accepts the join payload as an object or as a one-element array.
    /// Anything else (null, empty array, wrong shape) is treated as absent.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        let object = match value {
            serde_json::Value::Array(items) => items.first()?,
            other => other,
        };
        if !object.is_object() {
            return None;
        }
        serde_json::from_value(object.clone()).ok()
    }

    fn into_profile(self, id: Uuid) -> Profile {
        Profile {
            id,
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            avatar_url: self.avatar_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(user_id: Uuid, profile: Option<serde_json::Value>) -> AccessLogRow {
        AccessLogRow {
            user_id: Some(user_id),
            link_id: Some(Uuid::new_v4()),
            created_at: Some(chrono::Utc::now()),
            profile,
        }
    }

    #[test]
    fn enrichment_accepts_object_and_single_element_array() {
        let object = json!({ "name": "Ana", "avatar_url": "https://cdn/a.png" });
        let wrapped = json!([{ "name": "Ana", "avatar_url": "https://cdn/a.png" }]);

        let a = ProfileEnrichment::parse(&object).unwrap();
        let b = ProfileEnrichment::parse(&wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn enrichment_rejects_empty_or_odd_shapes() {
        assert!(ProfileEnrichment::parse(&json!(null)).is_none());
        assert!(ProfileEnrichment::parse(&json!([])).is_none());
        assert!(ProfileEnrichment::parse(&json!("Ana")).is_none());
    }

    #[test]
    fn from_rows_keeps_first_enrichment_and_skips_missing() {
        let ana = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        let rows = vec![
            row(ana, Some(json!([{ "name": "Ana", "avatar_url": null }]))),
            row(ana, Some(json!({ "name": "Someone Else" }))),
            row(ghost, None),
        ];

        let directory = ProfileDirectory::from_rows(&rows);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(&ana).unwrap().name, "Ana");
        assert!(directory.get(&ghost).is_none());
    }

    #[test]
    fn blank_enriched_name_falls_back() {
        let id = Uuid::new_v4();
        let directory = ProfileDirectory::from_rows(&[row(id, Some(json!({ "name": "  " })))]);
        assert_eq!(directory.get(&id).unwrap().name, UNKNOWN_USER);
    }

    #[test]
    fn blank_table_name_has_no_display_name() {
        let (named, blank) = (Uuid::new_v4(), Uuid::new_v4());
        let directory = ProfileDirectory::new([
            Profile { id: named, name: "Carla".into(), avatar_url: None },
            Profile { id: blank, name: String::new(), avatar_url: None },
        ]);

        assert_eq!(directory.display_name(&named), Some("Carla"));
        assert_eq!(directory.display_name(&blank), None);
        assert_eq!(directory.display_name(&Uuid::new_v4()), None);
    }

    #[test]
    fn merge_missing_does_not_overwrite() {
        let id = Uuid::new_v4();
        let mut base = ProfileDirectory::new([Profile {
            id,
            name: "Bruno".into(),
            avatar_url: None,
        }]);
        base.merge_missing(ProfileDirectory::new([Profile {
            id,
            name: "Stale".into(),
            avatar_url: None,
        }]));
        assert_eq!(base.get(&id).unwrap().name, "Bruno");
    }
}
