// Demo Data Generation
//
// This module generates believable portal data: users, categories, cataloged
// SaaS systems and a backfilled access history. Access volume is skewed so a
// few systems and a few users dominate, like a real launcher.

use chrono::{Duration, Utc};
use fake::{faker::name::en::Name, Fake};
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::models::{AccessLogRow, Category, Profile, SystemInfo};

const CATALOG: &[(&str, &str, &str)] = &[
    ("Jira", "Kanban", "Engineering"),
    ("GitHub", "Github", "Engineering"),
    ("Sentry", "Bug", "Engineering"),
    ("Grafana", "Activity", "Engineering"),
    ("Confluence", "BookOpen", "Knowledge"),
    ("Notion", "FileText", "Knowledge"),
    ("Slack", "MessageSquare", "Communication"),
    ("Zoom", "Video", "Communication"),
    ("Gmail", "Mail", "Communication"),
    ("Salesforce", "Cloud", "Sales"),
    ("HubSpot", "Target", "Sales"),
    ("Workday", "Users", "People"),
    ("BambooHR", "UserCheck", "People"),
    ("Figma", "PenTool", "Design"),
    ("Miro", "Layout", "Design"),
    ("Expensify", "Receipt", "Finance"),
];

const CATEGORIES: &[&str] = &[
    "Engineering",
    "Knowledge",
    "Communication",
    "Sales",
    "People",
    "Design",
    "Finance",
];

/// DataGenerator creates fake portal data for demos and local testing
#[derive(Default)]
pub struct DataGenerator;

impl DataGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_categories(&self) -> Vec<Category> {
        CATEGORIES
            .iter()
            .enumerate()
            .map(|(order, name)| Category {
                name: name.to_string(),
                is_visible: true,
                order: order as i32,
            })
            .collect()
    }

    /// Generate up to `count` systems from the built-in catalog.
    /// Names repeat with a numeric suffix once the catalog runs out.
    pub fn generate_systems(&self, count: usize) -> Vec<SystemInfo> {
        (0..count)
            .map(|i| {
                let (name, icon, category) = CATALOG[i % CATALOG.len()];
                let round = i / CATALOG.len();
                let name = if round == 0 {
                    name.to_string()
                } else {
                    format!("{} {}", name, round + 1)
                };
                let slug = name.to_lowercase().replace(' ', "-");

                SystemInfo {
                    id: Uuid::new_v4(),
                    url: format!("https://{}.example.com", slug),
                    name,
                    icon: icon.to_string(),
                    category: category.to_string(),
                }
            })
            .collect()
    }

    /// Generate portal users; roughly one in three has an avatar
    pub fn generate_profiles(&self, count: usize) -> Vec<Profile> {
        let mut rng = StdRng::from_entropy();

        (0..count)
            .map(|_| {
                let id = Uuid::new_v4();
                Profile {
                    id,
                    name: Name().fake(),
                    avatar_url: rng
                        .gen_bool(0.3)
                        .then(|| format!("https://avatars.example.com/{}.png", id)),
                }
            })
            .collect()
    }

    /// Build a guaranteed unique email for a generated profile
    pub fn email_for(&self, profile: &Profile, index: usize) -> String {
        let base_name = profile
            .name
            .split_whitespace()
            .map(|s| s.chars().filter(|c| c.is_alphabetic()).take(3).collect::<String>())
            .collect::<Vec<_>>()
            .join("")
            .to_lowercase();
        let unique_id = profile.id.simple().to_string();
        format!("{}{}{}@example.com", base_name, &unique_id[..8], index)
    }

    /// Spread `count` accesses over the last `window_days` days.
    /// Users and systems are picked with a quadratic skew toward the front
    /// of their lists.
    pub fn generate_access_history(
        &self,
        profiles: &[Profile],
        systems: &[SystemInfo],
        window_days: u32,
        count: usize,
    ) -> Vec<AccessLogRow> {
        if profiles.is_empty() || systems.is_empty() || window_days == 0 {
            return Vec::new();
        }

        let mut rng = StdRng::from_entropy();
        let now = Utc::now();
        let window_secs = i64::from(window_days) * 86_400;

        (0..count)
            .map(|_| {
                let profile = &profiles[skewed_index(&mut rng, profiles.len())];
                let system = &systems[skewed_index(&mut rng, systems.len())];
                let age = Duration::seconds(rng.gen_range(0..window_secs));

                AccessLogRow {
                    user_id: Some(profile.id),
                    link_id: Some(system.id),
                    created_at: Some(now - age),
                    profile: None,
                }
            })
            .collect()
    }

    /// Pick a random (user, system) pair for a simulated access
    pub fn random_access(&self, profiles: &[Profile], systems: &[SystemInfo]) -> Option<(Uuid, Uuid)> {
        if profiles.is_empty() || systems.is_empty() {
            return None;
        }
        let mut rng = StdRng::from_entropy();
        let profile = &profiles[skewed_index(&mut rng, profiles.len())];
        let system = &systems[skewed_index(&mut rng, systems.len())];
        Some((profile.id, system.id))
    }
}

fn skewed_index(rng: &mut StdRng, len: usize) -> usize {
    let x: f64 = rng.gen();
    ((x * x) * len as f64) as usize % len
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn systems_get_unique_names_past_the_catalog() {
        let generator = DataGenerator::new();
        let systems = generator.generate_systems(CATALOG.len() + 3);

        let names: HashSet<&str> = systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), systems.len());
        assert!(names.contains("Jira 2"));
        assert!(systems.iter().all(|s| CATEGORIES.contains(&s.category.as_str())));
    }

    #[test]
    fn history_stays_inside_the_window() {
        let generator = DataGenerator::new();
        let profiles = generator.generate_profiles(5);
        let systems = generator.generate_systems(4);

        let history = generator.generate_access_history(&profiles, &systems, 30, 300);
        assert_eq!(history.len(), 300);

        let oldest = Utc::now() - Duration::days(30);
        for row in &history {
            assert!(row.created_at.unwrap() >= oldest);
            assert!(profiles.iter().any(|p| Some(p.id) == row.user_id));
            assert!(systems.iter().any(|s| Some(s.id) == row.link_id));
        }
    }

    #[test]
    fn emails_are_unique() {
        let generator = DataGenerator::new();
        let profiles = generator.generate_profiles(50);
        let emails: HashSet<String> = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| generator.email_for(p, i))
            .collect();
        assert_eq!(emails.len(), 50);
    }

    #[test]
    fn empty_inputs_generate_nothing() {
        let generator = DataGenerator::new();
        assert!(generator.generate_access_history(&[], &[], 30, 10).is_empty());
        assert!(generator.random_access(&[], &[]).is_none());
    }
}
