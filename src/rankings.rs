// Dashboard Views
//
// Read-only views derived from a rollup: most used systems and categories
// across all users, zero-filled sparkline history, and the report payload
// the analytics dashboard renders.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::aggregator::{compare_labels, AggregateStats, Rollup};
use crate::directory::{SystemDirectory, UNCATEGORIZED};
use crate::models::{ActorUsage, DailyCount, RankedCategory, RankedSystem};

/// Systems ranked by clicks summed over every user
pub fn top_systems(actors: &[ActorUsage], systems: &SystemDirectory, n: usize) -> Vec<RankedSystem> {
    let mut totals: HashMap<Uuid, RankedSystem> = HashMap::new();

    for actor in actors {
        for usage in &actor.system_breakdown {
            let entry = totals.entry(usage.target_id).or_insert_with(|| RankedSystem {
                target_id: usage.target_id,
                display_name: usage.display_name.clone(),
                icon: systems.get(&usage.target_id).map(|s| s.icon.clone()),
                total_clicks: 0,
            });
            entry.total_clicks += usage.total_clicks;
        }
    }

    let mut ranked: Vec<RankedSystem> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total_clicks
            .cmp(&a.total_clicks)
            .then_with(|| compare_labels(&a.display_name, &b.display_name))
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
    ranked.truncate(n);
    ranked
}

/// Categories ranked by clicks summed over every user.
/// Systems missing from the directory count as uncategorized.
pub fn top_categories(
    actors: &[ActorUsage],
    systems: &SystemDirectory,
    n: usize,
) -> Vec<RankedCategory> {
    let mut totals: HashMap<String, u64> = HashMap::new();

    for actor in actors {
        for usage in &actor.system_breakdown {
            let category = systems.category(&usage.target_id).unwrap_or(UNCATEGORIZED);
            *totals.entry(category.to_string()).or_insert(0) += usage.total_clicks;
        }
    }

    let mut ranked: Vec<RankedCategory> = totals
        .into_iter()
        .map(|(category, total_clicks)| RankedCategory {
            category,
            total_clicks,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_clicks
            .cmp(&a.total_clicks)
            .then_with(|| compare_labels(&a.category, &b.category))
    });
    ranked.truncate(n);
    ranked
}

/// Longest sparkline a report will render
pub const MAX_SPARKLINE_DAYS: u32 = 366;

/// Zero-fill a sparse history over the `days` days ending at `end`
/// (inclusive). Entries outside the window are dropped. A window reaching
/// past the earliest representable date starts at that date instead.
pub fn densify_history(history: &[DailyCount], end: NaiveDate, days: u32) -> Vec<DailyCount> {
    if days == 0 {
        return Vec::new();
    }

    let counts: HashMap<NaiveDate, u64> = history.iter().map(|p| (p.date, p.count)).collect();
    let start = end
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN);

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| DailyCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// ActorSummary is one dashboard row: the user's rollup plus a sparkline
#[derive(Debug, Clone, Serialize)]
pub struct ActorSummary {
    #[serde(flatten)]
    pub usage: ActorUsage,
    pub sparkline: Vec<DailyCount>,
}

/// UsageReport is the analytics dashboard payload
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub generated_at: DateTime<Utc>,
    pub total_interactions: u64,
    pub active_systems: usize,
    pub active_users: usize,
    pub most_active_user: Option<String>,
    pub actors: Vec<ActorSummary>,
    pub top_systems: Vec<RankedSystem>,
    pub top_categories: Vec<RankedCategory>,
    pub stats: AggregateStats,
}

impl UsageReport {
    pub fn build(
        rollup: &Rollup,
        systems: &SystemDirectory,
        top_n: usize,
        now: DateTime<Utc>,
        sparkline_days: u32,
    ) -> Self {
        let today = now.date_naive();
        let sparkline_days = sparkline_days.min(MAX_SPARKLINE_DAYS);
        let actors = rollup
            .actors
            .iter()
            .map(|usage| ActorSummary {
                usage: usage.clone(),
                sparkline: densify_history(&usage.history, today, sparkline_days),
            })
            .collect();

        Self {
            generated_at: now,
            total_interactions: rollup.actors.iter().map(|a| a.total_accesses).sum(),
            active_systems: systems.len(),
            active_users: rollup.actors.len(),
            // Rollup is already ordered most active first
            most_active_user: rollup.actors.first().map(|a| a.display_name.clone()),
            actors,
            top_systems: top_systems(&rollup.actors, systems, top_n),
            top_categories: top_categories(&rollup.actors, systems, top_n),
            stats: rollup.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::directory::ProfileDirectory;
    use crate::models::{RawAccessEvent, SystemInfo};
    use chrono::TimeZone;

    fn system(id: Uuid, name: &str, category: &str) -> SystemInfo {
        SystemInfo {
            id,
            name: name.to_string(),
            url: "https://example.com".to_string(),
            icon: "Globe".to_string(),
            category: category.to_string(),
        }
    }

    fn clicks(actor: Uuid, target: Uuid, n: usize) -> Vec<RawAccessEvent> {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        (0..n)
            .map(|_| RawAccessEvent {
                actor_id: Some(actor),
                target_id: Some(target),
                occurred_at: Some(at),
            })
            .collect()
    }

    fn fixture() -> (Rollup, SystemDirectory, [Uuid; 4]) {
        let (crm, mail, wiki, stray) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let systems = SystemDirectory::new([
            system(crm, "CRM", "Sales"),
            system(mail, "Mail", "Office"),
            system(wiki, "Wiki", "Office"),
        ]);
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        let mut events = clicks(u1, crm, 5);
        events.extend(clicks(u1, mail, 2));
        events.extend(clicks(u2, mail, 1));
        events.extend(clicks(u2, wiki, 3));
        events.extend(clicks(u2, stray, 1));

        let rollup = aggregate(&events, &systems, &ProfileDirectory::default());
        (rollup, systems, [crm, mail, wiki, stray])
    }

    #[test]
    fn top_systems_sum_across_users_and_truncate() {
        let (rollup, systems, [crm, mail, wiki, _]) = fixture();

        let ranked = top_systems(&rollup.actors, &systems, 3);
        let ids: Vec<Uuid> = ranked.iter().map(|r| r.target_id).collect();
        assert_eq!(ids, vec![crm, mail, wiki]);
        assert_eq!(ranked[1].total_clicks, 3);
        assert_eq!(ranked[0].icon.as_deref(), Some("Globe"));
        assert_eq!(ranked[2].total_clicks, 3);
    }

    #[test]
    fn top_categories_resolve_through_directory() {
        let (rollup, systems, _) = fixture();

        let ranked = top_categories(&rollup.actors, &systems, 10);
        assert_eq!(
            ranked,
            vec![
                RankedCategory { category: "Office".into(), total_clicks: 6 },
                RankedCategory { category: "Sales".into(), total_clicks: 5 },
                RankedCategory { category: UNCATEGORIZED.into(), total_clicks: 1 },
            ]
        );
    }

    #[test]
    fn densify_fills_gaps_and_drops_out_of_window() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        let sparse = vec![
            DailyCount { date: day(1), count: 9 },
            DailyCount { date: day(5), count: 2 },
            DailyCount { date: day(7), count: 4 },
        ];

        let dense = densify_history(&sparse, day(7), 4);
        let counts: Vec<(NaiveDate, u64)> = dense.iter().map(|p| (p.date, p.count)).collect();
        assert_eq!(
            counts,
            vec![(day(4), 0), (day(5), 2), (day(6), 0), (day(7), 4)]
        );
        assert!(densify_history(&sparse, day(7), 0).is_empty());
    }

    #[test]
    fn densify_stops_at_earliest_representable_date() {
        let end = NaiveDate::MIN + Duration::days(2);
        let dense = densify_history(&[DailyCount { date: end, count: 1 }], end, 10);

        assert_eq!(dense.len(), 3);
        assert_eq!(dense[0].date, NaiveDate::MIN);
        assert_eq!(dense[2].count, 1);
    }

    #[test]
    fn report_caps_oversized_sparkline() {
        let (rollup, systems, _) = fixture();
        let now = Utc.with_ymd_and_hms(2024, 6, 11, 8, 0, 0).unwrap();

        let report = UsageReport::build(&rollup, &systems, 2, now, u32::MAX);
        assert!(report
            .actors
            .iter()
            .all(|a| a.sparkline.len() == MAX_SPARKLINE_DAYS as usize));
    }

    #[test]
    fn report_totals_match_rollup() {
        let (rollup, systems, _) = fixture();
        let now = Utc.with_ymd_and_hms(2024, 6, 11, 8, 0, 0).unwrap();

        let report = UsageReport::build(&rollup, &systems, 2, now, 7);
        assert_eq!(report.total_interactions, 12);
        assert_eq!(report.active_users, 2);
        assert_eq!(report.active_systems, 3);
        assert_eq!(report.most_active_user.as_deref(), Some("Unknown User"));
        assert_eq!(report.top_systems.len(), 2);
        assert!(report.actors.iter().all(|a| a.sparkline.len() == 7));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["actors"][0]["total_accesses"].is_u64());
    }
}
