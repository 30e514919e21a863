// Usage Aggregator
//
// Rolls a window of access events up into per-user usage: clicks per system,
// accesses per UTC day, last access and top system. The batch path
// (`aggregate`) and the single-event optimistic path (`apply_optimistic`)
// share `record` and `finalize`, so feeding one extra event through either
// of them yields the same rollup.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

use crate::directory::{ProfileDirectory, SystemDirectory, UNKNOWN_SYSTEM, UNKNOWN_USER};
use crate::models::{AccessEvent, ActorUsage, DailyCount, RawAccessEvent, SystemUsage};

/// Rollup is the result of one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rollup {
    /// Sorted by total accesses, most active first
    pub actors: Vec<ActorUsage>,
    pub stats: AggregateStats,
}

/// AggregateStats counts what the run accepted, skipped and relabeled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub events_accepted: u64,
    pub events_skipped: u64,
    /// Skip count keyed by the malformed-event reason label
    pub skipped_by_reason: BTreeMap<String, u64>,
    /// Users that got the placeholder name
    pub unknown_actors: u64,
    /// (user, system) entries that got the placeholder name
    pub unknown_systems: u64,
}

/// Aggregate a window of access events into a rollup.
///
/// Malformed events are skipped and counted. Events pointing at users or
/// systems missing from the directories are kept under a placeholder label.
pub fn aggregate(
    events: &[RawAccessEvent],
    systems: &SystemDirectory,
    profiles: &ProfileDirectory,
) -> Rollup {
    let mut stats = AggregateStats::default();
    let mut by_actor: HashMap<Uuid, ActorUsage> = HashMap::new();

    for raw in events {
        let event = match raw.validate() {
            Ok(event) => event,
            Err(reason) => {
                debug!("Skipping access event: {}", reason);
                stats.events_skipped += 1;
                *stats
                    .skipped_by_reason
                    .entry(reason.as_str().to_string())
                    .or_insert(0) += 1;
                continue;
            }
        };

        let actor = by_actor.entry(event.actor_id).or_insert_with(|| {
            if profiles.display_name(&event.actor_id).is_none() {
                stats.unknown_actors += 1;
            }
            new_actor(&event, profiles)
        });
        if record(actor, &event, systems) && !systems.contains(&event.target_id) {
            stats.unknown_systems += 1;
        }
        stats.events_accepted += 1;
    }

    let mut actors: Vec<ActorUsage> = by_actor.into_values().collect();
    for actor in &mut actors {
        finalize(actor);
    }
    actors.sort_by(compare_actors);

    Rollup { actors, stats }
}

/// Apply one just-performed access to an existing rollup.
///
/// Used for immediate feedback before the authoritative refetch. The input
/// rollup is left untouched; the updated copy is returned.
pub fn apply_optimistic(
    rollup: &[ActorUsage],
    event: AccessEvent,
    systems: &SystemDirectory,
    profiles: &ProfileDirectory,
) -> Vec<ActorUsage> {
    let mut actors = rollup.to_vec();

    let index = match actors.iter().position(|a| a.actor_id == event.actor_id) {
        Some(index) => index,
        None => {
            actors.push(new_actor(&event, profiles));
            actors.len() - 1
        }
    };

    let actor = &mut actors[index];
    record(actor, &event, systems);
    finalize(actor);

    actors.sort_by(compare_actors);
    actors
}

fn new_actor(event: &AccessEvent, profiles: &ProfileDirectory) -> ActorUsage {
    let display_name = profiles
        .display_name(&event.actor_id)
        .unwrap_or(UNKNOWN_USER)
        .to_string();
    let avatar_url = profiles
        .get(&event.actor_id)
        .and_then(|p| p.avatar_url.clone());

    ActorUsage {
        actor_id: event.actor_id,
        display_name,
        avatar_url,
        total_accesses: 0,
        last_access: event.occurred_at,
        top_system_id: None,
        system_breakdown: Vec::new(),
        history: Vec::new(),
    }
}

/// Count one event against a user. Returns true when the event opened a
/// new system entry in the user's breakdown.
fn record(actor: &mut ActorUsage, event: &AccessEvent, systems: &SystemDirectory) -> bool {
    let mut created = false;
    let index = match actor
        .system_breakdown
        .iter()
        .position(|s| s.target_id == event.target_id)
    {
        Some(index) => index,
        None => {
            created = true;
            actor.system_breakdown.push(SystemUsage {
                target_id: event.target_id,
                display_name: systems
                    .display_name(&event.target_id)
                    .unwrap_or(UNKNOWN_SYSTEM)
                    .to_string(),
                total_clicks: 0,
                last_access: event.occurred_at,
                history: Vec::new(),
            });
            actor.system_breakdown.len() - 1
        }
    };

    let system = &mut actor.system_breakdown[index];
    system.total_clicks += 1;
    system.last_access = system.last_access.max(event.occurred_at);
    system.history.push(event.occurred_at);

    actor.total_accesses += 1;
    actor.last_access = actor.last_access.max(event.occurred_at);

    let day = event.day();
    match actor.history.iter_mut().find(|point| point.date == day) {
        Some(point) => point.count += 1,
        None => actor.history.push(DailyCount { date: day, count: 1 }),
    }

    created
}

/// Put one user's rollup in canonical order and pick the top system.
/// Idempotent.
fn finalize(actor: &mut ActorUsage) {
    actor.history.sort_by_key(|point| point.date);
    for system in &mut actor.system_breakdown {
        system.history.sort();
    }
    actor.system_breakdown.sort_by(compare_systems);
    actor.top_system_id = actor.system_breakdown.first().map(|s| s.target_id);
}

/// Label order that ignores case and accents ("Álvaro" sits with the A's),
/// falling back to the exact text when two labels fold to the same key
pub(crate) fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(label: &str) -> String {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_systems(a: &SystemUsage, b: &SystemUsage) -> Ordering {
    b.total_clicks
        .cmp(&a.total_clicks)
        .then_with(|| compare_labels(&a.display_name, &b.display_name))
        .then_with(|| a.target_id.cmp(&b.target_id))
}

fn compare_actors(a: &ActorUsage, b: &ActorUsage) -> Ordering {
    b.total_accesses
        .cmp(&a.total_accesses)
        .then_with(|| compare_labels(&a.display_name, &b.display_name))
        .then_with(|| a.actor_id.cmp(&b.actor_id))
}
