// Data Models and Types
//
// This module defines the data structures shared by the store, the usage
// aggregator and the HTTP layer. Raw rows come out of the access log store,
// get validated into access events, and are rolled up into per-user usage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Profile is the display metadata of a portal user (an actor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Category groups cataloged systems on the portal home page
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub name: String,
    pub is_visible: bool,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
}

/// SystemInfo is one cataloged SaaS tool (a target)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SystemInfo {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// Icon name rendered next to the system
    pub icon: String,
    pub category: String,
}

/// AccessLogRow is one row of the trailing-window query
/// Every column is nullable here so a corrupt row is skipped, not fatal
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogRow {
    pub user_id: Option<Uuid>,
    pub link_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    /// Joined profile data: absent, an object, or a one-element array
    pub profile: Option<serde_json::Value>,
}

/// RawAccessEvent is an access event before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAccessEvent {
    pub actor_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl RawAccessEvent {
    pub fn validate(&self) -> Result<AccessEvent, MalformedEvent> {
        let actor_id = self.actor_id.ok_or(MalformedEvent::MissingActor)?;
        let target_id = self.target_id.ok_or(MalformedEvent::MissingTarget)?;
        let occurred_at = self.occurred_at.ok_or(MalformedEvent::MissingTimestamp)?;

        Ok(AccessEvent {
            actor_id,
            target_id,
            occurred_at,
        })
    }
}

impl From<&AccessLogRow> for RawAccessEvent {
    fn from(row: &AccessLogRow) -> Self {
        Self {
            actor_id: row.user_id,
            target_id: row.link_id,
            occurred_at: row.created_at,
        }
    }
}

impl From<AccessEvent> for RawAccessEvent {
    fn from(event: AccessEvent) -> Self {
        Self {
            actor_id: Some(event.actor_id),
            target_id: Some(event.target_id),
            occurred_at: Some(event.occurred_at),
        }
    }
}

/// MalformedEvent names the required field an access event is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MalformedEvent {
    #[error("access event has no actor id")]
    MissingActor,
    #[error("access event has no target id")]
    MissingTarget,
    #[error("access event has no timestamp")]
    MissingTimestamp,
}

impl MalformedEvent {
    /// Label used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedEvent::MissingActor => "missing_actor",
            MalformedEvent::MissingTarget => "missing_target",
            MalformedEvent::MissingTimestamp => "missing_timestamp",
        }
    }
}

/// AccessEvent is one validated "user opened a system" record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl AccessEvent {
    /// Calendar day of the event, always taken in UTC
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }
}

/// SystemUsage is one system's usage inside one user's rollup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUsage {
    pub target_id: Uuid,
    pub display_name: String,
    pub total_clicks: u64,
    pub last_access: DateTime<Utc>,
    /// Every access timestamp for this (user, system) pair
    pub history: Vec<DateTime<Utc>>,
}

/// DailyCount is the number of accesses a user made on one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// ActorUsage is the full usage rollup for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorUsage {
    pub actor_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub total_accesses: u64,
    pub last_access: DateTime<Utc>,
    pub top_system_id: Option<Uuid>,
    pub system_breakdown: Vec<SystemUsage>,
    /// Sparse: only days with at least one access
    pub history: Vec<DailyCount>,
}

/// RankedSystem is a system ranked by clicks across all users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSystem {
    pub target_id: Uuid,
    pub display_name: String,
    pub icon: Option<String>,
    pub total_clicks: u64,
}

/// RankedCategory is a category ranked by clicks across all users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCategory {
    pub category: String,
    pub total_clicks: u64,
}
