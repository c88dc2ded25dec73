//! Event model
//!
//! An event is owned by the organizer who created it. Ownership gates who may
//! attach ticket stock to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Owning user (organizer or admin who created it)
    pub organizer_id: Uuid,

    /// Event title
    pub title: String,

    /// Where the event takes place
    pub venue: String,

    /// Start time
    pub starts_at: DateTime<Utc>,

    /// End time
    pub ends_at: DateTime<Utc>,

    /// When the event was created
    pub created_at: DateTime<Utc>,

    /// When the event was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an event
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub organizer_id: Uuid,
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
