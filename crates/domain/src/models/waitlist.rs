//! Waitlist models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Waitlist entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Waiting,
    Notified,
    Expired,
    Converted,
    Cancelled,
}

impl WaitlistStatus {
    /// Entries still queued for a spot.
    pub fn is_pending(self) -> bool {
        matches!(self, WaitlistStatus::Waiting | WaitlistStatus::Notified)
    }
}

impl std::fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitlistStatus::Waiting => write!(f, "waiting"),
            WaitlistStatus::Notified => write!(f, "notified"),
            WaitlistStatus::Expired => write!(f, "expired"),
            WaitlistStatus::Converted => write!(f, "converted"),
            WaitlistStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A queued request for a spot on a full group booking.
///
/// Positions are unique per booking and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: i32,
    pub status: WaitlistStatus,
    pub created_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl WaitlistEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }

    /// Pending and not yet past its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_pending() && !self.is_expired_at(now)
    }
}
