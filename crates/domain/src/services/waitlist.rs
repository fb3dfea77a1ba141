//! Waitlist queueing and promotion.
//!
//! Entries are promoted strictly in position order. Expiry is checked
//! lazily: an entry past its `expires_at` is marked `expired` the next time a
//! promotion walks over it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::models::participant::ROLE_PARTICIPANT;
use crate::models::{
    Change, Draft, NewParticipant, Participant, ParticipantStatus, Promotion, WaitlistEntry,
    WaitlistStatus,
};

/// Position for the next entry: one past the highest ever assigned.
pub fn next_position(waitlist: &[WaitlistEntry]) -> i32 {
    waitlist.iter().map(|e| e.position).max().unwrap_or(0) + 1
}

/// Appends a `waiting` entry. It expires when the booking starts, so the
/// queue is closed once the booking is under way.
pub fn enqueue(
    draft: &mut Draft,
    new_participant: NewParticipant,
    now: DateTime<Utc>,
) -> BookingResult<WaitlistEntry> {
    let state = draft.state();
    if now >= state.booking.start_time {
        return Err(BookingError::Conflict(
            "The waitlist is closed because the booking has started".to_string(),
        ));
    }

    let mut metadata = new_participant.metadata;
    if let Some(map) = metadata.as_object_mut() {
        map.insert("role".to_string(), new_participant.role.into());
        if let Some(notes) = new_participant.notes {
            map.insert("notes".to_string(), notes.into());
        }
    }

    let entry = WaitlistEntry {
        id: Uuid::new_v4(),
        booking_id: state.booking.id,
        user_id: new_participant.user_id,
        name: new_participant.display_name,
        email: new_participant.email,
        phone: new_participant.phone,
        position: next_position(&state.waitlist),
        status: WaitlistStatus::Waiting,
        created_at: now,
        notified_at: None,
        expires_at: Some(state.booking.start_time),
        converted_at: None,
        metadata,
    };

    draft.record(Change::WaitlistAdded(entry.clone()))?;
    Ok(entry)
}

/// Fills one free spot from the head of the queue.
///
/// Returns `None` when there is no free spot or no active entry left.
pub fn promote_next(draft: &mut Draft, now: DateTime<Utc>) -> BookingResult<Option<Promotion>> {
    promote_head(draft, now, Vec::new())
}

/// Promotes a specific entry.
///
/// Earlier entries that have expired are marked `expired` and skipped. An
/// earlier entry that is still active blocks the promotion. If the requested
/// entry itself has expired it is marked so and the next active entry is
/// promoted instead.
pub fn promote(
    draft: &mut Draft,
    waitlist_id: Uuid,
    now: DateTime<Utc>,
) -> BookingResult<Promotion> {
    let state = draft.state();
    if !state.booking.is_group_booking {
        return Err(BookingError::group_booking_not_found());
    }
    if !state.booking.status.is_open() {
        return Err(BookingError::Conflict(format!(
            "Cannot promote into a {} booking",
            state.booking.status
        )));
    }

    let entry = state
        .waitlist_entry(waitlist_id)
        .cloned()
        .ok_or_else(|| BookingError::NotFound("Waitlist entry not found".to_string()))?;
    if !entry.status.is_pending() {
        return Err(BookingError::Conflict(format!(
            "Waitlist entry is already {}",
            entry.status
        )));
    }
    if !state.ledger().has_space() {
        return Err(BookingError::BookingFull);
    }

    let earlier: Vec<WaitlistEntry> = state
        .pending_waitlist()
        .into_iter()
        .filter(|e| e.position < entry.position)
        .cloned()
        .collect();

    let mut expired = Vec::new();
    for ahead in earlier {
        if !ahead.is_expired_at(now) {
            return Err(BookingError::Conflict(
                "An earlier waitlist entry must be promoted first".to_string(),
            ));
        }
        mark_expired(draft, ahead.id, now)?;
        expired.push(ahead.id);
    }

    if entry.is_expired_at(now) {
        mark_expired(draft, entry.id, now)?;
        expired.push(entry.id);
        return promote_head(draft, now, expired)?.ok_or_else(|| {
            BookingError::Expired("Waitlist entry has expired".to_string())
        });
    }

    convert(draft, &entry, expired, now)
}

/// Marks every pending entry past its expiry. Returns how many changed.
pub fn expire_stale(draft: &mut Draft, now: DateTime<Utc>) -> BookingResult<u64> {
    let stale: Vec<Uuid> = draft
        .state()
        .waitlist
        .iter()
        .filter(|e| e.status.is_pending() && e.is_expired_at(now))
        .map(|e| e.id)
        .collect();

    for id in &stale {
        mark_expired(draft, *id, now)?;
    }
    Ok(stale.len() as u64)
}

fn promote_head(
    draft: &mut Draft,
    now: DateTime<Utc>,
    mut expired: Vec<Uuid>,
) -> BookingResult<Option<Promotion>> {
    if !draft.state().ledger().has_space() {
        return Ok(None);
    }

    let queue: Vec<WaitlistEntry> = draft
        .state()
        .pending_waitlist()
        .into_iter()
        .cloned()
        .collect();

    for entry in queue {
        if entry.is_expired_at(now) {
            mark_expired(draft, entry.id, now)?;
            expired.push(entry.id);
            continue;
        }
        return convert(draft, &entry, expired, now).map(Some);
    }

    Ok(None)
}

fn mark_expired(draft: &mut Draft, entry_id: Uuid, now: DateTime<Utc>) -> BookingResult<()> {
    draft.record(Change::WaitlistStatusChanged {
        entry_id,
        status: WaitlistStatus::Expired,
        at: now,
    })
}

fn convert(
    draft: &mut Draft,
    entry: &WaitlistEntry,
    expired_entries: Vec<Uuid>,
    now: DateTime<Utc>,
) -> BookingResult<Promotion> {
    let role = entry
        .metadata
        .get("role")
        .and_then(|r| r.as_str())
        .unwrap_or(ROLE_PARTICIPANT)
        .to_string();
    let notes = entry
        .metadata
        .get("notes")
        .and_then(|n| n.as_str())
        .map(str::to_string);

    let participant = Participant {
        id: Uuid::new_v4(),
        booking_id: entry.booking_id,
        user_id: entry.user_id.clone(),
        display_name: entry.name.clone(),
        email: entry.email.clone(),
        phone: entry.phone.clone(),
        status: ParticipantStatus::Confirmed,
        role,
        notes,
        registered_at: entry.created_at,
        confirmed_at: Some(now),
        cancelled_at: None,
        metadata: serde_json::json!({
            "promoted_from_waitlist": true,
            "waitlist_position": entry.position,
        }),
    };

    draft.record(Change::SpotReserved)?;
    draft.record(Change::ParticipantAdded(participant.clone()))?;
    draft.record(Change::WaitlistStatusChanged {
        entry_id: entry.id,
        status: WaitlistStatus::Converted,
        at: now,
    })?;

    Ok(Promotion {
        participant,
        waitlist_entry_id: entry.id,
        from_position: entry.position,
        expired_entries,
    })
}
