//! In-process [`BookingStore`] for development and tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::availability::find_conflicts;
use super::store::BookingStore;
use super::{invitation, waitlist};
use crate::error::{BookingError, BookingResult};
use crate::models::{
    Booking, BookingFilter, BookingStatus, Draft, ExpirySweep, GroupBookingState, Invitation,
    NewBooking, TimeRange, Transition,
};

/// Keeps every booking and its group data behind one lock.
///
/// Holding the lock across check and write gives the same guarantees the
/// Postgres store gets from row and advisory locks.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    groups: Mutex<HashMap<Uuid, GroupBookingState>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_slot_free(
        groups: &HashMap<Uuid, GroupBookingState>,
        booking: &Booking,
    ) -> BookingResult<()> {
        let existing: Vec<Booking> = groups
            .values()
            .filter(|s| s.booking.resource_id == booking.resource_id)
            .map(|s| s.booking.clone())
            .collect();
        let conflicts = find_conflicts(
            &booking.resource_id,
            &booking.time_range(),
            &existing,
            Some(booking.id),
        );
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(BookingError::SlotTaken {
                conflicting_bookings: conflicts.iter().map(|b| b.id).collect(),
            })
        }
    }
}

#[async_trait::async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn list_bookings(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        let groups = self.groups.lock().await;
        let mut bookings: Vec<Booking> = groups
            .values()
            .map(|s| &s.booking)
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.start_time, b.created_at));
        if filter.limit > 0 {
            bookings.truncate(filter.limit as usize);
        }
        Ok(bookings)
    }

    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let groups = self.groups.lock().await;
        Ok(groups.get(&id).map(|s| s.booking.clone()))
    }

    async fn confirmed_bookings_overlapping(
        &self,
        resource_id: &str,
        range: &TimeRange,
    ) -> BookingResult<Vec<Booking>> {
        let groups = self.groups.lock().await;
        let existing: Vec<Booking> = groups.values().map(|s| s.booking.clone()).collect();
        Ok(find_conflicts(resource_id, range, &existing, None)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn insert_booking(&self, new_booking: NewBooking) -> BookingResult<Booking> {
        let mut groups = self.groups.lock().await;
        let booking = new_booking.into_booking(Uuid::new_v4(), Utc::now());
        if booking.status.blocks_slot() {
            Self::ensure_slot_free(&groups, &booking)?;
        }
        groups.insert(booking.id, GroupBookingState::new(booking.clone()));
        Ok(booking)
    }

    async fn transition_status(&self, id: Uuid, to: BookingStatus) -> BookingResult<Booking> {
        let mut groups = self.groups.lock().await;
        let current = groups
            .get(&id)
            .map(|s| s.booking.clone())
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))?;

        if !current.status.can_transition_to(to) {
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to,
            });
        }
        if to.blocks_slot() {
            Self::ensure_slot_free(&groups, &current)?;
        }

        let state = groups
            .get_mut(&id)
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))?;
        state.booking.status = to;
        state.booking.updated_at = Utc::now();
        Ok(state.booking.clone())
    }

    async fn load_group(&self, booking_id: Uuid) -> BookingResult<Option<GroupBookingState>> {
        let groups = self.groups.lock().await;
        Ok(groups.get(&booking_id).cloned())
    }

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> BookingResult<Option<Invitation>> {
        let groups = self.groups.lock().await;
        Ok(groups
            .values()
            .flat_map(|s| s.invitations.iter())
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn transact<T, F>(&self, booking_id: Uuid, operation: F) -> BookingResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Draft) -> Transition<T> + Send + 'static,
    {
        let mut groups = self.groups.lock().await;
        let stored = groups
            .get_mut(&booking_id)
            .ok_or_else(BookingError::group_booking_not_found)?;

        let Transition { changes, result } = operation(Draft::new(stored.clone()));

        if !changes.is_empty() {
            let mut next = stored.clone();
            for change in &changes {
                next.apply(change)?;
            }
            next.verify()?;
            next.booking.updated_at = Utc::now();
            *stored = next;
        }

        result
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> BookingResult<ExpirySweep> {
        let mut groups = self.groups.lock().await;
        let mut sweep = ExpirySweep::default();

        for stored in groups.values_mut() {
            let mut draft = Draft::new(stored.clone());
            sweep.invitations += invitation::expire_stale(&mut draft, now)?;
            sweep.waitlist_entries += waitlist::expire_stale(&mut draft, now)?;
            if !draft.changes().is_empty() {
                *stored = draft.state().clone();
            }
        }

        Ok(sweep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Change, CreateBookingRequest};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 15, hour, 0, 0).unwrap()
    }

    fn request(resource_id: &str, start: u32, end: u32) -> NewBooking {
        CreateBookingRequest {
            org_id: "org_1".to_string(),
            resource_id: resource_id.to_string(),
            resource_type: None,
            title: None,
            description: None,
            start_time: at(start),
            end_time: at(end),
            artist_name: Some("Rui".to_string()),
            artist_email: None,
            goal_text: None,
            consent_recording: false,
            price_cents: None,
            currency: None,
            location: None,
        }
        .into_new_booking(None)
    }

    #[tokio::test]
    async fn test_insert_rejects_overlap() {
        let store = InMemoryBookingStore::new();
        let first = store.insert_booking(request("room-1", 10, 12)).await.unwrap();

        let result = store.insert_booking(request("room-1", 11, 13)).await;
        assert_eq!(
            result.unwrap_err(),
            BookingError::SlotTaken {
                conflicting_bookings: vec![first.id]
            }
        );

        assert!(store.insert_booking(request("room-1", 12, 13)).await.is_ok());
        assert!(store.insert_booking(request("room-2", 10, 12)).await.is_ok());
    }

    #[tokio::test]
    async fn test_confirming_rechecks_slot() {
        let store = InMemoryBookingStore::new();
        let mut pending = request("room-1", 10, 12);
        pending.status = BookingStatus::Pending;
        let pending = store.insert_booking(pending).await.unwrap();
        store.insert_booking(request("room-1", 11, 12)).await.unwrap();

        assert!(matches!(
            store
                .transition_status(pending.id, BookingStatus::Confirmed)
                .await,
            Err(BookingError::SlotTaken { .. })
        ));
        let cancelled = store
            .transition_status(pending.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(
            store
                .transition_status(pending.id, BookingStatus::Confirmed)
                .await,
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_transact_rejects_inconsistent_changes() {
        let store = InMemoryBookingStore::new();
        let booking = store.insert_booking(request("room-1", 10, 11)).await.unwrap();

        let result: BookingResult<()> = store
            .transact(booking.id, |mut draft| {
                let recorded = draft.record(Change::SpotReserved);
                draft.finish(recorded)
            })
            .await;
        assert!(matches!(result, Err(BookingError::InvariantViolation(_))));

        let stored = store.find_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.available_spots, 1);
        assert_eq!(stored.current_participants, 0);
    }

    #[tokio::test]
    async fn test_transact_unknown_booking() {
        let store = InMemoryBookingStore::new();
        let result: BookingResult<()> = store
            .transact(Uuid::new_v4(), |draft| draft.finish(Ok(())))
            .await;
        assert_eq!(result, Err(BookingError::group_booking_not_found()));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = InMemoryBookingStore::new();
        store.insert_booking(request("room-1", 14, 15)).await.unwrap();
        store.insert_booking(request("room-1", 9, 10)).await.unwrap();
        store.insert_booking(request("room-2", 9, 10)).await.unwrap();

        let filter = BookingFilter {
            resource_id: Some("room-1".to_string()),
            limit: 10,
            ..Default::default()
        };
        let bookings = store.list_bookings(&filter).await.unwrap();
        assert_eq!(bookings.len(), 2);
        assert!(bookings[0].start_time < bookings[1].start_time);

        let window = BookingFilter {
            from: Some(at(13)),
            to: Some(at(16)),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(store.list_bookings(&window).await.unwrap().len(), 1);
    }
}
