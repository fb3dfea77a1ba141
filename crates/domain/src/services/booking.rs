//! Single-party bookings: availability, creation, listing and status changes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::availability::{check_availability, AvailabilityResult};
use super::notification::{BookingNotifier, NotificationResult};
use super::store::BookingStore;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingFilter, BookingStatus, CreateBookingRequest, TimeRange};

/// Booking operations over a [`BookingStore`].
pub struct BookingService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> Clone for BookingService<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: BookingStore, N: BookingNotifier> BookingService<S, N> {
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Whether `resource_id` is free for `range`.
    ///
    /// The answer is advisory; creation re-checks under the resource lock.
    pub async fn is_available(
        &self,
        resource_id: &str,
        range: TimeRange,
        exclude_booking_id: Option<Uuid>,
    ) -> BookingResult<AvailabilityResult> {
        let existing = self
            .store
            .confirmed_bookings_overlapping(resource_id, &range)
            .await?;
        Ok(check_availability(
            resource_id,
            &range,
            &existing,
            exclude_booking_id,
        ))
    }

    /// Books a slot. The booking is confirmed on success.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        created_by: Option<String>,
    ) -> BookingResult<Booking> {
        let range = TimeRange::new(request.start_time, request.end_time)?;

        let availability = self.is_available(&request.resource_id, range, None).await?;
        if !availability.available {
            debug!(
                resource_id = %request.resource_id,
                conflicts = availability.conflicting_bookings.len(),
                "Slot unavailable"
            );
            return Err(BookingError::SlotTaken {
                conflicting_bookings: availability.conflicting_ids(),
            });
        }

        let booking = self
            .store
            .insert_booking(request.into_new_booking(created_by))
            .await?;

        info!(
            booking_id = %booking.id,
            resource_id = %booking.resource_id,
            start_time = %booking.start_time,
            "Booking created"
        );

        match self.notifier.booking_confirmed(&booking).await {
            NotificationResult::Failed(reason) => {
                warn!(booking_id = %booking.id, error = %reason, "Failed to send booking confirmation");
            }
            NotificationResult::Sent | NotificationResult::Skipped => {}
        }

        Ok(booking)
    }

    pub async fn list_bookings(&self, filter: BookingFilter) -> BookingResult<Vec<Booking>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from >= to {
                return Err(BookingError::Validation(
                    "from must be before to".to_string(),
                ));
            }
        }
        self.store.list_bookings(&filter).await
    }

    pub async fn get_booking(&self, id: Uuid) -> BookingResult<Booking> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))
    }

    /// Applies a status transition.
    pub async fn update_status(&self, id: Uuid, to: BookingStatus) -> BookingResult<Booking> {
        let booking = self.store.transition_status(id, to).await?;
        info!(booking_id = %id, status = %to, "Booking status updated");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::InMemoryBookingStore;
    use crate::services::notification::MockNotifier;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 3, 3, hour, minute, 0).unwrap()
    }

    fn range(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
        TimeRange::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    fn request(resource_id: &str, slot: TimeRange) -> CreateBookingRequest {
        CreateBookingRequest {
            org_id: "org_1".to_string(),
            resource_id: resource_id.to_string(),
            resource_type: Some("studio".to_string()),
            title: None,
            description: None,
            start_time: slot.start,
            end_time: slot.end,
            artist_name: Some("Ines".to_string()),
            artist_email: Some("ines@example.com".to_string()),
            goal_text: Some("Mix the EP".to_string()),
            consent_recording: true,
            price_cents: None,
            currency: None,
            location: None,
        }
    }

    fn service() -> (
        BookingService<InMemoryBookingStore, MockNotifier>,
        Arc<MockNotifier>,
    ) {
        let notifier = Arc::new(MockNotifier::new());
        let service = BookingService::new(
            Arc::new(InMemoryBookingStore::new()),
            Arc::clone(&notifier),
        );
        (service, notifier)
    }

    #[tokio::test]
    async fn test_availability_scenarios() {
        let (service, _) = service();
        service
            .create_booking(request("room-1", range(11, 0, 12, 0)), None)
            .await
            .unwrap();

        let touching = service
            .is_available("room-1", range(10, 0, 11, 0), None)
            .await
            .unwrap();
        assert!(touching.available);

        let (service, _) = self::service();
        service
            .create_booking(request("room-1", range(10, 30, 11, 30)), None)
            .await
            .unwrap();
        let overlapping = service
            .is_available("room-1", range(10, 0, 11, 0), None)
            .await
            .unwrap();
        assert!(!overlapping.available);
        assert_eq!(
            overlapping.reason.as_deref(),
            Some("Time slot is already booked")
        );
    }

    #[tokio::test]
    async fn test_create_booking_conflict() {
        let (service, _) = service();
        let first = service
            .create_booking(request("room-1", range(10, 0, 11, 0)), Some("user_1".to_string()))
            .await
            .unwrap();
        assert_eq!(first.status, BookingStatus::Confirmed);
        assert_eq!(first.created_by.as_deref(), Some("user_1"));

        let second = service
            .create_booking(request("room-1", range(10, 30, 11, 30)), None)
            .await;
        assert_eq!(
            second.unwrap_err(),
            BookingError::SlotTaken {
                conflicting_bookings: vec![first.id]
            }
        );
    }

    #[tokio::test]
    async fn test_create_booking_sends_confirmation() {
        let (service, notifier) = service();
        service
            .create_booking(request("room-1", range(9, 0, 10, 0)), None)
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_booking() {
        let service = BookingService::new(
            Arc::new(InMemoryBookingStore::new()),
            Arc::new(MockNotifier::failing()),
        );
        assert!(service
            .create_booking(request("room-1", range(9, 0, 10, 0)), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_slot() {
        let (service, _) = service();
        let booking = service
            .create_booking(request("room-1", range(10, 0, 11, 0)), None)
            .await
            .unwrap();
        service
            .update_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let again = service
            .create_booking(request("room-1", range(10, 0, 11, 0)), None)
            .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_transition() {
        let (service, _) = service();
        let booking = service
            .create_booking(request("room-1", range(10, 0, 11, 0)), None)
            .await
            .unwrap();
        service
            .update_status(booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            service
                .update_status(booking.id, BookingStatus::Cancelled)
                .await
                .unwrap_err(),
            BookingError::InvalidTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Cancelled,
            }
        );
    }

    #[tokio::test]
    async fn test_get_missing_booking() {
        let (service, _) = service();
        assert!(matches!(
            service.get_booking(Uuid::new_v4()).await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_window() {
        let (service, _) = service();
        let filter = BookingFilter {
            from: Some(at(12, 0)),
            to: Some(at(12, 0) - Duration::hours(1)),
            limit: 10,
            ..Default::default()
        };
        assert!(matches!(
            service.list_bookings(filter).await,
            Err(BookingError::Validation(_))
        ));
    }
}
