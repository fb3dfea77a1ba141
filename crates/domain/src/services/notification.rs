//! Notification boundary for booking events.
//!
//! Notifications are best effort. A failed send is logged by the caller and
//! never undoes the booking write that triggered it.

use std::sync::{Arc, Mutex};

use crate::models::{Booking, Invitation, Participant, Promotion};

/// Kind of booking event being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BookingConfirmed,
    ParticipantConfirmed,
    WaitlistPromoted,
    InvitationSent,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::BookingConfirmed => write!(f, "booking_confirmed"),
            NotificationKind::ParticipantConfirmed => write!(f, "participant_confirmed"),
            NotificationKind::WaitlistPromoted => write!(f, "waitlist_promoted"),
            NotificationKind::InvitationSent => write!(f, "invitation_sent"),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Notification was sent successfully.
    Sent,
    /// No address to send to.
    Skipped,
    /// Sending failed (but was non-blocking).
    Failed(String),
}

/// Sends booking notifications.
#[async_trait::async_trait]
pub trait BookingNotifier: Send + Sync + 'static {
    /// A single-party booking was confirmed.
    async fn booking_confirmed(&self, booking: &Booking) -> NotificationResult;

    /// A participant got a spot on a group booking.
    async fn participant_confirmed(
        &self,
        booking: &Booking,
        participant: &Participant,
    ) -> NotificationResult;

    /// A waitlist entry was converted into a participant.
    async fn waitlist_promoted(&self, booking: &Booking, promotion: &Promotion)
        -> NotificationResult;

    /// An invitation was created. `token` is the raw redemption token.
    async fn invitation_sent(
        &self,
        booking: &Booking,
        invitation: &Invitation,
        token: &str,
    ) -> NotificationResult;
}

/// A notification captured by [`MockNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub recipient: Option<String>,
}

/// Mock notifier for development and testing.
///
/// Logs and records notifications but doesn't send them.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock notifier that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Notifications recorded so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    fn record(&self, kind: NotificationKind, recipient: Option<&str>) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(kind = %kind, "Mock notifier simulating failure");
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            kind = %kind,
            recipient = ?recipient,
            "Mock: Would send booking notification"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                kind,
                recipient: recipient.map(str::to_string),
            });
        }

        match recipient {
            Some(_) => NotificationResult::Sent,
            None => NotificationResult::Skipped,
        }
    }
}

#[async_trait::async_trait]
impl BookingNotifier for MockNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> NotificationResult {
        self.record(
            NotificationKind::BookingConfirmed,
            booking.artist_email.as_deref(),
        )
    }

    async fn participant_confirmed(
        &self,
        _booking: &Booking,
        participant: &Participant,
    ) -> NotificationResult {
        self.record(
            NotificationKind::ParticipantConfirmed,
            participant.email.as_deref(),
        )
    }

    async fn waitlist_promoted(
        &self,
        _booking: &Booking,
        promotion: &Promotion,
    ) -> NotificationResult {
        self.record(
            NotificationKind::WaitlistPromoted,
            promotion.participant.email.as_deref(),
        )
    }

    async fn invitation_sent(
        &self,
        _booking: &Booking,
        invitation: &Invitation,
        _token: &str,
    ) -> NotificationResult {
        self.record(
            NotificationKind::InvitationSent,
            Some(&invitation.invitee_email),
        )
    }
}
