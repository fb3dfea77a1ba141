//! Background job that expires stale invitations and waitlist entries.
//!
//! Request paths already expire these lazily when they touch them; the
//! sweep catches the ones nobody touches.

use domain::services::{BookingNotifier, BookingStore, GroupBookingService};
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_expired;

pub struct ExpirySweepJob<S, N> {
    group_bookings: GroupBookingService<S, N>,
    interval_minutes: u64,
}

impl<S: BookingStore, N: BookingNotifier> ExpirySweepJob<S, N> {
    pub fn new(group_bookings: GroupBookingService<S, N>, interval_minutes: u64) -> Self {
        Self {
            group_bookings,
            interval_minutes: interval_minutes.max(1),
        }
    }
}

#[async_trait::async_trait]
impl<S: BookingStore, N: BookingNotifier> Job for ExpirySweepJob<S, N> {
    fn name(&self) -> &'static str {
        "expiry_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        let sweep = self
            .group_bookings
            .expire_stale()
            .await
            .map_err(|e| e.to_string())?;

        record_expired(sweep.invitations, sweep.waitlist_entries);
        if sweep.invitations > 0 || sweep.waitlist_entries > 0 {
            info!(
                invitations = sweep.invitations,
                waitlist_entries = sweep.waitlist_entries,
                "Expired stale group booking items"
            );
        }
        Ok(())
    }
}
