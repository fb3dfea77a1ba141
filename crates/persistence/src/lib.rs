//! Persistence layer for the arts booking backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The PostgreSQL [`BookingStore`](domain::services::BookingStore)

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::PgBookingStore;
