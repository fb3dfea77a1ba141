//! HTTP API for the arts booking backend.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
