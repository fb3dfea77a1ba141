//! Shared utilities and common types for the arts booking backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Token generation and hashing for invitation links
//! - Verification of auth provider session tokens
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
