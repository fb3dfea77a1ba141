//! External service integrations.

pub mod email;

pub use email::{EmailError, EmailMessage, EmailNotifier, EmailService};
