//! Email service for booking notifications.
//!
//! Supports two providers:
//! - `console`: Logs emails (development)
//! - `sendgrid`: Uses the SendGrid API
//!
//! [`EmailNotifier`] adapts the service to the domain's [`BookingNotifier`]
//! boundary, so a failed send is reported and never propagated.

use async_trait::async_trait;
use domain::models::{Booking, Invitation, Participant, Promotion};
use domain::services::{BookingNotifier, NotificationResult};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Send an email message. A disabled service succeeds without sending.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message),
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );
        info!(body_text = %message.body_text, "Email body");
        Ok(())
    }

    fn sendgrid_body(&self, message: &EmailMessage) -> serde_json::Value {
        let mut recipient = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = serde_json::json!(name);
        }

        serde_json::json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [{
                "type": "text/plain",
                "value": message.body_text
            }]
        })
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&self.sendgrid_body(&message))
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                to = %message.to,
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

fn describe_slot(booking: &Booking) -> String {
    format!(
        "{} to {}",
        booking.start_time.format("%A %-d %B %Y, %H:%M UTC"),
        booking.end_time.format("%H:%M UTC")
    )
}

fn greeting(name: Option<&str>) -> String {
    name.map(|n| format!("Hi {},", n))
        .unwrap_or_else(|| "Hi,".to_string())
}

fn location_line(booking: &Booking) -> String {
    booking
        .location
        .as_deref()
        .map(|l| format!("\nWhere: {}", l))
        .unwrap_or_default()
}

fn booking_confirmed_message(booking: &Booking, to: &str) -> EmailMessage {
    let body_text = format!(
        "{greeting}\n\nYour booking \"{title}\" is confirmed.\n\nWhen: {when}{where_}\n\nReference: {id}\n\nSee you there,\nArts Booking",
        greeting = greeting(booking.artist_name.as_deref()),
        title = booking.title,
        when = describe_slot(booking),
        where_ = location_line(booking),
        id = booking.id,
    );
    EmailMessage {
        to: to.to_string(),
        to_name: booking.artist_name.clone(),
        subject: format!("Booking confirmed: {}", booking.title),
        body_text,
    }
}

fn participant_confirmed_message(
    booking: &Booking,
    participant: &Participant,
    to: &str,
) -> EmailMessage {
    let body_text = format!(
        "{greeting}\n\nYou have a spot in \"{title}\".\n\nWhen: {when}{where_}\n\nIf you can no longer attend, please leave the booking so someone on the waitlist can take your place.\n\nArts Booking",
        greeting = greeting(participant.display_name.as_deref()),
        title = booking.title,
        when = describe_slot(booking),
        where_ = location_line(booking),
    );
    EmailMessage {
        to: to.to_string(),
        to_name: participant.display_name.clone(),
        subject: format!("You're in: {}", booking.title),
        body_text,
    }
}

fn waitlist_promoted_message(booking: &Booking, promotion: &Promotion, to: &str) -> EmailMessage {
    let body_text = format!(
        "{greeting}\n\nA spot opened up in \"{title}\" and you have been moved off the waitlist.\n\nWhen: {when}{where_}\n\nArts Booking",
        greeting = greeting(promotion.participant.display_name.as_deref()),
        title = booking.title,
        when = describe_slot(booking),
        where_ = location_line(booking),
    );
    EmailMessage {
        to: to.to_string(),
        to_name: promotion.participant.display_name.clone(),
        subject: format!("A spot opened up: {}", booking.title),
        body_text,
    }
}

fn invitation_message(
    booking: &Booking,
    invitation: &Invitation,
    token: &str,
    base_url: &str,
) -> EmailMessage {
    let note = invitation
        .message
        .as_deref()
        .map(|m| format!("\n\n\"{}\"", m))
        .unwrap_or_default();
    let body_text = format!(
        "{greeting}\n\nYou have been invited to join \"{title}\".{note}\n\nWhen: {when}{where_}\n\nRespond here: {base_url}/invitations/respond?token={token}\n\nThis invitation expires {expires}.\n\nArts Booking",
        greeting = greeting(invitation.invitee_name.as_deref()),
        title = booking.title,
        when = describe_slot(booking),
        where_ = location_line(booking),
        expires = invitation.expires_at.format("%-d %B %Y, %H:%M UTC"),
    );
    EmailMessage {
        to: invitation.invitee_email.clone(),
        to_name: invitation.invitee_name.clone(),
        subject: format!("You're invited: {}", booking.title),
        body_text,
    }
}

/// Sends booking notifications by email.
#[derive(Clone)]
pub struct EmailNotifier {
    email: EmailService,
}

impl EmailNotifier {
    pub fn new(email: EmailService) -> Self {
        Self { email }
    }

    async fn deliver(&self, message: Option<EmailMessage>) -> NotificationResult {
        let Some(message) = message else {
            return NotificationResult::Skipped;
        };
        if !self.email.is_enabled() {
            return NotificationResult::Skipped;
        }
        match self.email.send(message).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl BookingNotifier for EmailNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> NotificationResult {
        let message = booking
            .artist_email
            .as_deref()
            .map(|to| booking_confirmed_message(booking, to));
        self.deliver(message).await
    }

    async fn participant_confirmed(
        &self,
        booking: &Booking,
        participant: &Participant,
    ) -> NotificationResult {
        let message = participant
            .email
            .as_deref()
            .map(|to| participant_confirmed_message(booking, participant, to));
        self.deliver(message).await
    }

    async fn waitlist_promoted(
        &self,
        booking: &Booking,
        promotion: &Promotion,
    ) -> NotificationResult {
        let message = promotion
            .participant
            .email
            .as_deref()
            .map(|to| waitlist_promoted_message(booking, promotion, to));
        self.deliver(message).await
    }

    async fn invitation_sent(
        &self,
        booking: &Booking,
        invitation: &Invitation,
        token: &str,
    ) -> NotificationResult {
        let message = invitation_message(booking, invitation, token, self.email.base_url());
        self.deliver(Some(message)).await
    }
}
