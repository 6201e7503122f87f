// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mail.
//!
//! [`MailSender`] is the seam between alert composition and delivery. The
//! production implementation relays through an authenticated SMTP server
//! with lettre.

use crate::config::MailConfig;
use crate::error::{AlertError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use tracing::{debug, info};

/// A fully composed alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: MailAttachment,
}

/// A file attached to an alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

/// Delivers composed alert emails.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Hand a message to the mail system. Returns a delivery receipt for
    /// logging.
    async fn send(&self, message: &AlertMessage) -> Result<String>;
}

/// SMTP relay sender.
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    /// Build a sender from configuration, or `None` when mail is disabled.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>> {
        if !config.mail_enabled() {
            return Ok(None);
        }
        let (Some(host), Some(username)) =
            (config.smtp_host.as_deref(), config.smtp_username.as_deref())
        else {
            return Ok(None);
        };

        let implicit_tls = config.uses_implicit_tls();
        let builder = if implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| AlertError::Delivery(e.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                username.to_string(),
                config.smtp_password.clone().unwrap_or_default(),
            ))
            .build();

        info!(
            host = %host,
            port = config.smtp_port,
            implicit_tls,
            "SMTP relay configured"
        );
        Ok(Some(Self { transport }))
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: &AlertMessage) -> Result<String> {
        let email = build_message(message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        let receipt = format_receipt(response.code(), response.message());
        debug!(receipt = %receipt, "SMTP relay accepted message");
        Ok(receipt)
    }
}

/// Convert an alert into a MIME message: plaintext and HTML alternatives
/// plus the attachment.
pub fn build_message(message: &AlertMessage) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .subject(message.subject.clone());
    for recipient in &message.to {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    let content_type = ContentType::parse(&message.attachment.content_type)
        .map_err(|e| AlertError::Message(e.to_string()))?;
    let attachment = Attachment::new(message.attachment.filename.clone())
        .body(message.attachment.content.clone(), content_type);

    builder
        .multipart(
            MultiPart::mixed()
                .multipart(MultiPart::alternative_plain_html(
                    message.text.clone(),
                    message.html.clone(),
                ))
                .singlepart(attachment),
        )
        .map_err(|e| AlertError::Message(e.to_string()))
}

/// Flatten an SMTP reply into a one-line receipt: the status code followed
/// by the reply lines.
pub fn format_receipt<'a>(
    code: impl fmt::Display,
    lines: impl IntoIterator<Item = &'a str>,
) -> String {
    let text = lines.into_iter().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        code.to_string()
    } else {
        format!("{code} {text}")
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| AlertError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
