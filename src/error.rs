// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the TLSRPT alerter

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a request body into a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Malformed report: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure to load the alert template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while dispatching an alert email.
///
/// Rate limiting and a missing recipient list are not errors; see
/// [`crate::dispatcher::DispatchOutcome`].
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Can't send alert: mail is not enabled")]
    MailNotEnabled,

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build alert message: {0}")]
    Message(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AlertError>;
