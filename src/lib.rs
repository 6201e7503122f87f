// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! TLSRPT Alerter
//!
//! Receives SMTP TLS reports (RFC 8460) over HTTP and emails a summary of
//! every policy that reports TLS negotiation failures:
//!
//! - Gzip-compressed or plain JSON submissions
//! - Lenient report parsing (syntax only)
//! - One alert per failing policy, with the report attached
//! - A single global cooldown between alert emails

pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod report;
pub mod template;

pub use config::Config;
pub use dispatcher::{AlertDispatcher, DispatchOutcome};
pub use error::{AlertError, ReportError};
pub use limiter::AlertGate;
pub use report::{extract_failures, PolicyAlert, Report};
