// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the TLSRPT alerter.
//!
//! Everything here is read once at process start and never reloaded.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Ports on which the SMTP relay expects TLS from the first byte.
pub const IMPLICIT_TLS_PORTS: &[u16] = &[465, 8465, 443];

/// Configuration for the TLSRPT alerter service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted request body in bytes (default: 10 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Outbound mail configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Alert template configuration
    #[serde(default)]
    pub template: TemplateConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// SMTP relay, addressing and alert cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host. Mail is disabled without it.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP username. Mail is disabled without it.
    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// SMTP port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Sender address; falls back to the SMTP username when unset.
    #[serde(default)]
    pub from_address: Option<String>,

    /// Alert recipients
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Minimum time between two alert emails, in seconds (default: 0)
    #[serde(default)]
    pub cooldown_secs: u64,
}

/// Where the alert email template lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Path to the HTML template (default: templates/alert-email.html)
    #[serde(default = "default_template_path")]
    pub path: PathBuf,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_smtp_port() -> u16 {
    587
}

fn default_template_path() -> PathBuf {
    PathBuf::from("templates/alert-email.html")
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            mail: MailConfig::default(),
            template: TemplateConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_username: None,
            smtp_password: None,
            smtp_port: default_smtp_port(),
            from_address: None,
            recipients: Vec::new(),
            cooldown_secs: 0,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl MailConfig {
    /// Mail is enabled once both a relay host and a username are present.
    pub fn mail_enabled(&self) -> bool {
        is_set(&self.smtp_host) && is_set(&self.smtp_username)
    }

    /// Whether the relay port calls for implicit TLS rather than STARTTLS.
    pub fn uses_implicit_tls(&self) -> bool {
        IMPLICIT_TLS_PORTS.contains(&self.smtp_port)
    }

    /// Get the cooldown duration
    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// The envelope sender used for alerts.
    pub fn sender(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.smtp_username.as_deref())
    }
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
