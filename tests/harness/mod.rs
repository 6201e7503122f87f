// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the TLSRPT alerter.
//!
//! Provides a recording mail sender, report fixtures and a helper to build
//! application state without touching the network or the filesystem.

#![allow(dead_code)]

pub mod mail;
pub mod reports;

use mail::RecordingMailSender;
use std::sync::Arc;
use std::time::Duration;
use tlsrpt_alerter::{
    config::{Config, MailConfig},
    dispatcher::AlertDispatcher,
    handlers::AppState,
    limiter::AlertGate,
    mailer::MailSender,
    metrics::Metrics,
    template::TemplateStore,
};

pub const TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/alert-email.html"));

pub const FROM: &str = "tlsrpt@example.net";

/// Options for [`state`].
pub struct StateOptions {
    pub mailer: Option<Arc<RecordingMailSender>>,
    pub recipients: Vec<String>,
    pub cooldown: Duration,
    pub max_body_bytes: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            mailer: Some(Arc::new(RecordingMailSender::new())),
            recipients: vec!["ops@example.org".to_string()],
            cooldown: Duration::from_secs(60),
            max_body_bytes: Config::default().max_body_bytes,
        }
    }
}

/// Build a dispatcher with a gate that last fired at the Unix epoch.
pub fn dispatcher(options: &StateOptions) -> AlertDispatcher {
    AlertDispatcher::new(
        Arc::new(AlertGate::new(options.cooldown)),
        Arc::new(TemplateStore::preloaded(TEMPLATE)),
        options
            .mailer
            .clone()
            .map(|m| m as Arc<dyn MailSender>),
        FROM,
        options.recipients.clone(),
    )
}

/// Build application state around [`dispatcher`].
pub fn state(options: &StateOptions) -> Arc<AppState> {
    let config = Config {
        max_body_bytes: options.max_body_bytes,
        mail: MailConfig {
            recipients: options.recipients.clone(),
            cooldown_secs: options.cooldown.as_secs(),
            ..Default::default()
        },
        ..Default::default()
    };

    Arc::new(AppState {
        dispatcher: dispatcher(options),
        metrics: Metrics::new().unwrap(),
        config,
    })
}
