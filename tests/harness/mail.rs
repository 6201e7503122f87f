// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory mail sender.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tlsrpt_alerter::{
    error::{AlertError, Result},
    mailer::{AlertMessage, MailSender},
};

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailSender {
    sent: Mutex<Vec<AlertMessage>>,
    attempts: Mutex<usize>,
    fail_with: Option<String>,
    delay: Duration,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose relay rejects every message.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// A sender that takes `delay` to accept each message.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Wait until at least `count` messages were sent, or give up after a
    /// second.
    pub async fn wait_for(&self, count: usize) -> Vec<AlertMessage> {
        for _ in 0..50 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, message: &AlertMessage) -> Result<String> {
        *self.attempts.lock().unwrap() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reason) = &self.fail_with {
            return Err(AlertError::Delivery(reason.clone()));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("250 queued as {}", sent.len()))
    }
}
