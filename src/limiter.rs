// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Global cooldown gate for outbound alert emails.
//!
//! One gate is shared by every request and every policy: after an alert is
//! sent, no other alert goes out until the cooldown has elapsed.
//!
//! Checking and claiming the slot happen under one lock, so two reports that
//! race through the gate cannot both send. The claim is provisional until
//! the mail sender accepts the message; an uncommitted claim is rolled back
//! when dropped.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Gate state as seen by a caller at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// An alert may be sent.
    Open,
    /// Alerts are suppressed until the cooldown runs out.
    Cooling {
        /// Time until the gate reopens
        retry_after: Duration,
    },
}

/// Thread-safe alert cooldown gate.
#[derive(Debug)]
pub struct AlertGate {
    cooldown: TimeDelta,
    last_sent_at: Mutex<DateTime<Utc>>,
}

impl AlertGate {
    /// Create a gate that has never fired.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_last_sent(cooldown, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Create a gate with a known last send time.
    pub fn with_last_sent(cooldown: Duration, last_sent_at: DateTime<Utc>) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            last_sent_at: Mutex::new(last_sent_at),
        }
    }

    /// When the last alert was sent (or claimed).
    pub fn last_sent_at(&self) -> DateTime<Utc> {
        *self.lock()
    }

    /// Gate state at `now`, without claiming anything.
    pub fn state(&self, now: DateTime<Utc>) -> GateState {
        state_at(*self.lock(), self.cooldown, now)
    }

    /// Claim the gate at `now` if it is open, otherwise report how long it
    /// stays closed.
    ///
    /// While the returned claim is alive the gate reads as cooling. Call
    /// [`GateClaim::commit`] once the alert is sent; dropping the claim
    /// instead restores the previous send time.
    pub fn try_claim(&self, now: DateTime<Utc>) -> Result<GateClaim<'_>, Duration> {
        let mut last = self.lock();
        match state_at(*last, self.cooldown, now) {
            GateState::Open => {
                let previous = std::mem::replace(&mut *last, now);
                debug!(%now, %previous, "Alert gate claimed");
                Ok(GateClaim {
                    gate: self,
                    claimed_at: now,
                    previous,
                    committed: false,
                })
            }
            GateState::Cooling { retry_after } => Err(retry_after),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        // A timestamp cannot be left half-written.
        self.last_sent_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A provisional hold on the alert gate.
#[derive(Debug)]
#[must_use = "dropping a claim without committing it reopens the gate"]
pub struct GateClaim<'a> {
    gate: &'a AlertGate,
    claimed_at: DateTime<Utc>,
    previous: DateTime<Utc>,
    committed: bool,
}

impl GateClaim<'_> {
    /// The instant recorded as the send time.
    pub fn claimed_at(&self) -> DateTime<Utc> {
        self.claimed_at
    }

    /// Keep the claim: the gate stays cooling from `claimed_at`.
    pub fn commit(mut self) {
        self.committed = true;
        debug!(sent_at = %self.claimed_at, "Alert gate committed");
    }
}

impl Drop for GateClaim<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut last = self.gate.lock();
        // Only undo our own write.
        if *last == self.claimed_at {
            *last = self.previous;
            debug!(restored = %self.previous, "Alert gate claim released");
        }
    }
}

fn state_at(last: DateTime<Utc>, cooldown: TimeDelta, now: DateTime<Utc>) -> GateState {
    let elapsed = now.signed_duration_since(last);
    if elapsed >= cooldown {
        GateState::Open
    } else {
        GateState::Cooling {
            retry_after: (cooldown - elapsed).to_std().unwrap_or(Duration::ZERO),
        }
    }
}
