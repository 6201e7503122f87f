// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for report ingest and alert dispatch.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Service counters, registered in their own registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub reports_received: IntCounter,
    pub reports_rejected: IntCounter,
    pub alerts: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let reports_received = IntCounter::new(
            "tlsrpt_reports_received_total",
            "TLSRPT submissions received",
        )?;
        let reports_rejected = IntCounter::new(
            "tlsrpt_reports_rejected_total",
            "TLSRPT submissions rejected as malformed",
        )?;
        let alerts = IntCounterVec::new(
            Opts::new("tlsrpt_alerts_total", "Alert dispatch attempts by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(reports_received.clone()))?;
        registry.register(Box::new(reports_rejected.clone()))?;
        registry.register(Box::new(alerts.clone()))?;

        Ok(Self {
            registry,
            reports_received,
            reports_rejected,
            alerts,
        })
    }

    /// Count one alert outcome.
    pub fn record_alert(&self, outcome: &str) {
        self.alerts.with_label_values(&[outcome]).inc();
    }

    /// Render all counters in the Prometheus text format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
