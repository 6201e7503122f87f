// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! TLSRPT aggregate report model (RFC 8460).
//!
//! Reports are parsed syntactically only. Field access is lenient: anything
//! absent or of the wrong JSON type is read as "no value", so a sloppy
//! reporter can never take the pipeline down.

use crate::error::ReportError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::info;

/// A parsed TLSRPT report.
#[derive(Debug, Clone)]
pub struct Report {
    pub organization_name: Option<String>,
    pub contact_info: Option<String>,
    pub report_id: Option<String>,
    pub date_range: DateRange,
    pub policies: Vec<Policy>,
    /// The request body exactly as received (after decompression).
    pub raw: String,
}

/// Reporting window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// One policy section of a report.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub policy_domain: Option<String>,
    pub summary: Summary,
    /// `None` when `failure-details` is absent or not an array.
    pub failure_details: Option<Vec<FailureDetail>>,
}

/// Session totals for a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_successful_session_count: Option<u64>,
    pub total_failure_session_count: Option<u64>,
}

/// A class of TLS negotiation failure between two mail servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureDetail {
    pub result_type: Option<String>,
    pub sending_mta_ip: Option<String>,
    pub receiving_mx_hostname: Option<String>,
    pub receiving_ip: Option<String>,
    pub failed_session_count: Option<u64>,
    pub additional_info_uri: Option<String>,
    pub failure_reason_code: Option<String>,
}

/// Who sent the report and which domain a policy covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportIdentity {
    pub org_name: Option<String>,
    pub report_id: Option<String>,
    pub contact_info: Option<String>,
    pub domain: Option<String>,
}

/// Window shown in an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportWindow {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Session counts shown in an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub success_count: Option<u64>,
    pub fail_count: Option<u64>,
}

/// A policy with at least one failure detail, ready to be alerted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAlert {
    pub identity: ReportIdentity,
    pub window: ReportWindow,
    pub counts: SessionCounts,
    pub failures: Vec<FailureDetail>,
}

impl Report {
    /// Parse decoded request text into a report.
    ///
    /// Only JSON syntax is checked. A valid document that is not an object
    /// yields a report with no policies.
    pub fn parse(text: impl Into<String>) -> Result<Self, ReportError> {
        let raw = text.into();
        let value: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_value(&value, raw))
    }

    fn from_value(value: &Value, raw: String) -> Self {
        let date_range = value.get("date-range");
        Self {
            organization_name: str_field(value, "organization-name"),
            contact_info: str_field(value, "contact-info"),
            report_id: str_field(value, "report-id"),
            date_range: DateRange {
                start: date_range.and_then(|r| datetime_field(r, "start-datetime")),
                end: date_range.and_then(|r| datetime_field(r, "end-datetime")),
            },
            policies: value
                .get("policies")
                .and_then(Value::as_array)
                .map(|policies| policies.iter().map(Policy::from_value).collect())
                .unwrap_or_default(),
            raw,
        }
    }
}

impl Policy {
    fn from_value(value: &Value) -> Self {
        let summary = value.get("summary");
        Self {
            policy_domain: value
                .get("policy")
                .and_then(|p| str_field(p, "policy-domain")),
            summary: Summary {
                total_successful_session_count: summary
                    .and_then(|s| count_field(s, "total-successful-session-count")),
                total_failure_session_count: summary
                    .and_then(|s| count_field(s, "total-failure-session-count")),
            },
            failure_details: value
                .get("failure-details")
                .and_then(Value::as_array)
                .map(|details| details.iter().map(FailureDetail::from_value).collect()),
        }
    }

    fn has_failures(&self) -> bool {
        self.failure_details
            .as_ref()
            .is_some_and(|details| !details.is_empty())
    }
}

impl FailureDetail {
    fn from_value(value: &Value) -> Self {
        Self {
            result_type: str_field(value, "result-type"),
            sending_mta_ip: str_field(value, "sending-mta-ip"),
            receiving_mx_hostname: str_field(value, "receiving-mx-hostname"),
            receiving_ip: str_field(value, "receiving-ip"),
            failed_session_count: count_field(value, "failed-session-count"),
            additional_info_uri: str_field(value, "additional-info-uri")
                .filter(|uri| !uri.is_empty()),
            failure_reason_code: str_field(value, "failure-reason-code"),
        }
    }
}

/// Walk the policies of a report and collect those with failure details.
///
/// The alert window uses the report's start instant for both ends.
pub fn extract_failures(report: &Report) -> Vec<PolicyAlert> {
    let org = report.organization_name.as_deref().unwrap_or_default();
    let window = ReportWindow {
        start_time: report.date_range.start,
        end_time: report.date_range.start,
    };

    let mut alerts = Vec::new();
    for policy in &report.policies {
        let counts = SessionCounts {
            success_count: policy.summary.total_successful_session_count,
            fail_count: policy.summary.total_failure_session_count,
        };

        info!(
            org = %org,
            domain = ?policy.policy_domain,
            success = ?counts.success_count,
            failure = ?counts.fail_count,
            "Policy summary"
        );

        if !policy.has_failures() {
            continue;
        }

        alerts.push(PolicyAlert {
            identity: ReportIdentity {
                org_name: report.organization_name.clone(),
                report_id: report.report_id.clone(),
                contact_info: report.contact_info.clone(),
                domain: policy.policy_domain.clone(),
            },
            window,
            counts,
            failures: policy.failure_details.clone().unwrap_or_default(),
        });
    }
    alerts
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn count_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

fn datetime_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value.get(key).and_then(Value::as_str).and_then(parse_datetime)
}

/// RFC 3339 first. Timestamps without an offset, and bare dates, are read
/// as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
