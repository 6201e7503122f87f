// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Alert dispatch.
//!
//! Turns one failing policy into one alert email, subject to the global
//! cooldown gate.

use crate::error::{AlertError, Result};
use crate::limiter::AlertGate;
use crate::mailer::{AlertMessage, MailAttachment, MailSender};
use crate::report::{FailureDetail, PolicyAlert, Report};
use crate::template::{self, TemplateStore};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Attachment name for the inbound report.
pub const REPORT_ATTACHMENT_NAME: &str = "report.json";

/// What happened to an alert that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The alert was handed to the mail system
    Sent {
        /// Delivery receipt from the mail sender
        receipt: String,
    },
    /// Suppressed by the cooldown gate
    RateLimited,
    /// No recipients are configured
    NoRecipients,
}

impl DispatchOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent { .. } => "sent",
            Self::RateLimited => "rate_limited",
            Self::NoRecipients => "no_recipients",
        }
    }
}

/// Composes and sends alert emails.
pub struct AlertDispatcher {
    gate: Arc<AlertGate>,
    templates: Arc<TemplateStore>,
    mailer: Option<Arc<dyn MailSender>>,
    from: String,
    recipients: Vec<String>,
}

impl AlertDispatcher {
    /// Create a dispatcher. `mailer` is `None` when mail is not enabled.
    pub fn new(
        gate: Arc<AlertGate>,
        templates: Arc<TemplateStore>,
        mailer: Option<Arc<dyn MailSender>>,
        from: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            gate,
            templates,
            mailer,
            from: from.into(),
            recipients,
        }
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    /// Send an alert for a failing policy, unless the cooldown is active.
    pub async fn report_issue(&self, report: &Report, alert: &PolicyAlert) -> Result<DispatchOutcome> {
        self.report_issue_at(Utc::now(), report, alert).await
    }

    /// [`report_issue`](Self::report_issue) with an explicit clock reading.
    pub async fn report_issue_at(
        &self,
        now: DateTime<Utc>,
        report: &Report,
        alert: &PolicyAlert,
    ) -> Result<DispatchOutcome> {
        let domain = alert.identity.domain.as_deref().unwrap_or_default();

        let claim = match self.gate.try_claim(now) {
            Ok(claim) => claim,
            Err(retry_after) => {
                info!(
                    domain = %domain,
                    retry_after_secs = retry_after.as_secs(),
                    "Not sending alert: rate limited"
                );
                return Ok(DispatchOutcome::RateLimited);
            }
        };

        let Some(mailer) = self.mailer.as_ref() else {
            return Err(AlertError::MailNotEnabled);
        };

        if self.recipients.is_empty() {
            info!(domain = %domain, "No recipients for domain");
            return Ok(DispatchOutcome::NoRecipients);
        }

        let template = self.templates.get().await?;
        let html = render_alert(&template, alert);

        let message = AlertMessage {
            from: self.from.clone(),
            to: self.recipients.clone(),
            subject: mail_subject(alert),
            text: template::to_plaintext(&html),
            html,
            attachment: MailAttachment {
                filename: REPORT_ATTACHMENT_NAME.to_string(),
                content_type: "application/json".to_string(),
                content: report.raw.clone(),
            },
        };

        let receipt = match mailer.send(&message).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(domain = %domain, error = %err, "Alert delivery failed");
                return Err(err);
            }
        };
        claim.commit();

        info!(
            domain = %domain,
            recipients = self.recipients.len(),
            receipt = %receipt,
            "Alert sent"
        );
        Ok(DispatchOutcome::Sent { receipt })
    }
}

/// Subject line of the alert email.
pub fn mail_subject(alert: &PolicyAlert) -> String {
    format!(
        "TLS report from {} has failure for {}",
        alert.identity.org_name.as_deref().unwrap_or_default(),
        alert.identity.domain.as_deref().unwrap_or_default()
    )
}

/// Fill the alert template for one policy.
pub fn render_alert(template: &str, alert: &PolicyAlert) -> String {
    let identity = &alert.identity;
    let org = identity.org_name.clone().unwrap_or_default();
    let domain = identity.domain.clone().unwrap_or_default();
    let start = alert.window.start_time;
    let end = alert.window.end_time;

    let failure_details = alert
        .failures
        .iter()
        .enumerate()
        .map(|(index, failure)| failure_fragment(index, failure))
        .collect::<Vec<_>>()
        .join("\r\n");

    let subject = format!("TLS report from {org} has error for {domain}");

    template::render(
        template,
        [
            ("orgName", org),
            ("contactInfo", identity.contact_info.clone().unwrap_or_default()),
            ("reportId", identity.report_id.clone().unwrap_or_default()),
            ("domain", domain),
            ("failureDetails", failure_details),
            ("date", start.map(format_date).unwrap_or_default()),
            ("start", start.map(format_time).unwrap_or_default()),
            ("end", end.map(format_time).unwrap_or_default()),
            ("subject", subject),
            ("successCount", count(alert.counts.success_count)),
            ("failureCount", count(alert.counts.fail_count)),
        ],
    )
}

/// HTML table describing a single failure.
fn failure_fragment(index: usize, failure: &FailureDetail) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    let extra_info = failure
        .additional_info_uri
        .as_deref()
        .map(|uri| format!(r#"<a href="{uri}">{uri}</a>"#))
        .unwrap_or_default();

    format!(
        "<table>\n\
         <tr><td><strong>Failure {index}</strong></td></tr>\n\
         <tr><td>Result type</td><td>{}</td></tr>\n\
         <tr><td>Sender server IP</td><td>{}</td></tr>\n\
         <tr><td>Receiver</td><td>{} ({})</td></tr>\n\
         <tr><td>No. Failed sessions</td><td>{}</td></tr>\n\
         <tr><td>Additional information</td><td>{extra_info}</td></tr>\n\
         <tr><td>Failure reason</td><td>{}</td></tr>\n\
         </table>",
        field(&failure.result_type),
        field(&failure.sending_mta_ip),
        field(&failure.receiving_mx_hostname),
        field(&failure.receiving_ip),
        count(failure.failed_session_count),
        field(&failure.failure_reason_code),
    )
}

/// `D/M/YYYY`, UTC, unpadded.
fn format_date(at: DateTime<Utc>) -> String {
    format!("{}/{}/{}", at.day(), at.month(), at.year())
}

/// `H:M`, UTC, unpadded.
fn format_time(at: DateTime<Utc>) -> String {
    format!("{}:{}", at.hour(), at.minute())
}

fn count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportIdentity, ReportWindow, SessionCounts};
    use chrono::TimeZone;

    fn alert() -> PolicyAlert {
        let start = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        PolicyAlert {
            identity: ReportIdentity {
                org_name: Some("Company-X".to_string()),
                report_id: Some("r-1".to_string()),
                contact_info: Some("tlsrpt@company-x.example".to_string()),
                domain: Some("company-y.example".to_string()),
            },
            window: ReportWindow {
                start_time: Some(start),
                end_time: Some(start),
            },
            counts: SessionCounts {
                success_count: Some(5326),
                fail_count: Some(303),
            },
            failures: vec![
                FailureDetail {
                    result_type: Some("certificate-expired".to_string()),
                    sending_mta_ip: Some("2001:db8::1".to_string()),
                    receiving_mx_hostname: Some("mx1.company-y.example".to_string()),
                    receiving_ip: Some("203.0.113.56".to_string()),
                    failed_session_count: Some(100),
                    additional_info_uri: None,
                    failure_reason_code: Some("X509_V_ERR_CERT_HAS_EXPIRED".to_string()),
                },
                FailureDetail {
                    result_type: Some("starttls-not-supported".to_string()),
                    additional_info_uri: Some("https://reports.company-x.example/info".to_string()),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_render_alert_fields() {
        let template = "{{subject}}|{{orgName}}|{{contactInfo}}|{{reportId}}|{{domain}}|\
                        {{date}}|{{start}}-{{end}}|{{successCount}}/{{failureCount}}";
        assert_eq!(
            render_alert(template, &alert()),
            "TLS report from Company-X has error for company-y.example|Company-X|\
             tlsrpt@company-x.example|r-1|company-y.example|7/3/2024|9:5-9:5|5326/303"
        );
    }

    #[test]
    fn test_failure_fragments_in_order() {
        let html = render_alert("{{failureDetails}}", &alert());

        let first = html.find("Failure 0").unwrap();
        let second = html.find("Failure 1").unwrap();
        assert!(first < second);
        assert!(html.contains("mx1.company-y.example (203.0.113.56)"));
        assert!(html.contains("X509_V_ERR_CERT_HAS_EXPIRED"));
        assert!(html.contains(
            r#"<a href="https://reports.company-x.example/info">https://reports.company-x.example/info</a>"#
        ));
        assert_eq!(html.matches("</table>\r\n<table>").count(), 1);
    }

    #[test]
    fn test_mail_subject() {
        assert_eq!(
            mail_subject(&alert()),
            "TLS report from Company-X has failure for company-y.example"
        );
    }

    #[test]
    fn test_missing_window_renders_blank() {
        let mut alert = alert();
        alert.window = ReportWindow::default();
        assert_eq!(render_alert("[{{date}}][{{start}}]", &alert), "[][]");
    }
}
