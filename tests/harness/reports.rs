// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report fixtures.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// A report with one failing policy carrying two failure details.
pub fn failing_report() -> String {
    r#"{
  "organization-name": "Company-X",
  "date-range": {
    "start-datetime": "2024-03-07T09:05:00Z",
    "end-datetime": "2024-03-07T23:59:59Z"
  },
  "contact-info": "sts-reporting@company-x.example",
  "report-id": "5065427c-23d3-47ca-b6e0-946ea0e8c4be",
  "policies": [{
    "policy": {
      "policy-type": "sts",
      "policy-domain": "company-y.example"
    },
    "summary": {
      "total-successful-session-count": 5326,
      "total-failure-session-count": 303
    },
    "failure-details": [{
      "result-type": "certificate-expired",
      "sending-mta-ip": "2001:db8:abcd:0012::1",
      "receiving-mx-hostname": "mx1.mail.company-y.example",
      "receiving-ip": "203.0.113.55",
      "failed-session-count": 100,
      "failure-reason-code": "X509_V_ERR_CERT_HAS_EXPIRED"
    }, {
      "result-type": "starttls-not-supported",
      "sending-mta-ip": "2001:db8:abcd:0013::1",
      "receiving-mx-hostname": "mx2.mail.company-y.example",
      "receiving-ip": "203.0.113.56",
      "failed-session-count": 203,
      "additional-info-uri": "https://reports.company-x.example/report_info?id=5065427c#StarttlsNotSupported",
      "failure-reason-code": "STARTTLS_NOT_OFFERED"
    }]
  }]
}"#
    .to_string()
}

/// A report whose only policy had no failures.
pub fn clean_report() -> String {
    r#"{
  "organization-name": "Company-X",
  "date-range": {"start-datetime": "2024-03-07T00:00:00Z", "end-datetime": "2024-03-07T23:59:59Z"},
  "contact-info": "sts-reporting@company-x.example",
  "report-id": "clean-1",
  "policies": [{
    "policy": {"policy-type": "sts", "policy-domain": "company-y.example"},
    "summary": {"total-successful-session-count": 5326, "total-failure-session-count": 0},
    "failure-details": []
  }, {
    "policy": {"policy-type": "no-policy-found", "policy-domain": "company-z.example"},
    "summary": {"total-successful-session-count": 12, "total-failure-session-count": 0}
  }]
}"#
    .to_string()
}

/// A report with two failing policies.
pub fn two_failing_policies() -> String {
    r#"{
  "organization-name": "Company-X",
  "date-range": {"start-datetime": "2024-03-07T00:00:00Z", "end-datetime": "2024-03-07T23:59:59Z"},
  "contact-info": "sts-reporting@company-x.example",
  "report-id": "multi-1",
  "policies": [{
    "policy": {"policy-type": "sts", "policy-domain": "company-y.example"},
    "summary": {"total-successful-session-count": 10, "total-failure-session-count": 1},
    "failure-details": [{"result-type": "validation-failure", "failed-session-count": 1}]
  }, {
    "policy": {"policy-type": "tlsa", "policy-domain": "company-z.example"},
    "summary": {"total-successful-session-count": 10, "total-failure-session-count": 2},
    "failure-details": [{"result-type": "dane-required", "failed-session-count": 2}]
  }]
}"#
    .to_string()
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}
