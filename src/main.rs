// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! TLSRPT Alerter Service
//!
//! Accepts SMTP TLS reports on `POST /v1/tls-rpt` (alias `/v1/tlsrpt`) and
//! emails an alert for every policy that reports failures, at most once per
//! cooldown period.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:3000)
//! - `MAX_BODY_BYTES`: Largest accepted submission (default: 10 MiB)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`: SMTP relay; mail is
//!   disabled unless host and username are set
//! - `SMTP_PORT`: Relay port (default: 587); 465, 8465 and 443 use implicit TLS
//! - `FROM_ADDRESS`: Alert sender (default: the SMTP username)
//! - `RECIPIENT`: Comma-separated alert recipients
//! - `EMAIL_COOLDOWN`: Seconds between alert emails (default: 0)
//! - `TEMPLATE_PATH`: Alert template (default: templates/alert-email.html)
//! - `METRICS_ENABLED`, `METRICS_PATH`: Prometheus endpoint (default: on, /metrics)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tlsrpt_alerter::{
    config::{parse_recipients, Config, MailConfig, MetricsConfig, TemplateConfig},
    handlers::{router, AppState},
    mailer::{MailSender, SmtpMailSender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        mail_enabled = config.mail.mail_enabled(),
        recipients = config.mail.recipients.len(),
        cooldown_secs = config.mail.cooldown_secs,
        template = %config.template.path.display(),
        "Starting TLSRPT alerter"
    );

    let mailer: Option<Arc<dyn MailSender>> = match SmtpMailSender::from_config(&config.mail)? {
        Some(sender) => Some(Arc::new(sender)),
        None => {
            warn!("SMTP_HOST or SMTP_USERNAME not set, alert emails are disabled");
            None
        }
    };

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::new(config, mailer)?);
    let app = router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let defaults = Config::default();
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
        mail: MailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok(),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            smtp_port: env_parse("SMTP_PORT").unwrap_or(defaults.mail.smtp_port),
            from_address: std::env::var("FROM_ADDRESS").ok(),
            recipients: std::env::var("RECIPIENT")
                .map(|raw| parse_recipients(&raw))
                .unwrap_or_default(),
            cooldown_secs: env_parse("EMAIL_COOLDOWN").unwrap_or(defaults.mail.cooldown_secs),
        },
        template: TemplateConfig {
            path: std::env::var("TEMPLATE_PATH")
                .map(Into::into)
                .unwrap_or(defaults.template.path),
        },
        metrics: MetricsConfig {
            enabled: env_parse("METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
            path: std::env::var("METRICS_PATH").unwrap_or(defaults.metrics.path),
        },
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
