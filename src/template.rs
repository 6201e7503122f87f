// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Alert email templating.
//!
//! The HTML template is read from disk on first use and kept for the life of
//! the process. Placeholders are literal `{{name}}` tokens.

use crate::error::TemplateError;
use regex::Regex;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Lazily loaded, process-lifetime template.
pub struct TemplateStore {
    path: PathBuf,
    template: OnceCell<Arc<str>>,
    loads: AtomicUsize,
}

impl TemplateStore {
    /// A store that reads `path` on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// A store whose template is already in memory.
    pub fn preloaded(template: impl Into<Arc<str>>) -> Self {
        Self {
            path: PathBuf::new(),
            template: OnceCell::new_with(Some(template.into())),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the template file has been read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Get the template, loading it if this is the first call.
    ///
    /// Concurrent first calls share a single read. A failed read is not
    /// cached; the next call tries again.
    pub async fn get(&self) -> Result<Arc<str>, TemplateError> {
        let template = self
            .template
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::Relaxed);
                let text = tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|source| TemplateError::Read {
                        path: self.path.clone(),
                        source,
                    })?;
                info!(path = %self.path.display(), bytes = text.len(), "Loaded alert template");
                Ok::<_, TemplateError>(Arc::from(text))
            })
            .await?;
        Ok(template.clone())
    }
}

/// Replace every `{{key}}` in `template` with its value.
///
/// Keys missing from the template are ignored and tokens with no matching
/// key are left as they are.
pub fn render<I, K, V>(template: &str, values: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let mut out = template.to_string();
    for (key, value) in values {
        let token = format!("{{{{{}}}}}", key.as_ref());
        if out.contains(&token) {
            out = out.replace(&token, &value.to_string());
        } else {
            debug!(key = key.as_ref(), "Template has no placeholder for key");
        }
    }
    out
}

/// Best-effort plaintext rendering of an HTML document.
///
/// Drops the `<head>` block, then every tag. A `>` inside an attribute value
/// ends the tag early.
pub fn to_plaintext(html: &str) -> String {
    let without_head = head_re().replace(html, "");
    tag_re().replace_all(&without_head, "").into_owned()
}

fn head_re() -> &'static Regex {
    static HEAD: OnceLock<Regex> = OnceLock::new();
    HEAD.get_or_init(|| Regex::new(r"(?s)<head>.*</head>").expect("valid head regex"))
}

fn tag_re() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}
