//! Semantic checks on a loaded configuration.

use secrecy::ExposeSecret;

use crate::schema::{AuthMode, CourierConfig};

/// Largest bare channel id the platform can address (`i64::MAX - 10^12`).
const MAX_CHANNEL_ID: i64 = i64::MAX - 1_000_000_000_000;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "telegram.target_channel_id"
    pub path: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check that the config is usable for the selected auth mode.
#[must_use]
pub fn validate(config: &CourierConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let tg = &config.telegram;

    if tg.target_channel_id == 0 {
        result.push(
            Severity::Error,
            "telegram.target_channel_id",
            "target channel id is required",
        );
    } else if !(1..=MAX_CHANNEL_ID).contains(&tg.target_channel_id) {
        result.push(
            Severity::Error,
            "telegram.target_channel_id",
            format!(
                "target channel id must be a bare channel id between 1 and {MAX_CHANNEL_ID}"
            ),
        );
    }

    match tg.auth_mode {
        AuthMode::Phone => {
            if tg.phone.trim().is_empty() {
                result.push(
                    Severity::Error,
                    "telegram.phone",
                    "phone number is required for phone authentication",
                );
            }
            if tg.api_id == 0 || tg.api_hash.expose_secret().is_empty() {
                result.push(
                    Severity::Error,
                    "telegram.api_id",
                    "api_id and api_hash are required for phone authentication",
                );
            }
        },
        AuthMode::Bot => {
            if tg.bot_token.expose_secret().is_empty() {
                result.push(
                    Severity::Error,
                    "telegram.bot_token",
                    "bot token is required for bot authentication",
                );
            }
        },
    }

    if tg.channel_handles().is_empty() {
        result.push(
            Severity::Warning,
            "telegram.channels",
            "no source channels configured; add them at runtime",
        );
    }

    result
}
