//! Client settings loaded via OrthoConfig.
//!
//! Values come from command-line flags, `BLOG_*` environment variables and
//! configuration files, in OrthoConfig's usual precedence.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::DEFAULT_MIN_PASSWORD_LENGTH;

const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for the blog client and its in-memory collaborator.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BLOG")]
pub struct ClientSettings {
    /// `tracing` filter directive, e.g. `blog_client=debug`.
    pub log_filter: Option<String>,
    /// Emit logs as JSON lines.
    #[ortho_config(default = false)]
    pub json_logs: bool,
    /// Minimum password length enforced on sign-up.
    pub min_password_length: Option<usize>,
    /// Withhold sessions from new accounts until their e-mail is confirmed.
    #[ortho_config(default = false)]
    pub require_email_confirmation: bool,
}

impl ClientSettings {
    /// Configured filter directive, falling back to `info`.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Configured minimum password length, falling back to the default.
    pub fn min_password_length(&self) -> usize {
        self.min_password_length.unwrap_or(DEFAULT_MIN_PASSWORD_LENGTH)
    }
}
