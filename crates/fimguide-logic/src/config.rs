//! Dashboard configuration
//!
//! Assembled from two sources:
//! 1. `.env` / process env — which backend to talk to (`FIMGUIDE_ENV`,
//!    `FIMGUIDE_API_URL`, `AUTH_AUDIENCE`)
//! 2. `fimguide.toml` — client settings (timeouts, session file, reminder
//!    defaults). Optional: a missing file means defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::notification::MAX_INTERVAL_DAYS;

pub const PRODUCTION_API_URL: &str = "https://fimguide-backend.onrender.com";
pub const DEVELOPMENT_API_URL: &str = "http://localhost:3030";

// ============================================================================
// fimguide.toml
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DashboardToml {
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_session_file")]
    session_file: PathBuf,
    #[serde(default = "default_reminder_days")]
    default_reminder_days: u8,
    /// Overrides the env-selected backend, below `FIMGUIDE_API_URL`
    #[serde(default)]
    api_url: Option<String>,
}

impl Default for DashboardToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            session_file: default_session_file(),
            default_reminder_days: default_reminder_days(),
            api_url: None,
        }
    }
}

// ============================================================================
// DashboardConfig
// ============================================================================

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    // From env
    pub api_url: String,
    pub production: bool,
    pub auth_audience: Option<String>,

    // From fimguide.toml
    pub request_timeout_secs: u64,
    pub session_file: PathBuf,
    pub default_reminder_days: u8,
}

impl DashboardConfig {
    /// Load configuration from the process env + `fimguide.toml`
    pub fn load<P: AsRef<Path>>(toml_path: P) -> Result<Self> {
        Self::load_with(toml_path.as_ref(), |key| std::env::var(key).ok())
    }

    fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let toml_cfg = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using default settings", path.display());
                DashboardToml::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        Self::assemble(toml_cfg, env)
    }

    fn assemble(toml_cfg: DashboardToml, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let production = env("FIMGUIDE_ENV")
            .map(|v| v.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let api_url = env("FIMGUIDE_API_URL")
            .filter(|v| !v.trim().is_empty())
            .or(toml_cfg.api_url)
            .unwrap_or_else(|| {
                if production {
                    PRODUCTION_API_URL.to_string()
                } else {
                    DEVELOPMENT_API_URL.to_string()
                }
            });
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            bail!("Backend URL must start with http:// or https://, got '{}'", api_url);
        }

        if toml_cfg.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than 0");
        }
        if toml_cfg.default_reminder_days > MAX_INTERVAL_DAYS {
            bail!(
                "default_reminder_days must be between 0 and {}, got {}",
                MAX_INTERVAL_DAYS,
                toml_cfg.default_reminder_days
            );
        }

        Ok(DashboardConfig {
            api_url,
            production,
            auth_audience: env("AUTH_AUDIENCE").filter(|v| !v.trim().is_empty()),
            request_timeout_secs: toml_cfg.request_timeout_secs,
            session_file: toml_cfg.session_file,
            default_reminder_days: toml_cfg.default_reminder_days,
        })
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_session_file() -> PathBuf {
    PathBuf::from("fimguide-session.json")
}

fn default_reminder_days() -> u8 {
    7
}
