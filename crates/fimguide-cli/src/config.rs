//! Configuration for the terminal dashboard
//!
//! Uses `DashboardConfig` from `fimguide-logic`; the CLI only adds the
//! `--session` override for where the signed-in session is kept.

use anyhow::Result;
use std::path::{Path, PathBuf};

use fimguide_logic::config::DashboardConfig;

/// Load configuration from .env + fimguide.toml, applying `--session`
pub fn load<P: AsRef<Path>>(toml_path: P, session_override: Option<PathBuf>) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::load(toml_path)?;
    if let Some(path) = session_override {
        config.session_file = path;
    }
    Ok(config)
}
