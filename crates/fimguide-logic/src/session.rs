//! Signed-in user context and its persistence between CLI runs
//!
//! The session is an explicit value handed to the dashboard; nothing reads
//! identity from globals. It is saved as versioned JSON, written atomically.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::types::UserProfile;

/// Current session file format version
const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Format version for future migration
    pub version: u32,
    /// ISO 8601 timestamp when the session was created
    pub saved_at: String,
    /// Backend user id (`us_id`)
    pub user_id: String,
    pub email: Option<String>,
    /// Identity provider subject, when signed in with a token
    pub subject: Option<String>,
    /// Bearer token for the endpoints that require one
    pub access_token: Option<String>,
}

impl Session {
    /// Session for a plain user id, without identity provider
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            version: SESSION_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            user_id: user_id.into(),
            email: None,
            subject: None,
            access_token: None,
        }
    }

    /// Session resolved from an identity provider token
    pub fn from_profile(profile: UserProfile, subject: String, access_token: String) -> Self {
        Self {
            email: profile.email,
            subject: Some(subject),
            access_token: Some(access_token),
            ..Self::for_user(profile.user_id)
        }
    }

    pub fn bearer(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| anyhow!("This action needs a token login (fimguide login --token ...)"))
    }

    /// True when the stored token carries an `exp` claim in the past
    pub fn token_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.access_token
            .as_deref()
            .and_then(token_expiry)
            .is_some_and(|exp| exp <= now)
    }
}

fn jwt_claims(jwt: &str) -> Result<serde_json::Value> {
    let parts: Vec<&str> = jwt.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!(
            "Invalid JWT format: expected 3 parts separated by '.', got {}",
            parts.len()
        ));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow!("Failed to decode JWT payload: {}", e))?;

    serde_json::from_slice(&payload_bytes).map_err(|e| anyhow!("Failed to parse JWT claims: {}", e))
}

/// Extract the `sub` claim from an access token. The signature is not checked;
/// the backend verifies the token on every bearer request.
pub fn extract_subject(jwt: &str) -> Result<String> {
    jwt_claims(jwt)?
        .get("sub")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Missing 'sub' claim in JWT"))
}

/// `exp` claim in seconds since the epoch
pub fn token_expiry(jwt: &str) -> Option<u64> {
    jwt_claims(jwt).ok()?.get("exp")?.as_u64()
}

/// Whether the `aud` claim (string or list) names `audience`
pub fn token_has_audience(jwt: &str, audience: &str) -> bool {
    let Ok(claims) = jwt_claims(jwt) else {
        return false;
    };
    match claims.get("aud") {
        Some(serde_json::Value::String(aud)) => aud == audience,
        Some(serde_json::Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
        _ => false,
    }
}

/// Save the session atomically (write to .tmp, then rename). The file holds
/// a bearer token, so on unix it is only readable by its owner.
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    let tmp_path = path.with_extension("json.tmp");
    write_private(&tmp_path, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move session into {}", path.display()))?;
    info!("Session saved to {}", path.display());
    Ok(())
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // A leftover .tmp keeps its old mode; tighten it before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// Load the session. Returns None if the file doesn't exist or is corrupt.
pub fn load_session(path: &Path) -> Option<Session> {
    if !path.exists() {
        return None;
    }

    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            warn!("Failed to read session file {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<Session>(&data) {
        Ok(session) => {
            if session.version != SESSION_VERSION {
                warn!(
                    "Session file version {} != expected {}, ignoring",
                    session.version, SESSION_VERSION
                );
                return None;
            }
            Some(session)
        }
        Err(e) => {
            warn!("Failed to parse session file {}: {}", path.display(), e);
            None
        }
    }
}

/// Delete the session file on logout
pub fn delete_session(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to delete session file {}: {}", path.display(), e);
        } else {
            info!("Deleted session file {}", path.display());
        }
    }
}

/// Load a session or explain how to get one
pub fn require_session(path: &Path) -> Result<Session> {
    load_session(path).ok_or_else(|| {
        anyhow!(
            "Not signed in: no session at {} (run `fimguide login`)",
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{}.{}.c2ln", header, body)
    }

    #[test]
    fn test_extract_subject() {
        let jwt = token(serde_json::json!({ "sub": "google-oauth2|1234", "exp": 1 }));
        assert_eq!(extract_subject(&jwt).unwrap(), "google-oauth2|1234");
        assert_eq!(token_expiry(&jwt), Some(1));

        assert!(extract_subject("not-a-jwt").is_err());
        assert!(!token_has_audience(&jwt, "fimguide-api"));
        let no_sub = token(serde_json::json!({ "aud": "fimguide" }));
        assert!(extract_subject(&no_sub).is_err());
    }

    #[test]
    fn test_token_audience() {
        let single = token(serde_json::json!({ "sub": "a", "aud": "fimguide-api" }));
        assert!(token_has_audience(&single, "fimguide-api"));
        let many = token(serde_json::json!({ "sub": "a", "aud": ["other", "fimguide-api"] }));
        assert!(token_has_audience(&many, "fimguide-api"));
        assert!(!token_has_audience(&many, "nope"));
    }

    #[test]
    fn test_token_expiry_check() {
        let expired = token(serde_json::json!({ "sub": "a", "exp": 1 }));
        let session = Session::from_profile(
            UserProfile { user_id: "12".to_string(), email: None },
            "a".to_string(),
            expired,
        );
        assert!(session.token_expired());
        assert!(session.bearer().is_ok());

        let plain = Session::for_user("12");
        assert!(!plain.token_expired());
        assert!(plain.bearer().is_err());
    }

    #[test]
    fn test_save_and_load_session() {
        let dir = std::env::temp_dir().join("fimguide-test-session");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("session.json");

        let mut session = Session::for_user("42");
        session.email = Some("ana@example.com".to_string());
        save_session(&path, &session).unwrap();

        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded, session);
        assert!(require_session(&path).is_ok());

        delete_session(&path);
        assert!(!path.exists());
        assert!(load_session(&path).is_none());
        assert!(require_session(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join("fimguide-test-session-mode");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("session.json");

        let mut session = Session::for_user("42");
        session.access_token = Some("header.body.sig".to_string());
        save_session(&path, &session).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_rejects_other_version() {
        let dir = std::env::temp_dir().join("fimguide-test-session-version");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("session.json");

        let mut session = Session::for_user("42");
        session.version = SESSION_VERSION + 1;
        save_session(&path, &session).unwrap();
        assert!(load_session(&path).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
