//! Client configuration: remote endpoints and the session file location.
//!
//! Defaults point at the production Apps Script deployments; each can be
//! overridden through environment variables so tests and staging sheets
//! don't need code changes.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Production users-sheet script (auth + registration records).
const DEFAULT_USERS_API: &str =
    "https://script.google.com/macros/s/AKfycbzRgmdkTmJrEUzJXjhnuxyoVF9Vlts0g92wPtwSOK18KhEpyFlMlweH5DRhX2fR9q0-kQ/exec";

/// Production products-sheet script (catalog records).
const DEFAULT_PRODUCTS_API: &str =
    "https://script.google.com/macros/s/AKfycbwVhhpVvWoaMYP4Ecz8D_EqeRcrKlS_uberQeHTx1VJu2EzOvhgtT2I3e2A8vHXAhKY/exec";

/// File name for the persisted session record.
const SESSION_FILE_NAME: &str = "session.json";

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the users sheet script.
    pub users_api: String,
    /// Base URL of the products sheet script.
    pub products_api: String,
    /// Base URL of the cart sheet script, if one is deployed.
    pub cart_api: Option<String>,
    /// Path of the single-slot session file.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Built-in defaults with environment overrides applied:
    /// `PICH_USERS_API`, `PICH_PRODUCTS_API`, `PICH_CART_API`,
    /// `PICH_SESSION_FILE`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("PICH_USERS_API") {
            if !url.is_empty() {
                cfg.users_api = url;
            }
        }
        if let Ok(url) = std::env::var("PICH_PRODUCTS_API") {
            if !url.is_empty() {
                cfg.products_api = url;
            }
        }
        if let Ok(url) = std::env::var("PICH_CART_API") {
            if !url.is_empty() {
                cfg.cart_api = Some(url);
            }
        }
        if let Ok(path) = std::env::var("PICH_SESSION_FILE") {
            if !path.is_empty() {
                cfg.session_file = PathBuf::from(path);
            }
        }
        cfg
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            users_api: DEFAULT_USERS_API.to_string(),
            products_api: DEFAULT_PRODUCTS_API.to_string(),
            cart_api: None,
            session_file: default_session_file(),
        }
    }
}

/// Platform data directory for the session file, falling back to the
/// working directory when no home is resolvable (containers, CI).
fn default_session_file() -> PathBuf {
    match ProjectDirs::from("com", "PICH", "pich") {
        Some(dirs) => dirs.data_dir().join(SESSION_FILE_NAME),
        None => PathBuf::from(SESSION_FILE_NAME),
    }
}
