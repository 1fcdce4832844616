use std::path::PathBuf;

/// Default user agent for launched browsers. A realistic, slightly
/// future-dated agent keeps the target UI from flagging the session as
/// automated.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/138.0.7204.157 Safari/537.36";

/// How the Chromium driver reaches a browser.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Remote DevTools endpoint (`http://host:9222` or a `ws://` debugger
    /// url). When unset, a local Chromium is launched instead.
    pub endpoint: Option<String>,
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            // Headed by default: manual sign-in happens in this window.
            headless: false,
            user_data_dir: None,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            window_width: 1920,
            window_height: 1080,
        }
    }
}
