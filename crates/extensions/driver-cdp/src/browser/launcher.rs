//! Chrome discovery and launch.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::cdp::{CdpClient, CdpError};

use super::CdpBrowserConfig;

const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(200);
const STARTUP_POLL_ATTEMPTS: u32 = 30;

/// Well-known Chrome/Chromium install locations for this platform.
#[cfg(target_os = "macos")]
const CANDIDATE_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "linux")]
const CANDIDATE_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(target_os = "windows")]
const CANDIDATE_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const CANDIDATE_PATHS: &[&str] = &[];

/// Chrome executable: the configured path if it exists, else the first
/// installed well-known location.
pub fn find_chrome(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.clone());
    }
    CANDIDATE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Command-line flags for a debuggable Chrome.
pub(super) fn chrome_args(config: &CdpBrowserConfig) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", config.debug_port),
        format!("--user-data-dir={}", config.profile_dir().display()),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args
}

pub(super) async fn is_chrome_running(endpoint: &str) -> bool {
    CdpClient::version(endpoint).await.is_ok()
}

/// Launch Chrome and wait until its debug endpoint answers.
pub(super) async fn launch_chrome(config: &CdpBrowserConfig) -> Result<Child, CdpError> {
    let chrome_path = find_chrome(config.chrome_path.as_ref()).ok_or(CdpError::ChromeNotFound)?;
    let profile_dir = config.profile_dir();
    if let Err(e) = std::fs::create_dir_all(&profile_dir) {
        warn!("Failed to create profile directory: {}", e);
    }

    info!("Launching Chrome with profile at: {}", profile_dir.display());

    let mut child = Command::new(&chrome_path)
        .args(chrome_args(config))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CdpError::LaunchFailed(e.to_string()))?;

    info!("Chrome launched with PID: {:?}", child.id());

    let endpoint = config.endpoint();
    for _ in 0..STARTUP_POLL_ATTEMPTS {
        tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
        if is_chrome_running(&endpoint).await {
            return Ok(child);
        }
    }

    let _ = child.kill().await;
    Err(CdpError::LaunchFailed(
        "Chrome failed to start within timeout".to_string(),
    ))
}
