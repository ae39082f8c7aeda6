use crate::global;
use crate::meeting::{JoinOptions, PhaseTimeouts};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub meeting: MeetingConfig,
    pub browser: BrowserConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    /// Display name the bot joins with.
    pub display_name: String,
    /// Seconds between signal polls during the join flow.
    pub poll_interval_seconds: u64,
    /// Seconds between participants polls once joined.
    pub roster_poll_interval_seconds: u64,
    /// Budget for the first meaningful signal after the join handshake.
    pub unstarted_timeout_seconds: u64,
    /// Budget for the host to start the meeting.
    pub not_started_timeout_seconds: u64,
    /// Budget for being let in from the waiting room.
    pub waiting_room_timeout_seconds: u64,
    /// Stop attendance tracking on a reconciliation contract violation
    /// instead of discarding the affected poll.
    pub halt_on_roster_violation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    /// Join URL prefix; the meeting id is appended.
    pub join_url_base: String,
    pub headless: bool,
    pub mute_audio: bool,
    /// Browser UI language; the signal texts are matched in English.
    pub lang: String,
    /// Bounded wait for join-form elements.
    pub element_wait_seconds: u64,
    /// Bounded wait for the passcode prompt to appear.
    pub passcode_wait_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the local status API while a session runs.
    pub enabled: bool,
    pub port: u16,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            display_name: "RollcallBot".to_string(),
            poll_interval_seconds: 5,
            roster_poll_interval_seconds: 5,
            unstarted_timeout_seconds: 180,
            not_started_timeout_seconds: 1800,
            waiting_room_timeout_seconds: 1800,
            halt_on_roster_violation: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            join_url_base: "https://zoom.us/wc/join".to_string(),
            headless: false,
            mute_audio: true,
            lang: "en".to_string(),
            element_wait_seconds: 10,
            passcode_wait_seconds: 180,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7655,
        }
    }
}

impl MeetingConfig {
    /// Translate the file-level knobs into machine options.
    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            display_name: self.display_name.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            roster_poll_interval: Duration::from_secs(self.roster_poll_interval_seconds),
            phase_timeouts: PhaseTimeouts {
                unstarted: Duration::from_secs(self.unstarted_timeout_seconds),
                not_started: Duration::from_secs(self.not_started_timeout_seconds),
                waiting_room: Duration::from_secs(self.waiting_room_timeout_seconds),
            },
            halt_on_violation: self.halt_on_roster_violation,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
