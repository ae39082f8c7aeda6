//! WebDriver-backed [`MeetingPage`] for the Zoom web client.
//!
//! Thin I/O layer: every method maps to a handful of element queries
//! against the web client's DOM. All waits are bounded; queries for
//! possibly-absent elements use `find_all` and treat empty as absent.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::BrowserConfig;

use super::{MeetingPage, ObservedEntry, ParticipantId, SignalSnapshot};

/// DOM anchors of the Zoom web client.
mod selectors {
    pub const ERROR_BANNER: &str = "span.error-message";
    pub const ENDED_MODAL_TITLE: &str = "zm-modal-body-title";
    pub const JOIN_AUDIO_BUTTON: &str = "join-audio-container__btn";
    pub const NOT_STARTED_PROMPT: &str = "prompt";
    pub const WAITING_ROOM_TEXT: &str = "wr-default__text";
    pub const COOKIE_ACCEPT: &str = "onetrust-accept-btn-handler";
    pub const NAME_INPUT: &str = "inputname";
    pub const JOIN_BUTTON: &str = "joinBtn";
    pub const PASSCODE_INPUT: &str = "input#inputpasscode";
    pub const PARTICIPANTS_PANEL: &str = "show-participants";
    pub const PARTICIPANTS_TOGGLE: &str = r#"//*[@id="foot-bar"]/div[2]/div[1]/button"#;
    pub const PARTICIPANT_ENTRY: &str = "participants-li";
    pub const PARTICIPANT_NAME: &str = "participants-item__display-name";
}

/// Attribute written onto participant list nodes to recognize them across
/// polls. Owned by us; the client never touches it.
const MARKER_ATTR: &str = "data-rollcall-id";

/// Text fragments that disambiguate otherwise-generic containers.
const ENDED_MODAL_TEXT: &str = "ended by host";
const NOT_STARTED_TEXT: &str = "has not started";
const WAITING_ROOM_HINT: &str = "host will let";

const COOKIE_DIALOG_WAIT: Duration = Duration::from_secs(15);
const QUERY_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct WebDriverPage {
    driver: WebDriver,
    join_url_base: String,
    element_wait: Duration,
    passcode_wait: Duration,
    /// Node handles from the latest participants poll, keyed by the opaque
    /// id handed out in [`ObservedEntry::node_id`].
    nodes: Mutex<HashMap<String, WebElement>>,
}

impl WebDriverPage {
    /// Open a browser session against the configured WebDriver endpoint.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg(&format!("--lang={}", config.lang))?;
        if config.mute_audio {
            caps.add_arg("--mute-audio")?;
        }
        caps.add_arg("--start-maximized")?;
        if config.headless {
            caps.set_headless()?;
        }
        caps.add_experimental_option(
            "excludeSwitches",
            serde_json::json!(["enable-logging", "enable-automation"]),
        )?;
        caps.add_experimental_option("useAutomationExtension", serde_json::json!(false))?;

        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .with_context(|| {
                format!(
                    "Failed to open a browser session at {}",
                    config.webdriver_url
                )
            })?;

        info!("Browser session opened via {}", config.webdriver_url);

        Ok(Self {
            driver,
            join_url_base: config.join_url_base.trim_end_matches('/').to_string(),
            element_wait: Duration::from_secs(config.element_wait_seconds),
            passcode_wait: Duration::from_secs(config.passcode_wait_seconds),
            nodes: Mutex::new(HashMap::new()),
        })
    }

    async fn wait_for(&self, by: By, timeout: Duration) -> Result<WebElement> {
        self.driver
            .query(by)
            .wait(timeout, QUERY_POLL_INTERVAL)
            .first()
            .await
            .map_err(Into::into)
    }

    /// The participants panel collapses on narrow layouts; reopen it via
    /// the footer toggle if the list is not rendered.
    async fn ensure_participants_panel(&self) -> Result<()> {
        let panel = self
            .driver
            .find_all(By::ClassName(selectors::PARTICIPANTS_PANEL))
            .await?;
        if panel.is_empty() {
            let toggle = self
                .driver
                .find(By::XPath(selectors::PARTICIPANTS_TOGGLE))
                .await
                .context("Participants toggle not found in the meeting footer")?;
            // the footer button swallows native clicks while overlays animate
            self.driver
                .execute("arguments[0].click();", vec![toggle.to_json()?])
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MeetingPage for WebDriverPage {
    async fn load_join_page(&self, meeting_id: &str) -> Result<()> {
        let meeting_id = meeting_id.replace(' ', "");
        let url = format!("{}/{}", self.join_url_base, meeting_id);
        self.driver
            .goto(&url)
            .await
            .with_context(|| format!("Failed to open join page {url}"))?;

        // shown on first visit only
        match self
            .wait_for(By::Id(selectors::COOKIE_ACCEPT), COOKIE_DIALOG_WAIT)
            .await
        {
            Ok(button) => button.click().await?,
            Err(e) => debug!("No cookie consent dialog: {e:#}"),
        }

        Ok(())
    }

    async fn submit_display_name(&self, name: &str) -> Result<()> {
        let input = self
            .wait_for(By::Id(selectors::NAME_INPUT), self.element_wait)
            .await
            .context("Join form never showed the name field")?;
        input.send_keys(name).await?;
        self.driver
            .find(By::Id(selectors::JOIN_BUTTON))
            .await?
            .click()
            .await?;
        Ok(())
    }

    async fn submit_passcode(&self, passcode: &str) -> Result<()> {
        let input = self
            .wait_for(By::Css(selectors::PASSCODE_INPUT), self.passcode_wait)
            .await
            .context("Passcode prompt never appeared")?;
        input.send_keys(passcode).await?;
        self.driver
            .find(By::Id(selectors::JOIN_BUTTON))
            .await?
            .click()
            .await?;
        Ok(())
    }

    async fn signal_snapshot(&self) -> Result<SignalSnapshot> {
        let mut snapshot = SignalSnapshot::default();

        let banners = self
            .driver
            .find_all(By::Css(selectors::ERROR_BANNER))
            .await?;
        if let Some(banner) = banners.first() {
            snapshot.error_message = Some(banner.text().await?);
            return Ok(snapshot);
        }

        let modals = self
            .driver
            .find_all(By::ClassName(selectors::ENDED_MODAL_TITLE))
            .await?;
        if let Some(modal) = modals.first() {
            snapshot.ended_modal = modal
                .text()
                .await?
                .to_lowercase()
                .contains(ENDED_MODAL_TEXT);
        }

        snapshot.joined_audio_control = !self
            .driver
            .find_all(By::ClassName(selectors::JOIN_AUDIO_BUTTON))
            .await?
            .is_empty();

        let prompts = self
            .driver
            .find_all(By::Id(selectors::NOT_STARTED_PROMPT))
            .await?;
        if let Some(prompt) = prompts.first() {
            snapshot.not_started_prompt = prompt
                .text()
                .await?
                .to_lowercase()
                .contains(NOT_STARTED_TEXT);
        }

        let waiting = self
            .driver
            .find_all(By::ClassName(selectors::WAITING_ROOM_TEXT))
            .await?;
        if let Some(text) = waiting.first() {
            snapshot.waiting_room_text = text
                .text()
                .await?
                .to_lowercase()
                .contains(WAITING_ROOM_HINT);
        }

        Ok(snapshot)
    }

    async fn participant_entries(&self) -> Result<Vec<ObservedEntry>> {
        self.ensure_participants_panel().await?;

        let elements = self
            .driver
            .find_all(By::ClassName(selectors::PARTICIPANT_ENTRY))
            .await?;

        let mut nodes = self.nodes.lock().await;
        nodes.clear();

        let mut entries = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let marker = element
                .attr(MARKER_ATTR)
                .await?
                .map(|raw| {
                    raw.parse::<ParticipantId>().with_context(|| {
                        format!("Non-numeric {MARKER_ATTR} attribute: {raw:?}")
                    })
                })
                .transpose()?;

            let name = element
                .find(By::ClassName(selectors::PARTICIPANT_NAME))
                .await?
                .text()
                .await?;

            let node_id = format!("node-{index}");
            nodes.insert(node_id.clone(), element);
            entries.push(ObservedEntry {
                marker,
                name,
                node_id,
            });
        }

        Ok(entries)
    }

    async fn tag_entry(&self, entry: &ObservedEntry, marker: ParticipantId) -> Result<()> {
        let nodes = self.nodes.lock().await;
        let element = nodes
            .get(&entry.node_id)
            .with_context(|| format!("Stale participant node for {:?}", entry.name))?;
        self.driver
            .execute(
                &format!("arguments[0].setAttribute('{MARKER_ATTR}', arguments[1]);"),
                vec![element.to_json()?, serde_json::json!(marker)],
            )
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.driver
            .clone()
            .quit()
            .await
            .context("Failed to close the browser session")
    }
}
