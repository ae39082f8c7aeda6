//! Meeting page abstraction for driving the browser-rendered client.
//!
//! Everything the join machine and the roster watcher know about the page
//! goes through [`MeetingPage`]. The production implementation talks to a
//! WebDriver session; tests substitute scripted fakes.

use anyhow::Result;
use async_trait::async_trait;

pub mod webdriver;

pub use webdriver::WebDriverPage;

/// Stable participant identity, assigned by the roster on first sight and
/// written back onto the on-screen entry as a marker.
pub type ParticipantId = u64;

/// Point-in-time facts observable from the page.
///
/// A snapshot carries no history. Signals can co-occur or all be absent
/// while the DOM is mid-transition; classification deals with that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSnapshot {
    /// Text of an on-page error banner, if one is shown.
    pub error_message: Option<String>,
    /// The "meeting has been ended by host" modal is visible.
    pub ended_modal: bool,
    /// The in-meeting audio join control is rendered.
    pub joined_audio_control: bool,
    /// The "meeting has not started" prompt is visible.
    pub not_started_prompt: bool,
    /// The waiting-room "host will let you in" text is visible.
    pub waiting_room_text: bool,
}

/// One entry of the on-screen participants list as seen in a single poll.
///
/// The page gives entries no persistent identity of their own; `marker` is
/// only present if a previous poll of this session tagged this exact node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEntry {
    /// Marker written by an earlier [`MeetingPage::tag_entry`] call, if any.
    pub marker: Option<ParticipantId>,
    /// Display name as currently rendered.
    pub name: String,
    /// Opaque handle to the underlying node, owned by the collaborator.
    /// Valid until the next [`MeetingPage::participant_entries`] call.
    pub node_id: String,
}

impl ObservedEntry {
    /// An entry that has never been tagged.
    pub fn untagged(name: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            marker: None,
            name: name.into(),
            node_id: node_id.into(),
        }
    }

    /// An entry carrying a marker from a previous poll.
    pub fn tagged(marker: ParticipantId, name: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            marker: Some(marker),
            name: name.into(),
            node_id: node_id.into(),
        }
    }
}

/// Capability contract for the browser collaborator.
///
/// All waits are bounded inside the implementation; a hung page resolves to
/// an error instead of blocking the caller forever.
#[async_trait]
pub trait MeetingPage: Send + Sync {
    /// Navigate to the join page for `meeting_id` and clear any consent
    /// dialog blocking it.
    async fn load_join_page(&self, meeting_id: &str) -> Result<()>;

    /// Type the display name into the join form and submit it.
    async fn submit_display_name(&self, name: &str) -> Result<()>;

    /// Wait for the passcode prompt, type the passcode, and submit it.
    async fn submit_passcode(&self, passcode: &str) -> Result<()>;

    /// Read the current signal snapshot. Bounded-time; never blocks on
    /// elements that are absent.
    async fn signal_snapshot(&self) -> Result<SignalSnapshot>;

    /// Read the currently listed participant entries, in on-screen order.
    async fn participant_entries(&self) -> Result<Vec<ObservedEntry>>;

    /// Persist `marker` on the exact node behind `entry` so the next poll
    /// reports it as tagged.
    async fn tag_entry(&self, entry: &ObservedEntry, marker: ParticipantId) -> Result<()>;

    /// Tear down the browser session.
    async fn close(&self) -> Result<()>;
}
