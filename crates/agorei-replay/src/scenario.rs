//! Scenario events.
//!
//! One JSON object per line, tagged by `event_type`:
//!
//! ```text
//! {"event_type":"sign_in","user_id":"uid-a","email":"a@example.com"}
//! {"event_type":"create_post","title":"Hi","category":"intro","description":"...","privacy":"private"}
//! {"event_type":"toggle","id":"<post id>"}
//! ```

use agorei_core::Privacy;
use serde::Deserialize;
use serde_json::Value;

/// A step of a replayed scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    SignIn {
        user_id: String,
        #[serde(default)]
        email: String,
    },

    SignOut,

    /// Write a post through the session as the signed-in viewer
    CreatePost {
        #[serde(default)]
        title: String,
        #[serde(default)]
        category: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        privacy: Privacy,
    },

    /// Write raw document fields directly into the store, as another client would
    PutPost { id: String, fields: Value },

    RemovePost { id: String },

    Toggle { id: String },

    HoldPushes,

    ReleasePushes,

    FailFeed {
        #[serde(default = "default_failure")]
        message: String,
    },

    Resubscribe,
}

fn default_failure() -> String {
    "store unavailable".to_string()
}

impl ScenarioEvent {
    /// The `event_type` tag
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioEvent::SignIn { .. } => "sign_in",
            ScenarioEvent::SignOut => "sign_out",
            ScenarioEvent::CreatePost { .. } => "create_post",
            ScenarioEvent::PutPost { .. } => "put_post",
            ScenarioEvent::RemovePost { .. } => "remove_post",
            ScenarioEvent::Toggle { .. } => "toggle",
            ScenarioEvent::HoldPushes => "hold_pushes",
            ScenarioEvent::ReleasePushes => "release_pushes",
            ScenarioEvent::FailFeed { .. } => "fail_feed",
            ScenarioEvent::Resubscribe => "resubscribe",
        }
    }
}

/// Parse one scenario line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<Result<ScenarioEvent, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(line))
}
