//! Applies scenario events to an in-memory store, auth provider and feed session.

use std::sync::Arc;

use agorei_core::{
    AgoreiResult, AuthProvider, ManualClock, MemoryAuth, MemoryStore, NewPost, PostId, Viewer,
};
use agorei_feed::{FeedConfig, FeedSession, FeedView};
use serde::Serialize;
use tracing::{debug, warn};

use crate::scenario::ScenarioEvent;
use crate::stream::ScenarioLine;

/// Start of the replay clock, in seconds since the epoch
pub const CLOCK_START: i64 = 1_700_000_000;

/// What is printed after each scenario line
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub line: usize,
    pub event: &'static str,
    /// Toggle outcome, created post id, or error text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub view: FeedView,
}

pub struct Replay {
    store: Arc<MemoryStore>,
    auth: MemoryAuth,
    clock: ManualClock,
    session: FeedSession,
}

impl Replay {
    pub fn new(config: FeedConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let session = FeedSession::new(store.clone(), config);
        Self {
            store,
            auth: MemoryAuth::new(),
            clock: ManualClock::new(CLOCK_START),
            session,
        }
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    /// Apply one line and return the resulting frame
    ///
    /// Failures are reported in the frame and do not stop the replay.
    pub async fn apply(&mut self, line: ScenarioLine) -> Frame {
        let event = line.event.name();
        debug!(line = line.number, event, "applying scenario line");

        let outcome = match self.dispatch(line.event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(line = line.number, event, error = %e, "scenario step failed");
                Some(format!("error: {}", e))
            }
        };
        self.session.process_pending();

        Frame {
            line: line.number,
            event,
            outcome,
            view: self.session.view(),
        }
    }

    async fn dispatch(&mut self, event: ScenarioEvent) -> AgoreiResult<Option<String>> {
        let collection = self.session.config().collection.clone();
        match event {
            ScenarioEvent::SignIn { user_id, email } => {
                self.auth.sign_in(Viewer::new(user_id, email));
                self.session.set_viewer(self.auth.current())?;
            }
            ScenarioEvent::SignOut => {
                self.auth.sign_out();
                self.session.set_viewer(self.auth.current())?;
            }
            ScenarioEvent::CreatePost {
                title,
                category,
                description,
                privacy,
            } => {
                let draft = NewPost::new(title, category, description).with_privacy(privacy);
                let id = self.session.create_post(draft, &self.clock).await?;
                self.clock.advance(1);
                return Ok(Some(id.to_string()));
            }
            ScenarioEvent::PutPost { id, fields } => {
                self.store.put_document(&collection, &id, fields);
            }
            ScenarioEvent::RemovePost { id } => {
                let removed = self.store.remove_document(&collection, &id);
                return Ok(Some(if removed { "removed" } else { "missing" }.to_string()));
            }
            ScenarioEvent::Toggle { id } => {
                let outcome = self.session.toggle(&PostId::new(id));
                return Ok(Some(outcome.as_str().to_string()));
            }
            ScenarioEvent::HoldPushes => self.store.hold_pushes(),
            ScenarioEvent::ReleasePushes => self.store.release_pushes(),
            ScenarioEvent::FailFeed { message } => self.store.fail_listeners(&message),
            ScenarioEvent::Resubscribe => self.session.resubscribe()?,
        }
        Ok(None)
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }
}
