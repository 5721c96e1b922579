//! Scenario replay for the Agorei feed.
//!
//! Reads JSONL scenario lines, applies them to an in-memory store and a
//! [`FeedSession`](agorei_feed::FeedSession), and produces one [`Frame`]
//! per line with the republished view.

pub mod driver;
pub mod scenario;
pub mod stream;

pub use driver::{Frame, Replay};
pub use scenario::{ScenarioEvent, parse_line};
pub use stream::{ScenarioLine, StreamConfig, start_stream};
