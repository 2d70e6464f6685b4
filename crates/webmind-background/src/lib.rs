//! Background service for Webmind.
//!
//! Hosts the lifecycle manager for every UI surface: surfaces send
//! [`Request`]s and listen for [`Event`]s, both as `type`-tagged JSON.

mod protocol;
mod relay;
mod service;

pub use protocol::{parse_request, Event, ProtocolError, Request, Response};
pub use relay::{EventRelay, EVENT_CHANNEL_CAPACITY};
pub use service::BackgroundService;
