//! Client-side consumer of the relayed query stream.
//!
//! Bytes are framed into ndjson lines ([`framing`]), each line is classified
//! ([`record`]) and applied to the active [`StreamSession`], which appends
//! finished entries to a [`Transcript`]. [`Renderer`] drives the whole loop
//! over any byte stream.

pub mod error;
pub mod framing;
pub mod message;
pub mod record;
pub mod render;
pub mod session;

pub use error::{Result, TranscriptError};
pub use framing::LineFramer;
pub use message::{Transcript, TranscriptMessage};
pub use record::Record;
pub use render::{PluginChoice, Renderer, TranscriptObserver};
pub use session::StreamSession;
