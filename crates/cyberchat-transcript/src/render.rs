use std::fmt::Display;
use std::time::Duration;

use cyberchat_core::config::FinalizeMode;
use cyberchat_core::types::{QueryRequest, Role};
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{Result, TranscriptError};
use crate::message::{Transcript, TranscriptMessage};
use crate::session::StreamSession;

/// Receives rendering updates while a stream is consumed.
///
/// `on_buffer` is the transient view of the reply being streamed;
/// `on_message` fires once for every message appended to the transcript.
pub trait TranscriptObserver {
    fn on_buffer(&mut self, _buffer: &str) {}
    fn on_message(&mut self, _message: &TranscriptMessage) {}
}

/// Observer that ignores every update.
impl TranscriptObserver for () {}

/// Which plugin, if any, the caller wants the upstream to use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PluginChoice {
    #[default]
    None,
    /// Let the upstream decide; it announces its pick in-band.
    Auto,
    Pinned { id: i64, name: String },
}

impl PluginChoice {
    pub fn request(&self, query: &str) -> QueryRequest {
        QueryRequest {
            query: query.to_string(),
            plugin_id: match self {
                PluginChoice::Pinned { id, .. } => Some(*id),
                _ => None,
            },
            auto_select_plugin: matches!(self, PluginChoice::Auto),
        }
    }

    pub fn pinned_name(&self) -> Option<&str> {
        match self {
            PluginChoice::Pinned { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Drives stream sessions and owns the transcript they append to.
///
/// Exactly one session is live at a time: it exists only inside
/// [`Renderer::consume`], so a dropped or superseded query discards its
/// partial reply along with the future.
pub struct Renderer {
    transcript: Transcript,
    idle_timeout: Option<Duration>,
    mode: FinalizeMode,
}

impl Renderer {
    /// `idle_timeout_secs == 0` waits on the stream indefinitely.
    pub fn new(idle_timeout_secs: u64, mode: FinalizeMode) -> Self {
        Self {
            transcript: Transcript::new(),
            idle_timeout: (idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs)),
            mode,
        }
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Record the user's query and build the request body for it.
    pub fn begin(
        &mut self,
        query: &str,
        choice: &PluginChoice,
        observer: &mut impl TranscriptObserver,
    ) -> QueryRequest {
        self.append(TranscriptMessage::new(Role::User, query), observer);
        choice.request(query)
    }

    /// Record a failure that happened before any stream was available,
    /// e.g. the relay rejected the query.
    pub fn fail(&mut self, err: &TranscriptError, observer: &mut impl TranscriptObserver) {
        StreamSession::new().fail(&mut self.transcript, err);
        self.notify_since(self.transcript.len() - 1, observer);
    }

    /// Consume one relayed byte stream to completion.
    ///
    /// On success the session is finalized into the transcript. On an
    /// in-band error, a transport error or an idle timeout the partial reply
    /// is replaced by a failure notice and the error is returned.
    pub async fn consume<S, B, E>(
        &mut self,
        stream: S,
        choice: &PluginChoice,
        observer: &mut impl TranscriptObserver,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut session = StreamSession::new();
        let mut stream = std::pin::pin!(stream);
        let mut chunks = 0usize;

        let outcome = loop {
            let next = match self.idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        break Err(TranscriptError::IdleTimeout {
                            ms: idle.as_millis() as u64,
                        })
                    }
                },
                None => stream.next().await,
            };

            let chunk = match next {
                None => break Ok(()),
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => break Err(TranscriptError::Transport(e.to_string())),
            };
            chunks += 1;

            let before = self.transcript.len();
            let fed = session.feed(chunk.as_ref(), &mut self.transcript);
            self.notify_since(before, observer);
            match fed {
                Ok(true) => observer.on_buffer(session.buffer()),
                Ok(false) => {}
                Err(e) => break Err(e),
            }
        };

        let before = self.transcript.len();
        let outcome = outcome.and_then(|()| {
            if session.flush(&mut self.transcript)? {
                observer.on_buffer(session.buffer());
            }
            Ok(())
        });

        match outcome {
            Ok(()) => {
                debug!(
                    chunks,
                    steps = session.steps_materialized(),
                    reply_len = session.buffer().len(),
                    "stream finished"
                );
                session.finalize(&mut self.transcript, choice.pinned_name(), self.mode);
                self.notify_since(before, observer);
                Ok(())
            }
            Err(e) => {
                warn!(chunks, error = %e, "stream session failed");
                session.fail(&mut self.transcript, &e);
                self.notify_since(before, observer);
                Err(e)
            }
        }
    }

    fn append(&mut self, message: TranscriptMessage, observer: &mut impl TranscriptObserver) {
        self.transcript.push(message);
        self.notify_since(self.transcript.len() - 1, observer);
    }

    fn notify_since(&self, from: usize, observer: &mut impl TranscriptObserver) {
        for message in self.transcript.since(from) {
            observer.on_message(message);
        }
    }
}
