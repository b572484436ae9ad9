use std::collections::HashSet;

use cyberchat_core::config::FinalizeMode;
use cyberchat_core::types::{ChunkEnvelope, Role, StepInfo};
use tracing::{debug, info, warn};

use crate::error::{Result, TranscriptError};
use crate::framing::LineFramer;
use crate::message::{Transcript, TranscriptMessage};
use crate::record::Record;

/// State of one outstanding query stream.
///
/// Owns the in-progress reply buffer, which is rendered transiently and only
/// becomes a [`TranscriptMessage`] when the session finishes. Dropping the
/// session (cancellation, a newer query) discards the buffer.
#[derive(Debug, Default)]
pub struct StreamSession {
    framer: LineFramer,
    buffer: String,
    seen_steps: HashSet<i64>,
    auto_plugin: Option<String>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reply text accumulated so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Plugin the upstream announced it picked, if any.
    pub fn auto_plugin(&self) -> Option<&str> {
        self.auto_plugin.as_deref()
    }

    /// Number of distinct step messages materialized this session.
    pub fn steps_materialized(&self) -> usize {
        self.seen_steps.len()
    }

    /// Feed one raw chunk. Returns whether the in-progress buffer changed.
    ///
    /// Stops at the first in-band error record; lines after it are not applied.
    pub fn feed(&mut self, chunk: &[u8], transcript: &mut Transcript) -> Result<bool> {
        let mut changed = false;
        for line in self.framer.push(chunk) {
            changed |= self.apply_line(&line, transcript)?;
        }
        Ok(changed)
    }

    /// Apply the unterminated fragment left at end-of-stream, if any.
    pub fn flush(&mut self, transcript: &mut Transcript) -> Result<bool> {
        match self.framer.finish() {
            Some(line) => self.apply_line(&line, transcript),
            None => Ok(false),
        }
    }

    /// Classify and apply a single ndjson line.
    pub fn apply_line(&mut self, line: &str, transcript: &mut Transcript) -> Result<bool> {
        match Record::parse(line) {
            Record::Envelope(env) => self.apply(env, transcript),
            Record::Raw(text) => {
                debug!(len = text.len(), "non-JSON stream line, appending as text");
                self.buffer.push_str(&text);
                Ok(true)
            }
        }
    }

    /// Apply a parsed record: error first, then plugin notice, then text.
    pub fn apply(&mut self, env: ChunkEnvelope, transcript: &mut Transcript) -> Result<bool> {
        if let Some(message) = env.error {
            warn!(%message, "upstream reported an error in-stream");
            return Err(TranscriptError::Upstream(message));
        }

        if let Some(plugin) = env.plugin_used {
            info!(%plugin, "upstream auto-selected a plugin");
            self.auto_plugin = Some(plugin);
        }

        let Some(text) = env.text else {
            return Ok(false);
        };

        match env.step {
            Some(step) => {
                self.materialize_step(step, text, env.reasoning, transcript);
                Ok(false)
            }
            None => {
                self.buffer.push_str(&text);
                Ok(true)
            }
        }
    }

    fn materialize_step(
        &mut self,
        mut step: StepInfo,
        text: String,
        outer_reasoning: Option<String>,
        transcript: &mut Transcript,
    ) {
        if !self.seen_steps.insert(step.id) {
            debug!(step_id = step.id, "duplicate step record ignored");
            return;
        }

        if step.reasoning.is_none() {
            step.reasoning = outer_reasoning;
        }
        let content = match step.reasoning.as_deref() {
            Some(reasoning) => with_reasoning(&text, reasoning),
            None => text,
        };
        let role = step.role.unwrap_or(Role::System);

        debug!(step_id = step.id, name = %step.name, "materializing step message");
        transcript.push(TranscriptMessage::new(role, content).with_step(step));
    }

    /// Fold a normally-ended session into the transcript.
    ///
    /// `pinned_plugin` is the caller's explicit plugin choice; an in-band
    /// auto-selection takes precedence over it.
    pub fn finalize(
        self,
        transcript: &mut Transcript,
        pinned_plugin: Option<&str>,
        mode: FinalizeMode,
    ) {
        if mode == FinalizeMode::Legacy
            && !self.buffer.trim().is_empty()
            && self.seen_steps.is_empty()
        {
            transcript.push(TranscriptMessage::new(Role::Assistant, self.buffer.clone()));
        }

        if let Some(ref plugin) = self.auto_plugin {
            transcript.push(TranscriptMessage::new(
                Role::System,
                format!(
                    "I've automatically selected the \"{}\" plugin to help answer your query.",
                    plugin
                ),
            ));
        }

        let plugin_used = self
            .auto_plugin
            .or_else(|| pinned_plugin.map(str::to_string));
        transcript.push(TranscriptMessage::new(Role::Assistant, self.buffer).with_plugin(plugin_used));
    }

    /// End the session abnormally: the partial reply is discarded and a
    /// failure notice takes its place.
    pub fn fail(self, transcript: &mut Transcript, err: &TranscriptError) {
        if !self.buffer.is_empty() {
            debug!(discarded = self.buffer.len(), "dropping partial reply after failure");
        }
        transcript.push(failure_message(err));
    }
}

/// The chat-style notice shown in place of a reply that could not be produced.
pub fn failure_message(err: &TranscriptError) -> TranscriptMessage {
    TranscriptMessage::new(
        Role::Assistant,
        format!("Sorry, there was an error processing your request: {}", err),
    )
}

fn with_reasoning(text: &str, reasoning: &str) -> String {
    format!(
        "{}\n\n<details>\n<summary>**Why this decision was made**</summary>\n\n{}\n</details>",
        text, reasoning
    )
}
