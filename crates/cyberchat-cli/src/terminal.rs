//! Plain-text rendering of a transcript as it grows.

use std::io::Write;

use cyberchat_core::types::Role;
use cyberchat_transcript::{TranscriptMessage, TranscriptObserver};

/// Prints streamed text as it arrives and every finished message once.
///
/// The reply being streamed is echoed incrementally; when the final
/// assistant message lands with the same content it only closes the line
/// instead of printing the text a second time.
pub struct TerminalView<W: Write> {
    out: W,
    /// Buffer text already written to `out` this turn.
    echoed: String,
    line_open: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echoed: String::new(),
            line_open: false,
        }
    }

    pub fn prompt(&mut self) {
        let _ = write!(self.out, "> ");
        let _ = self.out.flush();
    }

    /// The user pressed Ctrl-C mid-stream; the partial reply is gone.
    pub fn abandoned(&mut self) {
        self.close_line();
        self.echoed.clear();
        let _ = writeln!(self.out, "[cancelled]");
        let _ = self.out.flush();
    }

    fn close_line(&mut self) {
        if self.line_open {
            let _ = writeln!(self.out);
            self.line_open = false;
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TranscriptObserver for TerminalView<W> {
    fn on_buffer(&mut self, buffer: &str) {
        match buffer.strip_prefix(self.echoed.as_str()) {
            Some(delta) => {
                let _ = write!(self.out, "{delta}");
            }
            None => {
                // buffer was replaced rather than extended
                self.close_line();
                let _ = write!(self.out, "{buffer}");
            }
        }
        self.echoed.clear();
        self.echoed.push_str(buffer);
        self.line_open = true;
        let _ = self.out.flush();
    }

    fn on_message(&mut self, message: &TranscriptMessage) {
        self.close_line();

        match message.role {
            // the user just typed it
            Role::User => self.echoed.clear(),
            Role::System => {
                let label = message
                    .step_info
                    .as_ref()
                    .map(|s| s.name.as_str())
                    .unwrap_or("system");
                let _ = writeln!(self.out, "[{label}] {}", message.content);
            }
            // a step mid-stream; the reply is still being echoed
            Role::Assistant if message.step_info.is_some() => {
                let _ = writeln!(self.out, "{}", message.content);
            }
            Role::Assistant => {
                let already_shown = !self.echoed.is_empty() && message.content == self.echoed;
                if !already_shown {
                    let _ = writeln!(self.out, "{}", message.content);
                }
                if let Some(plugin) = &message.plugin_used {
                    let _ = writeln!(self.out, "  (via {plugin})");
                }
                self.echoed.clear();
            }
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberchat_core::types::StepInfo;

    fn render(events: impl FnOnce(&mut TerminalView<Vec<u8>>)) -> String {
        let mut view = TerminalView::new(Vec::new());
        events(&mut view);
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn streamed_reply_is_not_printed_twice() {
        let out = render(|v| {
            v.on_buffer("Hello");
            v.on_buffer("Hello world");
            v.on_message(
                &TranscriptMessage::new(Role::Assistant, "Hello world")
                    .with_plugin(Some("IPinfo".into())),
            );
        });
        assert_eq!(out, "Hello world\n  (via IPinfo)\n");
    }

    #[test]
    fn step_messages_are_labelled() {
        let out = render(|v| {
            v.on_message(&TranscriptMessage::new(Role::User, "q"));
            v.on_message(
                &TranscriptMessage::new(Role::System, "Scanning...").with_step(StepInfo {
                    id: 1,
                    name: "scan".into(),
                    role: None,
                    reasoning: None,
                }),
            );
        });
        assert_eq!(out, "[scan] Scanning...\n");
    }

    #[test]
    fn failure_after_partial_stream_starts_a_new_line() {
        let out = render(|v| {
            v.on_buffer("par");
            v.on_message(&TranscriptMessage::new(
                Role::Assistant,
                "Sorry, there was an error processing your request: boom",
            ));
        });
        assert_eq!(
            out,
            "par\nSorry, there was an error processing your request: boom\n"
        );
    }

    #[test]
    fn notice_between_stream_and_reply_does_not_duplicate_it() {
        let out = render(|v| {
            v.on_buffer("Done");
            v.on_message(&TranscriptMessage::new(
                Role::System,
                "I've automatically selected the \"nmap-scanner\" plugin to help answer your query.",
            ));
            v.on_message(
                &TranscriptMessage::new(Role::Assistant, "Done").with_plugin(Some("nmap-scanner".into())),
            );
        });
        assert_eq!(
            out,
            "Done\n[system] I've automatically selected the \"nmap-scanner\" plugin to help answer your query.\n  (via nmap-scanner)\n"
        );
    }

    #[test]
    fn assistant_step_keeps_the_streamed_prefix() {
        let out = render(|v| {
            v.on_buffer("a");
            v.on_message(
                &TranscriptMessage::new(Role::Assistant, "Here").with_step(StepInfo {
                    id: 2,
                    name: "report".into(),
                    role: Some(Role::Assistant),
                    reasoning: None,
                }),
            );
            v.on_buffer("ab");
            v.on_message(&TranscriptMessage::new(Role::Assistant, "ab"));
        });
        assert_eq!(out, "a\nHere\nb\n");
    }

    #[test]
    fn cancel_closes_the_partial_line() {
        let out = render(|v| {
            v.on_buffer("half");
            v.abandoned();
        });
        assert_eq!(out, "half\n[cancelled]\n");
    }
}
