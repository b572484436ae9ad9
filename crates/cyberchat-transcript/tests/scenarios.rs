// End-to-end behaviour of the renderer over chunked byte streams.

use std::time::Duration;

use cyberchat_core::config::FinalizeMode;
use cyberchat_core::types::Role;
use cyberchat_transcript::{
    PluginChoice, Renderer, TranscriptError, TranscriptMessage, TranscriptObserver,
};
use futures_util::{stream, StreamExt};
use proptest::prelude::*;

type Chunk = Result<Vec<u8>, std::io::Error>;

fn chunks(parts: &[&str]) -> impl futures_util::Stream<Item = Chunk> {
    let owned: Vec<Chunk> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
    stream::iter(owned)
}

#[derive(Default)]
struct Recorder {
    buffers: Vec<String>,
    messages: Vec<TranscriptMessage>,
}

impl TranscriptObserver for Recorder {
    fn on_buffer(&mut self, buffer: &str) {
        self.buffers.push(buffer.to_string());
    }
    fn on_message(&mut self, message: &TranscriptMessage) {
        self.messages.push(message.clone());
    }
}

async fn run(parts: &[&str], choice: PluginChoice) -> (Renderer, Result<(), TranscriptError>) {
    let mut renderer = Renderer::new(5, FinalizeMode::Single);
    renderer.begin("question", &choice, &mut ());
    let res = renderer.consume(chunks(parts), &choice, &mut ()).await;
    (renderer, res)
}

fn contents(renderer: &Renderer) -> Vec<(Role, String)> {
    renderer
        .transcript()
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

#[tokio::test]
async fn text_deltas_become_one_assistant_reply() {
    let (r, res) = run(&["{\"text\":\"Hello\"}\n", "{\"text\":\" world\"}\n"], PluginChoice::None).await;
    res.unwrap();
    assert_eq!(
        contents(&r),
        vec![
            (Role::User, "question".to_string()),
            (Role::Assistant, "Hello world".to_string()),
        ]
    );
}

#[tokio::test]
async fn repeated_step_yields_one_system_message() {
    let line = "{\"step\":{\"id\":1,\"name\":\"scan\",\"role\":\"system\"},\"text\":\"Scanning...\"}\n";
    let (r, res) = run(&[line, line], PluginChoice::None).await;
    res.unwrap();
    let steps: Vec<_> = r
        .transcript()
        .messages()
        .iter()
        .filter(|m| m.step_info.is_some())
        .collect();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].role, Role::System);
    assert_eq!(steps[0].content, "Scanning...");
}

#[tokio::test]
async fn in_band_error_replaces_reply_with_failure() {
    let (r, res) = run(
        &["{\"text\":\"part\"}\n", "{\"error\":\"upstream timeout\"}\n", "{\"text\":\"ignored\"}\n"],
        PluginChoice::None,
    )
    .await;
    assert_eq!(res, Err(TranscriptError::Upstream("upstream timeout".into())));

    let msgs = r.transcript().messages();
    assert_eq!(msgs.len(), 2, "user query + failure notice only");
    assert!(msgs[1].content.contains("upstream timeout"));
    assert!(!msgs[1].content.contains("part"));
    assert!(msgs.iter().all(|m| m.plugin_used.is_none()));
}

#[tokio::test]
async fn auto_selected_plugin_is_announced_before_reply() {
    let (r, res) = run(
        &["{\"plugin_used\":\"nmap-scanner\"}\n", "{\"text\":\"Done\"}\n"],
        PluginChoice::Auto,
    )
    .await;
    res.unwrap();
    let msgs = r.transcript().messages();
    assert_eq!(msgs.len(), 3);
    assert_eq!(msgs[1].role, Role::System);
    assert!(msgs[1].content.contains("nmap-scanner"));
    assert_eq!(msgs[2].role, Role::Assistant);
    assert_eq!(msgs[2].content, "Done");
    assert_eq!(msgs[2].plugin_used.as_deref(), Some("nmap-scanner"));
}

#[tokio::test]
async fn pinned_plugin_name_lands_on_reply() {
    let choice = PluginChoice::Pinned {
        id: 2,
        name: "IPinfo".into(),
    };
    let (r, res) = run(&["{\"text\":\"Your IP is 1.2.3.4\"}\n"], choice).await;
    res.unwrap();
    assert_eq!(r.transcript().last().unwrap().plugin_used.as_deref(), Some("IPinfo"));
}

#[tokio::test]
async fn record_split_across_chunks_is_not_lost() {
    let (r, res) = run(&["{\"te", "xt\":\"Hel", "lo\"}\n{\"text\":\"!\"}"], PluginChoice::None).await;
    res.unwrap();
    assert_eq!(r.transcript().last().unwrap().content, "Hello!");
}

#[tokio::test]
async fn malformed_line_does_not_end_session() {
    let (r, res) = run(&["{\"text\":\"a\"}\n{broken\n", "{\"text\":\"b\"}\n"], PluginChoice::None).await;
    res.unwrap();
    assert_eq!(r.transcript().last().unwrap().content, "a{brokenb");
}

#[tokio::test]
async fn transport_error_is_a_failure_not_an_empty_answer() {
    let parts: Vec<Chunk> = vec![
        Ok(b"{\"text\":\"partial\"}\n".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset")),
    ];
    let mut r = Renderer::new(5, FinalizeMode::Single);
    let res = r.consume(stream::iter(parts), &PluginChoice::None, &mut ()).await;
    match res {
        Err(TranscriptError::Transport(msg)) => assert!(msg.contains("connection reset")),
        other => panic!("expected transport error, got {other:?}"),
    }
    let last = r.transcript().last().unwrap();
    assert!(last.content.starts_with("Sorry, there was an error processing your request"));
}

#[tokio::test]
async fn stalled_stream_hits_idle_timeout() {
    let stalled = stream::iter(vec![Ok::<Vec<u8>, std::io::Error>(b"{\"text\":\"x\"}\n".to_vec())])
        .chain(stream::pending());
    let mut r = Renderer::new(0, FinalizeMode::Single).with_idle_timeout(Duration::from_millis(50));
    let res = r.consume(stalled, &PluginChoice::None, &mut ()).await;
    assert_eq!(res, Err(TranscriptError::IdleTimeout { ms: 50 }));
    assert_eq!(r.transcript().len(), 1);
}

#[tokio::test]
async fn observer_sees_buffer_growth_and_every_message() {
    let mut rec = Recorder::default();
    let mut r = Renderer::new(5, FinalizeMode::Single);
    let choice = PluginChoice::None;
    r.begin("q", &choice, &mut rec);
    r.consume(
        chunks(&[
            "{\"text\":\"a\"}\n",
            "{\"step\":{\"id\":1,\"name\":\"scan\"},\"text\":\"Scanning\"}\n",
            "{\"text\":\"b\"}\n",
        ]),
        &choice,
        &mut rec,
    )
    .await
    .unwrap();

    assert_eq!(rec.buffers, vec!["a", "ab"]);
    let seen: Vec<&str> = rec.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(seen, vec!["q", "Scanning", "ab"]);
    assert_eq!(rec.messages.len(), r.transcript().len());
}

#[tokio::test]
async fn legacy_mode_keeps_duplicate_reply() {
    let mut r = Renderer::new(5, FinalizeMode::Legacy);
    r.consume(chunks(&["{\"text\":\"Hello world\"}\n"]), &PluginChoice::None, &mut ())
        .await
        .unwrap();
    let replies: Vec<_> = r
        .transcript()
        .messages()
        .iter()
        .filter(|m| m.content == "Hello world")
        .collect();
    assert_eq!(replies.len(), 2);
}

#[tokio::test]
async fn relay_rejection_is_rendered_as_failure() {
    let mut r = Renderer::new(5, FinalizeMode::Single);
    r.begin("q", &PluginChoice::None, &mut ());
    r.fail(
        &TranscriptError::Status {
            status: 503,
            message: "overloaded".into(),
        },
        &mut (),
    );
    let last = r.transcript().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.contains("overloaded"));
}

const SAMPLE: &str = concat!(
    "{\"plugin_used\":\"IPinfo\"}\n",
    "{\"text\":\"Checking\",\"reasoning\":\"needs lookup\",\"step\":{\"id\":1,\"name\":\"acknowledge\",\"role\":\"system\"}}\n",
    "{\"text\":\"Your IP \"}\n",
    "not json at all\n",
    "{\"text\":\"is caf\u{e9} \u{1f512}\"}\n",
    "{\"text\":\"Checking\",\"step\":{\"id\":1,\"name\":\"acknowledge\"}}\n",
    "{\"text\":\" done\"}",
);

fn render_split(cuts: &[usize]) -> Vec<(Role, String, Option<String>)> {
    let bytes = SAMPLE.as_bytes();
    let mut bounds: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    bounds.push(0);
    bounds.push(bytes.len());
    bounds.sort_unstable();
    bounds.dedup();
    let parts: Vec<Chunk> = bounds
        .windows(2)
        .map(|w| Ok(bytes[w[0]..w[1]].to_vec()))
        .collect();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let mut r = Renderer::new(5, FinalizeMode::Single);
    rt.block_on(r.consume(stream::iter(parts), &PluginChoice::Auto, &mut ()))
        .unwrap();
    r.transcript()
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone(), m.plugin_used.clone()))
        .collect()
}

#[test]
fn byte_at_a_time_matches_single_chunk() {
    let whole = render_split(&[]);
    let every: Vec<usize> = (0..=SAMPLE.len()).collect();
    assert_eq!(render_split(&every), whole);
    assert_eq!(whole.last().unwrap().1, "Your IP not json at allis caf\u{e9} \u{1f512} done");
}

proptest! {
    #[test]
    fn chunk_boundaries_do_not_change_the_transcript(
        cuts in proptest::collection::vec(any::<usize>(), 0..12)
    ) {
        prop_assert_eq!(render_split(&cuts), render_split(&[]));
    }
}
