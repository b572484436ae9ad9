//! `cyberchat chat`: one-shot or interactive querying over the relay.

use std::future::Future;
use std::io::Write;

use anyhow::{anyhow, Context, Result};
use cyberchat_core::config::ClientConfig;
use cyberchat_core::types::Role;
use cyberchat_transcript::{PluginChoice, Renderer, TranscriptError, TranscriptObserver};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{info, warn};

use crate::cli::ChatArgs;
use crate::client::GatewayClient;
use crate::terminal::TerminalView;

/// How a single turn ended.
enum Outcome {
    Answered,
    Failed(TranscriptError),
    Cancelled,
}

pub async fn run(client: &GatewayClient, config: &ClientConfig, args: ChatArgs) -> Result<()> {
    let choice = resolve_choice(client, &args).await?;
    let mut renderer = Renderer::new(config.idle_timeout_secs, config.finalize);
    let mut view = TerminalView::new(std::io::stdout());
    let mut saved = args.save.then(Conversation::default);

    if let Some(query) = args.query() {
        return match turn(client, &mut renderer, &choice, &query, &mut view).await {
            Outcome::Answered => {
                if let Some(conv) = saved.as_mut() {
                    conv.save_turn(client, &renderer, &query).await?;
                }
                Ok(())
            }
            Outcome::Failed(e) => Err(anyhow!(e)),
            Outcome::Cancelled => Ok(()),
        };
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        view.prompt();
        let Some(line) = read_query(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        if let Outcome::Answered = turn(client, &mut renderer, &choice, query, &mut view).await {
            if let Some(conv) = saved.as_mut() {
                if let Err(e) = conv.save_turn(client, &renderer, query).await {
                    warn!(error = %e, "failed to save turn");
                    eprintln!("could not save conversation: {e:#}");
                }
            }
        }
    }
    let _ = std::io::stdout().flush();
    Ok(())
}

/// Next line typed at the prompt, or `None` on end of input or interrupt.
///
/// Once `ctrl_c` has been awaited the default SIGINT exit is gone for the
/// whole process, so the prompt has to listen for it too.
async fn read_query<R, I>(lines: &mut Lines<R>, interrupt: I) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => line.context("reading stdin"),
        _ = interrupt => {
            info!("interrupted at the prompt");
            Ok(None)
        }
    }
}

/// Run one query to completion, or until Ctrl-C abandons it.
///
/// Abandoning drops the consuming future, which drops the stream session
/// with its partial reply and closes the connection to the gateway.
async fn turn<W: Write>(
    client: &GatewayClient,
    renderer: &mut Renderer,
    choice: &PluginChoice,
    query: &str,
    view: &mut TerminalView<W>,
) -> Outcome {
    let req = renderer.begin(query, choice, view);
    let result = tokio::select! {
        res = exchange(client, renderer, choice, &req, view) => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    match result {
        Some(Ok(())) => Outcome::Answered,
        Some(Err(e)) => {
            info!(error = %e, "query failed");
            Outcome::Failed(e)
        }
        None => {
            view.abandoned();
            Outcome::Cancelled
        }
    }
}

async fn exchange(
    client: &GatewayClient,
    renderer: &mut Renderer,
    choice: &PluginChoice,
    req: &cyberchat_core::types::QueryRequest,
    observer: &mut impl TranscriptObserver,
) -> Result<(), TranscriptError> {
    match client.open_stream(req).await {
        Ok(resp) => renderer.consume(resp.bytes_stream(), choice, observer).await,
        Err(e) => {
            renderer.fail(&e, observer);
            Err(e)
        }
    }
}

async fn resolve_choice(client: &GatewayClient, args: &ChatArgs) -> Result<PluginChoice> {
    if args.auto {
        return Ok(PluginChoice::Auto);
    }
    let Some(id) = args.plugin else {
        return Ok(PluginChoice::None);
    };
    let plugins = client.plugins().await.context("resolving plugin name")?;
    let plugin = plugins
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow!("no plugin with id {id}; see `cyberchat plugins`"))?;
    Ok(PluginChoice::Pinned {
        id,
        name: plugin.name,
    })
}

/// Conversation the REPL persists into, created on the first saved turn.
#[derive(Default)]
struct Conversation {
    id: Option<String>,
}

impl Conversation {
    async fn save_turn(&mut self, client: &GatewayClient, renderer: &Renderer, query: &str) -> Result<()> {
        let id = match &self.id {
            Some(id) => {
                client.add_message(id, Role::User, query, None).await?;
                id.clone()
            }
            None => {
                let id = client.create_conversation(&title_for(query), query).await?;
                self.id = Some(id.clone());
                id
            }
        };

        if let Some(reply) = renderer
            .transcript()
            .last()
            .filter(|m| m.role == Role::Assistant)
        {
            client
                .add_message(&id, Role::Assistant, &reply.content, reply.plugin_used.as_deref())
                .await?;
        }
        Ok(())
    }
}

/// First line of the query, cut to 50 characters.
fn title_for(query: &str) -> String {
    let first = query.lines().next().unwrap_or(query).trim();
    let mut title: String = first.chars().take(50).collect();
    if first.chars().count() > 50 {
        title.push('…');
    }
    title
}
