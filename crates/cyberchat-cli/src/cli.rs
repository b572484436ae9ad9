use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cyberchat")]
#[command(version, about = "Cyberchat - security assistant in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to $CYBERCHAT_CONFIG, then ~/.cyberchat/cyberchat.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Gateway URL, overriding `client.gateway_url`
    #[arg(long, global = true)]
    pub gateway: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question, or start an interactive session when none is given
    Chat(ChatArgs),

    /// List the plugins the backend offers
    Plugins,
}

#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Route the query through this plugin id
    #[arg(long, conflicts_with = "auto")]
    pub plugin: Option<i64>,

    /// Let the backend choose a plugin
    #[arg(long)]
    pub auto: bool,

    /// Persist each completed turn as a conversation
    #[arg(long)]
    pub save: bool,

    /// The question; omitted starts a REPL
    pub query: Vec<String>,
}

impl ChatArgs {
    pub fn query(&self) -> Option<String> {
        let q = self.query.join(" ");
        (!q.trim().is_empty()).then_some(q)
    }
}
