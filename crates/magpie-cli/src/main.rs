mod session;

use std::env;

use anyhow::Result;
use clap::Parser;

use magpie::config::{RuntimeConfig, DEFAULT_API_URL, DEFAULT_ASSISTANT_ID};

#[derive(Parser)]
#[command(author, version, about = "Chat with a remotely hosted research agent", long_about = None)]
struct Cli {
    /// Base URL of the agent runtime (can also be set via LANGGRAPH_URL)
    #[arg(long)]
    url: Option<String>,

    /// Assistant or graph identifier (can also be set via LANGGRAPH_ASSISTANT_ID)
    #[arg(long)]
    assistant: Option<String>,

    /// API key for hosted deployments (can also be set via LANGGRAPH_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

impl Cli {
    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            api_url: self
                .url
                .clone()
                .or_else(|| env::var("LANGGRAPH_URL").ok())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            assistant_id: self
                .assistant
                .clone()
                .or_else(|| env::var("LANGGRAPH_ASSISTANT_ID").ok())
                .unwrap_or_else(|| DEFAULT_ASSISTANT_ID.to_string()),
            api_key: self
                .api_key
                .clone()
                .or_else(|| env::var("LANGGRAPH_API_KEY").ok()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.runtime_config();

    let mut session = session::Session::new(config)?;
    session.start().await
}
