use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use slack_mcp_runtime::config::ConnectionArgs;
use slack_mcp_runtime::{McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "slack-mcp",
    version,
    about = "Slack MCP server: workspace tools over stdio"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slack_mcp=info,slack_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(McpCommands::Serve);
    let code = run_mcp(cli.connection, command).await;
    std::process::exit(code);
}
