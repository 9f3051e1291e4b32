//! umcp CLI: run the MCP tool server, or talk to one.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use umcp_client::{ClientOptions, McpHttpClient};
use umcp_config::{CliOverrides, UmcpConfig};
use umcp_server::{McpServer, ServerConfig};
use umcp_tools::{HttpUserService, InMemoryUserService, ToolRegistry, UserService, register_user_tools};
use umcp_types::{ContentBlock, ToolResult};

#[derive(Parser)]
#[command(name = "umcp", version, about = "MCP user-management tool server and client")]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server
    Serve {
        /// Address to listen on (overrides UMCP_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// Serve seeded in-memory users instead of the remote user service
        #[arg(long)]
        in_memory: bool,
    },

    /// List the tools a server exposes
    Tools {
        /// MCP endpoint URL (overrides UMCP_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Call one tool and print its output
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,

        /// MCP endpoint URL (overrides UMCP_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Command::Serve { .. }, false) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve { bind, in_memory } => {
            let config = load_config(CliOverrides {
                bind,
                ..Default::default()
            })?;
            serve(&config, in_memory).await
        }
        Command::Tools { endpoint } => {
            let config = load_config(CliOverrides {
                endpoint,
                ..Default::default()
            })?;
            list_tools(&config).await
        }
        Command::Call {
            name,
            arguments,
            endpoint,
        } => {
            let config = load_config(CliOverrides {
                endpoint,
                ..Default::default()
            })?;
            let arguments: serde_json::Value =
                serde_json::from_str(&arguments).context("Tool arguments must be valid JSON")?;
            call_tool(&config, &name, arguments).await
        }
    }
}

fn load_config(overrides: CliOverrides) -> Result<UmcpConfig> {
    UmcpConfig::load(overrides).map_err(|e| anyhow::anyhow!("{e}"))
}

async fn serve(config: &UmcpConfig, in_memory: bool) -> Result<()> {
    let service: Arc<dyn UserService> = if in_memory {
        tracing::info!("Using in-memory user service");
        Arc::new(InMemoryUserService::seeded())
    } else {
        tracing::info!(url = %config.user_service_url, "Using remote user service");
        Arc::new(
            HttpUserService::new(
                &config.user_service_url,
                config.user_service_api_key.as_deref(),
                umcp_tools::users::DEFAULT_TIMEOUT,
            )
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
    };

    let mut registry = ToolRegistry::new();
    register_user_tools(&mut registry, service).map_err(|e| anyhow::anyhow!("{e}"))?;
    let server = Arc::new(McpServer::new(ServerConfig::default(), registry));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down");
            }
            shutdown.cancel();
        }
    });

    umcp_server::serve(listener, server, shutdown.cancelled_owned())
        .await
        .context("Server error")
}

async fn connect(config: &UmcpConfig) -> Result<McpHttpClient> {
    let options = ClientOptions::new(&config.endpoint)
        .with_timeout(Duration::from_millis(config.timeout_ms));
    let mut client = McpHttpClient::new(options)?;
    client
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", config.endpoint))?;
    Ok(client)
}

async fn list_tools(config: &UmcpConfig) -> Result<()> {
    let mut client = connect(config).await?;
    let tools = client.list_tools().await?;
    for tool in &tools {
        println!("{}\n    {}", tool.name, tool.description);
    }
    eprintln!("{} tools", tools.len());
    close(&mut client).await;
    Ok(())
}

async fn call_tool(config: &UmcpConfig, name: &str, arguments: serde_json::Value) -> Result<()> {
    let mut client = connect(config).await?;
    let result = client.call_tool(name, arguments).await;
    close(&mut client).await;

    let result = result?;
    print_result(&result);
    if result.is_error {
        anyhow::bail!("Tool '{name}' reported an error");
    }
    Ok(())
}

async fn close(client: &mut McpHttpClient) {
    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "Failed to close session");
    }
}

fn print_result(result: &ToolResult) {
    for block in &result.content {
        match block {
            ContentBlock::Text { text } => println!("{text}"),
        }
    }
}
