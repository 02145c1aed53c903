//! SSE chat-completion proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 CHAT PROXY                   │
//!                        │                                              │
//!   Client POST          │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│  http   │──▶│ transform │──▶│ upstream │──┼──▶ Chat
//!                        │  │ handler │   │  payload  │   │  client  │  │    completions
//!                        │  └─────────┘   └───────────┘   └────┬─────┘  │    service
//!                        │                                     │        │
//!   SSE response         │  ┌─────────┐   ┌───────────┐        │        │
//!   ◀────────────────────┼──│  sink   │◀──│ sse relay │◀───────┘        │
//!                        │  └─────────┘   └───────────┘                 │
//!                        │                                              │
//!                        │  config · diagnostics · lifecycle · logging  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sse_chat_proxy::config::{load_config, LoadedConfig};
use sse_chat_proxy::lifecycle::startup;
use sse_chat_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "sse-chat-proxy", version, about = "Streaming chat-completion proxy")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen port (overrides config file and PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let LoadedConfig {
        mut config,
        warnings,
    } = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("sse-chat-proxy: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability);
    for warning in &warnings {
        tracing::warn!(
            key = warning.key,
            value = %warning.value,
            reason = %warning.reason,
            "Ignoring environment value"
        );
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address(),
        upstream = %config.upstream.endpoint,
        api_version = %config.upstream.api_version,
        default_credential = config.upstream.api_key.is_some(),
        "sse-chat-proxy starting"
    );

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped with an error");
            ExitCode::FAILURE
        }
    }
}
