use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use telnet_chat_hub::{cli::Cli, server::Server};

const WELCOME_BANNER: &str = "\
+-----------------------------------------------+
| Welcome to use telnet-chat-hub!               |
| If you have problems with this tool,          |
| please submit issues to telnet-chat-hub.      |
+-----------------------------------------------+";

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    let server = Server::new(listener, cli.on_accept_error);
    let addr = server.local_addr()?;

    println!("{WELCOME_BANNER}");
    println!("[INIT]Server init Ok! listening on {addr}");
    info!(policy = ?cli.on_accept_error, "hub listening on {}", addr);

    if let Err(err) = server.run().await {
        error!("hub exited with error: {err:?}");
        return Err(err);
    }

    Ok(())
}
