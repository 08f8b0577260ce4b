use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the hub should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:9955")]
    pub listen: SocketAddr,

    /// What to do when accepting a connection fails.
    #[arg(long, value_enum, default_value_t = AcceptPolicy::Exit)]
    pub on_accept_error: AcceptPolicy,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptPolicy {
    /// Report the error and stop the process, dropping every client.
    #[default]
    Exit,
    /// Log the error, back off, and keep accepting.
    Retry,
}
