use std::{future::Future, io, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    time::sleep,
};
use tracing::{error, warn};

use crate::{
    cli::AcceptPolicy,
    hub::{ConnectionSender, Hub},
};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Source of inbound connections for the accept loop.
pub trait Acceptor {
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Stream, Option<SocketAddr>)>> + Send;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Stream, Option<SocketAddr>)>> + Send {
        async move {
            let (stream, peer) = TcpListener::accept(self).await?;
            Ok((stream, Some(peer)))
        }
    }
}

/// Accepts TCP clients and feeds them to a [`Hub`] running on its own task.
pub struct Server {
    listener: TcpListener,
    policy: AcceptPolicy,
}

impl Server {
    pub fn new(listener: TcpListener, policy: AcceptPolicy) -> Self {
        Self { listener, policy }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until the accept loop gives up, which only happens under
    /// [`AcceptPolicy::Exit`].
    pub async fn run(self) -> Result<()> {
        let Server {
            mut listener,
            policy,
        } = self;
        let (hub, connections) = Hub::new();
        tokio::spawn(hub.run());

        accept_loop(&mut listener, &connections, policy).await
    }
}

async fn accept_loop<A>(
    acceptor: &mut A,
    connections: &ConnectionSender<A::Stream>,
    policy: AcceptPolicy,
) -> Result<()>
where
    A: Acceptor,
{
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        match acceptor.accept().await {
            Ok((stream, peer)) => {
                delay = INITIAL_RETRY_DELAY;
                connections.submit(stream, peer)?;
            }
            Err(err) => match policy {
                AcceptPolicy::Exit => {
                    error!(error = ?err, "failed to accept connection");
                    return Err(err).context("failed to accept connection");
                }
                AcceptPolicy::Retry => {
                    warn!(error = ?err, ?delay, "failed to accept connection, retrying");
                    sleep(delay).await;
                    delay = next_retry_delay(delay);
                }
            },
        }
    }
}

fn next_retry_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_RETRY_DELAY)
}
