//! The coordinator: sole owner of the membership table and client counter.
//!
//! Every membership change and every broadcast goes through [`Hub::run`],
//! which selects over three queues (new connections, inbound lines, dead
//! connections) and handles one event at a time. Reader and write tasks only
//! ever talk to the hub through those queues, so the table needs no lock.

use std::net::SocketAddr;

use anyhow::{Result, anyhow};
use tokio::{
    io::{AsyncRead, AsyncWrite, BufReader, WriteHalf},
    select,
    sync::mpsc,
};
use tracing::{debug, info};

use crate::{
    frame::{self, ClientId, Frame, InboundMessage},
    membership::{ClientCounter, Member, MembershipTable, SharedWriter},
    reader,
};

// Inbound lines wait here when the hub falls behind; readers block once it is full.
const MESSAGE_QUEUE_DEPTH: usize = 128;

/// A freshly accepted connection on its way to the hub.
pub struct Incoming<S> {
    pub stream: S,
    pub peer: Option<SocketAddr>,
}

/// Sending side of the hub's new-connection queue.
///
/// The queue is unbounded: handing over a connection never waits on the hub.
pub struct ConnectionSender<S> {
    tx: mpsc::UnboundedSender<Incoming<S>>,
}

impl<S> ConnectionSender<S> {
    pub fn submit(&self, stream: S, peer: Option<SocketAddr>) -> Result<()> {
        self.tx
            .send(Incoming { stream, peer })
            .map_err(|_| anyhow!("hub is no longer running"))
    }
}

pub struct Hub<S> {
    members: MembershipTable<WriteHalf<S>>,
    counter: ClientCounter,
    connections_rx: mpsc::UnboundedReceiver<Incoming<S>>,
    messages_tx: mpsc::Sender<InboundMessage>,
    messages_rx: mpsc::Receiver<InboundMessage>,
    deaths_tx: mpsc::UnboundedSender<ClientId>,
    deaths_rx: mpsc::UnboundedReceiver<ClientId>,
}

impl<S> Hub<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new() -> (Self, ConnectionSender<S>) {
        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::channel(MESSAGE_QUEUE_DEPTH);
        let (deaths_tx, deaths_rx) = mpsc::unbounded_channel();

        let hub = Self {
            members: MembershipTable::new(),
            counter: ClientCounter::new(),
            connections_rx,
            messages_tx,
            messages_rx,
            deaths_tx,
            deaths_rx,
        };
        (hub, ConnectionSender { tx: connections_tx })
    }

    /// Runs the control loop forever.
    ///
    /// The hub holds its own message and death senders, so those queues never
    /// close; once every [`ConnectionSender`] is gone the hub keeps serving
    /// the members it already has.
    pub async fn run(mut self) {
        loop {
            select! {
                Some(incoming) = self.connections_rx.recv() => self.on_new_connection(incoming),
                Some(message) = self.messages_rx.recv() => self.on_message(message),
                Some(id) = self.deaths_rx.recv() => self.on_death(id),
            }
        }
    }

    fn on_new_connection(&mut self, incoming: Incoming<S>) {
        let Incoming { stream, peer } = incoming;
        let id = self.counter.next_id();
        let (read_half, write_half) = tokio::io::split(stream);

        let reader = tokio::spawn(reader::run(
            id,
            BufReader::new(read_half),
            self.messages_tx.clone(),
            self.deaths_tx.clone(),
        ));
        self.members.insert(id, Member::new(write_half, reader, peer));

        info!(client_id = id, ?peer, members = self.members.len(), "accepted new client");
    }

    fn on_message(&mut self, message: InboundMessage) {
        let frame = message.to_frame();
        let recipients = self.members.recipients();
        let count = recipients.len();

        for (id, writer) in recipients {
            spawn_write(id, writer, frame.clone(), self.deaths_tx.clone());
        }

        debug!(
            sender = message.sender,
            line = %String::from_utf8_lossy(&message.line).trim_end(),
            "new message"
        );
        info!(sender = message.sender, recipients = count, "broadcast message");
    }

    fn on_death(&mut self, id: ClientId) {
        match self.members.remove(id) {
            Some(member) => info!(
                client_id = id,
                peer = ?member.peer(),
                members = self.members.len(),
                "client disconnected"
            ),
            None => debug!(client_id = id, "ignoring death of unknown client"),
        }
    }
}

/// Delivers one frame to one member; a failed write turns into a death event.
fn spawn_write<W>(
    id: ClientId,
    writer: SharedWriter<W>,
    frame: Frame,
    deaths: mpsc::UnboundedSender<ClientId>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut writer = writer.lock().await;
        if let Err(err) = frame::write_frame(&mut *writer, &frame).await {
            debug!(client_id = id, error = ?err, "failed to deliver frame");
            let _ = deaths.send(id);
        }
    });
}
