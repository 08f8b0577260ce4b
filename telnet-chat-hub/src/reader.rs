use tokio::{io::AsyncBufRead, sync::mpsc};
use tracing::debug;

use crate::frame::{self, ClientId, InboundMessage};

/// Reads lines from one client until the first read failure.
///
/// Every complete line goes to the hub tagged with `id`. Any failure (EOF,
/// reset, a fragment without terminator) ends the loop without retrying, and
/// exactly one death event is emitted afterwards.
pub async fn run<R>(
    id: ClientId,
    mut reader: R,
    messages: mpsc::Sender<InboundMessage>,
    deaths: mpsc::UnboundedSender<ClientId>,
) where
    R: AsyncBufRead + Unpin,
{
    loop {
        match frame::read_line(&mut reader).await {
            Ok(line) => {
                if messages.send(InboundMessage::new(id, line)).await.is_err() {
                    debug!(client_id = id, "hub stopped accepting messages");
                    break;
                }
            }
            Err(err) => {
                debug!(client_id = id, error = ?err, "client read failed");
                break;
            }
        }
    }

    let _ = deaths.send(id);
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncWriteExt, BufReader},
        sync::mpsc,
    };

    use super::*;

    #[tokio::test]
    async fn forwards_lines_then_reports_death_once() {
        let (mut client, server) = tokio::io::duplex(256);
        let (messages_tx, mut messages_rx) = mpsc::channel(8);
        let (deaths_tx, mut deaths_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(5, BufReader::new(server), messages_tx, deaths_tx));

        client.write_all(b"hello\nworld\n").await.expect("write");
        drop(client);
        task.await.expect("reader task");

        assert_eq!(
            messages_rx.recv().await,
            Some(InboundMessage::new(5, b"hello\n".to_vec()))
        );
        assert_eq!(
            messages_rx.recv().await,
            Some(InboundMessage::new(5, b"world\n".to_vec()))
        );
        assert_eq!(messages_rx.recv().await, None);

        assert_eq!(deaths_rx.recv().await, Some(5));
        assert_eq!(deaths_rx.recv().await, None);
    }

    #[tokio::test]
    async fn trailing_fragment_is_dropped() {
        let (mut client, server) = tokio::io::duplex(256);
        let (messages_tx, mut messages_rx) = mpsc::channel(8);
        let (deaths_tx, mut deaths_rx) = mpsc::unbounded_channel();

        client.write_all(b"complete\npartial").await.expect("write");
        drop(client);
        run(9, BufReader::new(server), messages_tx, deaths_tx).await;

        assert_eq!(
            messages_rx.recv().await,
            Some(InboundMessage::new(9, b"complete\n".to_vec()))
        );
        assert_eq!(messages_rx.recv().await, None);
        assert_eq!(deaths_rx.recv().await, Some(9));
    }

    #[tokio::test]
    async fn stops_when_hub_is_gone() {
        let (mut client, server) = tokio::io::duplex(256);
        let (messages_tx, messages_rx) = mpsc::channel(8);
        let (deaths_tx, mut deaths_rx) = mpsc::unbounded_channel();
        drop(messages_rx);

        client.write_all(b"anyone there?\n").await.expect("write");
        run(2, BufReader::new(server), messages_tx, deaths_tx).await;

        assert_eq!(deaths_rx.recv().await, Some(2));
    }
}
