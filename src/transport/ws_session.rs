use super::handshake::{admit, reject};
use super::session::{open, Outbound, RemoteInput, TermSize};
use crate::game::input::parse_key;
use crate::protocol::{decode_client_message, encode_server_frame, ClientMessage, Hello, ServerFrame};
use crate::room::registry::Registry;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn handle_socket(socket: WebSocket, registry: Arc<Registry>, remote_addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    let hello = match tokio::time::timeout(HELLO_TIMEOUT, next_hello(&mut receiver)).await {
        Ok(Some(hello)) => hello,
        Ok(None) => {
            tracing::debug!(%remote_addr, "connection closed before hello");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            tracing::debug!(%remote_addr, "hello timed out");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let (session, remote) = open(hello.into_session_info(remote_addr.to_string()));
    let output = session.output.clone();
    let input = remote.input;
    let send_task = tokio::spawn(write_outbound(sender, remote.outbound));

    let attached = match admit(&registry, session) {
        Ok(attached) => attached,
        Err(error) => {
            tracing::info!(%remote_addr, %error, "join rejected");
            reject(&output, &error);
            let _ = send_task.await;
            return;
        }
    };

    let mut run_task = tokio::spawn(attached.run());
    let mut finished = false;
    loop {
        tokio::select! {
            _ = &mut run_task => {
                finished = true;
                break;
            }
            incoming = receiver.next() => {
                let Some(Ok(message)) = incoming else { break };
                if !forward_client_message(&input, message) {
                    break;
                }
            }
        }
    }

    input.cancel();
    if !finished {
        let _ = run_task.await;
    }
    let _ = send_task.await;
}

async fn next_hello(receiver: &mut SplitStream<WebSocket>) -> Option<Hello> {
    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                return match decode_client_message(&text)? {
                    ClientMessage::Hello(hello) => Some(hello),
                    _ => None,
                };
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

/// Returns false once the client asked to close.
fn forward_client_message(input: &RemoteInput, message: Message) -> bool {
    match message {
        Message::Text(text) => match decode_client_message(&text) {
            Some(ClientMessage::Key { key }) => {
                if let Some(key) = parse_key(&key) {
                    input.press(key);
                }
            }
            Some(ClientMessage::Resize { cols, rows }) => input.resize(TermSize { cols, rows }),
            Some(ClientMessage::Hello(_)) | None => {}
        },
        Message::Close(_) => return false,
        _ => {}
    }
    true
}

async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        let frame = match item {
            Outbound::Text(text) => ServerFrame::Text { text },
            Outbound::Frame(frame) => frame,
            Outbound::Close => {
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        };
        let payload = match encode_server_frame(&frame) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(?error, "dropping unencodable frame");
                continue;
            }
        };
        if sender.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }
}
