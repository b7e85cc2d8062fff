use crate::protocol::{ServerPacket, UserInfo};
use crate::server::GameServer;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

type SocketSink = SplitSink<WebSocket, Message>;

/// Write one packet. Encoding failures skip the packet; transport failures
/// end the send loop.
async fn send_packet(sink: &mut SocketSink, packet: &ServerPacket) -> Result<(), axum::Error> {
    let frame = match packet.to_frame() {
        Ok(frame) => frame,
        Err(err) => {
            tracing::error!(packet = %packet.id(), error = %err, "Failed to encode packet");
            return Ok(());
        }
    };
    sink.send(Message::Text(frame.into())).await
}

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<GameServer>,
    addr: SocketAddr,
    user: UserInfo,
) {
    let (mut sink, mut stream) = socket.split();
    let capacity = server.config().server.outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerPacket>>(capacity);
    let connection_id = Uuid::new_v4();

    let session = match server.login(user, connection_id, tx).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(client_addr = %addr, error = %err, "Session registration failed");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };
    let user_id = session.id();
    tracing::info!(user_id, %connection_id, client_addr = %addr, "WebSocket connection established");

    let closed = session.closed_token();
    let send_closed = closed.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = send_closed.cancelled() => break,
                packet = rx.recv() => {
                    let Some(packet) = packet else {
                        break;
                    };
                    if let Err(err) = send_packet(&mut sink, &packet).await {
                        tracing::debug!(user_id, error = %err, "WebSocket send failed");
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    let max_message_size = server.config().server.max_message_size;
    let ping_period = Duration::from_secs(server.config().server.ping_interval_secs.max(1));
    let mut ping = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = closed.cancelled() => {
                tracing::debug!(user_id, "Session closed by server");
                break;
            }
            _ = ping.tick() => {
                server.send_ping(&session);
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > max_message_size {
                        server.metrics().increment_packets_dropped();
                        tracing::warn!(
                            user_id,
                            size = text.len(),
                            max = max_message_size,
                            "Message exceeds size limit"
                        );
                        continue;
                    }
                    server.dispatch(connection_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(user_id, error = %err, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    session.close();
    if let Err(err) = send_task.await {
        tracing::debug!(user_id, error = %err, "Send task ended abnormally");
    }
    server.disconnect(&session).await;
    tracing::info!(user_id, %connection_id, "WebSocket connection closed");
}
