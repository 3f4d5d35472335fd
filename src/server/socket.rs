//! Per-connection WebSocket task
//!
//! Each upgraded socket is split into a writer task that drains the
//! connection's outbound queue and a read loop that forwards parsed events
//! to the coordinator. Text frames carry JSON events; binary frames carry
//! media chunks (`stream-data`).

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit};

use crate::coordinator::Coordinator;
use crate::registry::{ConnectionHandle, ConnectionId, Outbound};
use crate::signaling::ClientEvent;

/// Drive one WebSocket until either side closes it
///
/// `_permit` is held for the lifetime of the connection when a connection
/// limit is configured.
pub async fn serve_socket(
    socket: WebSocket,
    coordinator: Coordinator,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let (handle, outbound) = ConnectionHandle::channel();

    let id = match coordinator.connect(handle).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting socket, coordinator unavailable");
            return;
        }
    };

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(id, sink, outbound));

    loop {
        tokio::select! {
            frame = stream.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => match ClientEvent::from_text(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::debug!(connection_id = %id, error = %e, "Unparseable message ignored");
                            continue;
                        }
                    },
                    Some(Ok(Message::Binary(data))) => ClientEvent::from_binary(data),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %id, error = %e, "Socket read error");
                        break;
                    }
                };

                if coordinator.dispatch(id, event).await.is_err() {
                    break;
                }
            }
            _ = &mut writer => break,
        }
    }

    if let Err(e) = coordinator.disconnect(id).await {
        tracing::debug!(connection_id = %id, error = %e, "Disconnect not delivered");
    }
    writer.abort();
}

async fn write_loop<S>(id: ConnectionId, mut sink: S, mut outbound: mpsc::UnboundedReceiver<Outbound>)
where
    S: futures_util::Sink<Message> + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Message(message) => {
                let text = match message.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(connection_id = %id, error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Outbound::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(connection_id = %id, "Writer finished");
}
