use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::classroom_service,
    state::{SharedState, registry::ConnectionId},
};

/// Failure to hand a message to a connection's writer task.
#[derive(Debug, Error)]
pub enum SendError {
    /// Writer channel closed; the socket is gone or going away.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one classroom WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let connection_id: ConnectionId = Uuid::new_v4();
    let mut closing = state.open_connection(connection_id, outbound_tx.clone());
    info!(%connection_id, "client connected");

    loop {
        let message = tokio::select! {
            message = receiver.next() => message,
            _ = closing.changed() => {
                info!(%connection_id, "connection closed by server");
                break;
            }
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                debug!(%connection_id, payload = %text, "received client message");
                let result = match ClientMessage::from_json_str(&text) {
                    Ok(message) => {
                        classroom_service::handle_message(&state, connection_id, message).await
                    }
                    Err(err) => Err(err),
                };
                if let Err(err) = result {
                    reject(&outbound_tx, connection_id, &err);
                }
            }
            Some(Ok(Message::Binary(_))) => {
                let err = ServiceError::InvalidInput("binary frames are not supported".into());
                reject(&outbound_tx, connection_id, &err);
            }
            Some(Ok(Message::Ping(payload))) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                info!(%connection_id, "client closed the connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Some(Err(err)) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
            None => break,
        }
    }

    state.connections().remove(&connection_id);
    classroom_service::disconnect(&state, connection_id).await;
    info!(%connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Tell the sender its command was refused.
fn reject(tx: &mpsc::UnboundedSender<Message>, connection_id: ConnectionId, err: &ServiceError) {
    warn!(%connection_id, reason = err.reason_code(), error = %err, "command rejected");
    let _ = send_message_to_websocket(tx, &ServerMessage::rejected(err), "rejection");
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed since retrying cannot help.
/// Returns [`SendError::ConnectionClosed`] if the writer channel is closed.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
    context: &str,
) -> Result<(), SendError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, context, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SendError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
