//! Shared application state: live sockets and the classroom they talk to.

/// Timestamp sources.
pub mod clock;
/// Poll lifecycle and the effects it produces.
pub mod coordinator;
/// Poll model and result tallies.
pub mod poll;
/// Connected participants.
pub mod registry;
/// Single-slot timer ownership.
pub mod timers;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    dto::ws::ServerMessage,
    services::websocket_service::send_message_to_websocket,
    state::{
        clock::{Clock, SystemClock},
        coordinator::PollCoordinator,
        registry::ConnectionId,
        timers::PollTimer,
    },
};

/// Cheaply clonable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Identity of the socket.
    pub id: ConnectionId,
    /// Queue drained by the socket's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
    closing: watch::Sender<bool>,
}

impl ClientConnection {
    /// Queue a close frame and tell the socket loop to stop reading.
    fn close(&self) {
        debug!(connection_id = %self.id, "closing connection");
        let _ = self.tx.send(Message::Close(None));
        self.closing.send_replace(true);
    }
}

/// Poll coordinator and the timer slot it drives, guarded together so every
/// event is handled to completion before the next one.
pub struct Classroom {
    pub coordinator: PollCoordinator,
    pub timer: PollTimer,
}

/// Central application state: live connections and the classroom.
pub struct AppState {
    config: AppConfig,
    connections: DashMap<ConnectionId, ClientConnection>,
    classroom: Mutex<Classroom>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit timestamp source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        Arc::new(Self {
            config,
            connections: DashMap::new(),
            classroom: Mutex::new(Classroom {
                coordinator: PollCoordinator::new(clock),
                timer: PollTimer::new(),
            }),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Classroom state; lock it for the whole handling of one event.
    pub fn classroom(&self) -> &Mutex<Classroom> {
        &self.classroom
    }

    /// Registry of open sockets keyed by connection identifier.
    pub fn connections(&self) -> &DashMap<ConnectionId, ClientConnection> {
        &self.connections
    }

    /// Track a freshly opened socket. The returned receiver flips to `true`
    /// when the server wants the connection closed.
    pub fn open_connection(
        &self,
        id: ConnectionId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> watch::Receiver<bool> {
        let (closing, closing_rx) = watch::channel(false);
        self.connections
            .insert(id, ClientConnection { id, tx, closing });
        closing_rx
    }

    /// Force the connection `id` closed after what is already queued for it.
    pub fn close_connection(&self, id: &ConnectionId) {
        match self.connections.get(id) {
            Some(connection) => connection.close(),
            None => warn!(connection_id = %id, "cannot close unknown connection"),
        }
    }

    /// Deliver `message` to every connection in `recipients`, skipping the ones
    /// that already went away.
    pub fn send_to(&self, recipients: &[ConnectionId], message: &ServerMessage) {
        for id in recipients {
            let Some(connection) = self.connections.get(id) else {
                continue;
            };
            if send_message_to_websocket(&connection.tx, message, "classroom update").is_err() {
                debug!(connection_id = %connection.id, "writer closed, message dropped");
            }
        }
    }
}
