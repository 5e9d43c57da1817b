//! HTTP and WebSocket route trees.

use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Banner and health check.
pub mod health;
/// Read-only classroom views.
pub mod polls;
/// Classroom WebSocket upgrade.
pub mod websocket;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(polls::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
