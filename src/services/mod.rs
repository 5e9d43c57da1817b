//! Service layer sitting between the routes and the classroom state.

/// Classroom command handling and poll timers.
pub mod classroom_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only views of the classroom.
pub mod public_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
