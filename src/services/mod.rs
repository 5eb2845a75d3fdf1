/// Fan-out of match snapshots and notices to attached clients.
pub mod broadcast_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Startup of the controller and broadcast tasks.
pub mod hub;
/// Single writer of the match state.
pub mod match_controller;
/// Store health polling and degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
