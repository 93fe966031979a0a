/// OpenAPI documentation generation.
pub mod documentation;
/// CSV rendering of a room's match history.
pub mod export;
/// Health check service.
pub mod health_service;
/// Core room lifecycle and scoring commands.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Snapshot store connection supervisor.
pub mod storage_supervisor;
