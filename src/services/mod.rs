/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Server-owned round timers.
pub mod round_timer;
/// Session code generation and normalization.
pub mod session_code;
/// Session lifecycle and gameplay operations.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events subscription service.
pub mod sse_service;
/// Session store connection supervisor.
pub mod storage_supervisor;
