/// Viewer connection registry and fan-out engine.
pub mod broadcast;
/// Administrative contest control actions.
pub mod contest_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Wire event construction helpers.
pub mod events;
/// Jury grading and retry resolution.
pub mod grading_service;
/// Health check service.
pub mod health_service;
/// Storage connectivity supervisor.
pub mod storage_supervisor;
/// Participant submission intake and retry requests.
pub mod submission_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
