//! Logging seam for API traffic.
//!
//! `ApiClient` reports every outgoing request and every failed operation to
//! an `ApiLogger`. Production code uses `TracingLogger`; tests inject a
//! `MemoryLogger` and assert on the captured events.

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::client::Operation;
use crate::error::ApiError;
use crate::http::HttpMethod;

pub trait ApiLogger: Send + Sync {
    /// Called once per outgoing request, before it is sent. `path` is the
    /// API path including its query string, e.g. `/api/diagnosis?search=flu`.
    fn request(&self, method: HttpMethod, path: &str);

    /// Called once per failed operation, before the error reaches the caller.
    fn failure(&self, operation: Operation, error: &ApiError);
}

/// Forwards API events to `tracing`. Request events carry the method and
/// the path with its query string; failure events carry the backend payload
/// or the transport error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ApiLogger for TracingLogger {
    fn request(&self, method: HttpMethod, path: &str) {
        tracing::info!(%method, path, "[API] {method} {path}");
    }

    fn failure(&self, operation: Operation, error: &ApiError) {
        match error {
            ApiError::Backend { status, .. } => tracing::error!(
                %operation,
                status,
                payload = %error.log_detail(),
                "[API Error] Error {}",
                operation.activity()
            ),
            _ => tracing::error!(
                %operation,
                error = %error.log_detail(),
                "[API Error] Error {}",
                operation.activity()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Request { method: HttpMethod, path: String },
    Failure { operation: Operation, detail: String },
}

/// Captures events in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LogEvent::Request { method, path } => Some((method, path)),
                LogEvent::Failure { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(Operation, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LogEvent::Failure { operation, detail } => Some((operation, detail)),
                LogEvent::Request { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: LogEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

impl ApiLogger for MemoryLogger {
    fn request(&self, method: HttpMethod, path: &str) {
        self.push(LogEvent::Request {
            method,
            path: path.to_string(),
        });
    }

    fn failure(&self, operation: Operation, error: &ApiError) {
        self.push(LogEvent::Failure {
            operation,
            detail: error.log_detail(),
        });
    }
}

/// Install a global `fmt` subscriber honouring `RUST_LOG` (default `info`).
/// Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
