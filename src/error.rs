// ============================================================================
// ERRORS
// ============================================================================

use thiserror::Error;

/// Failures that stop the dashboard from starting
#[derive(Debug, Error)]
pub enum Error {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create drawing surface: {0}")]
    Surface(#[from] pixels::Error),
    #[error("failed to start poller thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
