//! Crate-wide error types.
//!
//! Infrastructure failures (synchronization primitive construction, thread
//! spawn, socket bind/listen) are represented here and abort startup, per
//! the design's error handling model: anything that can't be recovered from
//! at a connection granularity is fatal to the process.

use std::io;

/// Errors that can abort server startup or bring the whole process down.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A synchronization primitive (mutex, semaphore) could not be
    /// constructed, or a mutex guard was poisoned by a panicking holder.
    #[error("failed to initialize synchronization primitive: {0}")]
    InitError(String),

    /// A worker or the reactor thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    /// The listening socket could not be bound or set to listen.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    /// The `mio` readiness multiplexer could not be constructed or polled.
    #[error("reactor failure: {0}")]
    Reactor(#[source] io::Error),

    /// Configuration could not be resolved from CLI flags or a config file.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
