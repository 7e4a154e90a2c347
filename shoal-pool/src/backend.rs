//! Connector boundary for backend nodes.
//!
//! Implementors speak the backend wire protocol. The pool only needs
//! connect-with-auth, a liveness probe, session termination and socket
//! close; richer command surfaces live on the concrete connection type.

use async_trait::async_trait;
use shoal_core::Endpoint;
use thiserror::Error;

use crate::shard::ShardSpec;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from a backend connection.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not establish a connection.
    #[error("cannot connect to {endpoint}: {message}")]
    Connect {
        /// The endpoint dialed.
        endpoint: Endpoint,
        /// What went wrong.
        message: String,
    },

    /// The node rejected authentication or database selection.
    #[error("authentication failed on {endpoint}: {message}")]
    Auth {
        /// The endpoint dialed.
        endpoint: Endpoint,
        /// What went wrong.
        message: String,
    },

    /// An established connection failed mid-operation.
    #[error("connection to {endpoint} failed: {message}")]
    Io {
        /// The endpoint the connection was dialed to.
        endpoint: Endpoint,
        /// What went wrong.
        message: String,
    },
}

impl BackendError {
    /// Creates a [`BackendError::Connect`].
    pub fn connect(endpoint: &Endpoint, err: impl std::fmt::Display) -> Self {
        Self::Connect {
            endpoint: endpoint.clone(),
            message: err.to_string(),
        }
    }

    /// Creates a [`BackendError::Io`].
    pub fn io(endpoint: &Endpoint, err: impl std::fmt::Display) -> Self {
        Self::Io {
            endpoint: endpoint.clone(),
            message: err.to_string(),
        }
    }
}

/// Opens authenticated connections to backend primaries.
#[async_trait]
pub trait ShardConnector: Send + Sync {
    /// The connection type produced.
    type Conn: ShardConnection;

    /// Connects to the spec's endpoint, applying its timeouts, password
    /// and database index.
    async fn connect(&self, spec: &ShardSpec) -> BackendResult<Self::Conn>;
}

/// One live connection to a backend node.
#[async_trait]
pub trait ShardConnection: Send + 'static {
    /// Liveness probe; an error means the connection is unusable.
    async fn ping(&mut self) -> BackendResult<()>;

    /// Asks the node to terminate this session.
    async fn quit(&mut self) -> BackendResult<()>;

    /// Closes the underlying socket.
    async fn close(&mut self) -> BackendResult<()>;
}
