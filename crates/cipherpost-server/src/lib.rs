//! Cipherpost directory and relay server.
//!
//! This crate provides the server side of Cipherpost using:
//! - A [`Directory`] holding identities, public keys and mailboxes
//! - Tokio TCP with length-prefixed CBOR frames
//! - System time for envelope timestamps and presence
//!
//! ## Architecture
//!
//! ```text
//! cipherpost-server
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ Server             (accept loop, one task per connection)
//!   └─ Directory          (identities + DirectoryKeyStore + mailboxes)
//! ```
//!
//! Each connection is a sequence of request/response exchanges: read one
//! [`Request`] frame, answer it from the directory, write one [`Response`]
//! frame. Domain failures travel inside the response; only I/O and framing
//! failures end a connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
mod error;
mod system_env;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use cipherpost_core::env::Environment;
use cipherpost_proto::{DEFAULT_MAX_FRAME_SIZE, Request, Response, frame};
pub use directory::{Directory, DirectoryConfig, DirectoryError, Identity};
pub use error::ServerError;
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:50051";

/// Default time a connection may wait for its next request.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:50051")
    pub bind_address: String,
    /// Directory configuration (presence tracking)
    pub directory: DirectoryConfig,
    /// Largest accepted frame body, in bytes
    pub max_frame_size: usize,
    /// Close a connection that sends nothing for this long (None = never)
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            directory: DirectoryConfig::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Production Cipherpost server.
///
/// Wraps a shared [`Directory`] with a TCP listener and system environment.
pub struct Server {
    listener: TcpListener,
    directory: Arc<Directory<SystemEnv>>,
    max_frame_size: usize,
    idle_timeout: Option<Duration>,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The frame size limit or the idle timeout is zero
    /// - Binding to the address fails
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.max_frame_size == 0 {
            return Err(ServerError::Config("max frame size must be non-zero".to_string()));
        }
        if config.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ServerError::Config("idle timeout must be non-zero".to_string()));
        }

        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Transport(format!("failed to bind {}: {e}", config.bind_address))
        })?;
        let directory = Arc::new(Directory::new(SystemEnv::new(), config.directory));

        Ok(Self {
            listener,
            directory,
            max_frame_size: config.max_frame_size,
            idle_timeout: config.idle_timeout,
        })
    }

    /// Handle to the directory served by this server.
    pub fn directory(&self) -> Arc<Directory<SystemEnv>> {
        Arc::clone(&self.directory)
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and answering requests.
    ///
    /// This method runs until the task is cancelled or the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let directory = Arc::clone(&self.directory);
                    let limits = ConnectionLimits {
                        max_frame_size: self.max_frame_size,
                        idle_timeout: self.idle_timeout,
                    };

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, directory, limits).await {
                            tracing::error!(%peer, "Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }
}

/// Per-connection limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    /// Largest accepted frame body, in bytes
    pub max_frame_size: usize,
    /// Close the connection when no request arrives for this long
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self { max_frame_size: DEFAULT_MAX_FRAME_SIZE, idle_timeout: Some(DEFAULT_IDLE_TIMEOUT) }
    }
}

/// Answer framed requests on `stream` until the peer hangs up or idles out.
///
/// Transport-agnostic: the TCP server and simulated networks share it. An
/// idle timeout closes the connection cleanly.
///
/// # Errors
///
/// Returns `ServerError` on I/O failure or an undecodable frame; the
/// connection is unusable afterwards.
pub async fn serve_connection<S, E>(
    stream: S,
    directory: &Directory<E>,
    limits: ConnectionLimits,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: Environment,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let max_frame_size = limits.max_frame_size;

    loop {
        let next = frame::read_frame::<_, Request>(&mut reader, max_frame_size);
        let request = match limits.idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, next).await {
                Ok(request) => request?,
                Err(_) => {
                    tracing::debug!(?idle, "closing idle connection");
                    return Ok(());
                },
            },
            None => next.await?,
        };
        let Some(request) = request else {
            return Ok(());
        };

        let name = request.name();
        let response: Response = directory.handle(request);
        tracing::debug!(request = name, "request handled");

        frame::write_frame(&mut writer, &response, max_frame_size).await?;
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    directory: Arc<Directory<SystemEnv>>,
    limits: ConnectionLimits,
) -> Result<(), ServerError> {
    tracing::debug!(%peer, "New connection");
    stream.set_nodelay(true)?;

    serve_connection(stream, &directory, limits).await?;

    tracing::debug!(%peer, "Connection closed");
    Ok(())
}
