//! Directory host for simulations.

use std::sync::Arc;

use cipherpost_proto::DEFAULT_MAX_FRAME_SIZE;
use cipherpost_server::{ConnectionLimits, Directory, DirectoryConfig, serve_connection};
use turmoil::net::TcpListener;

use crate::SimEnv;

/// Port the simulated directory listens on.
pub const DIRECTORY_PORT: u16 = 50051;

/// Host body: serve a fresh directory forever.
///
/// Intended for `sim.host("server", || run_directory(SimEnv::new()))`.
pub async fn run_directory(env: SimEnv) -> turmoil::Result {
    let directory = Arc::new(Directory::new(env, DirectoryConfig::default()));
    serve_directory(directory).await
}

/// Accept connections and answer them from `directory`.
///
/// Each connection runs on its own task with no idle limit. Connection
/// errors are logged and do not stop the host.
pub async fn serve_directory(directory: Arc<Directory<SimEnv>>) -> turmoil::Result {
    let listener = TcpListener::bind(("0.0.0.0", DIRECTORY_PORT)).await?;
    let limits = ConnectionLimits { max_frame_size: DEFAULT_MAX_FRAME_SIZE, idle_timeout: None };

    loop {
        let (stream, peer) = listener.accept().await?;
        let directory = Arc::clone(&directory);

        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, &directory, limits).await {
                tracing::debug!(%peer, "simulated connection error: {}", e);
            }
        });
    }
}
