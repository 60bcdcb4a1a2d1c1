//! Static file server for rendered artifacts.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

/// Configuration for the artifact server.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Root of the rendered artifact tree
    pub base_dir: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("api_docs"),
            host: "0.0.0.0".to_string(),
            port: 28888,
        }
    }
}

/// Errors that can occur with the server or watcher.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Failed to create output directory {0}: {1}")]
    OutputDirError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Serves the base output directory as a static tree.
#[derive(Debug)]
pub struct Publisher {
    listener: TcpListener,
    base_dir: PathBuf,
}

impl Publisher {
    /// Create the base directory if needed and bind the listener.
    ///
    /// Only the last path component is created; a missing parent is an error.
    pub async fn bind(config: &PublisherConfig) -> Result<Self, ServerError> {
        ensure_base_dir(&config.base_dir).map_err(|e| {
            ServerError::OutputDirError(config.base_dir.display().to_string(), e.to_string())
        })?;

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| {
                ServerError::BindError(format!("{}:{}", config.host, config.port), e.to_string())
            })?;

        Ok(Self {
            listener,
            base_dir: config.base_dir.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }

    /// Serve until the process ends.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        tracing::info!("Serving {} at http://{}", self.base_dir.display(), addr);

        let app = Router::new().fallback_service(ServeDir::new(&self.base_dir));

        axum::serve(self.listener, app)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

fn ensure_base_dir(dir: &Path) -> io::Result<()> {
    match std::fs::create_dir(dir) {
        Ok(()) => {
            tracing::info!("Created output directory {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}
