//! [`CockpitServer`] – binds the router to a TCP listener.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::routes::{AppState, build_router};

/// Port the cockpit listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 6789;

pub struct CockpitServer {
    state: AppState,
    addr: SocketAddr,
}

impl CockpitServer {
    /// Server on `0.0.0.0:6789`.
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %listener.local_addr()?, "cockpit listening");
        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
    }
}
