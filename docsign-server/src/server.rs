//! HTTP/1 server implementation

use crate::handlers::{handle_request, AppState};
use docsign_engine::DocSignServices;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

pub struct DocSignServer {
    state: Arc<AppState>,
}

impl DocSignServer {
    pub fn new(services: DocSignServices, max_upload_bytes: u64) -> Self {
        Self {
            state: Arc::new(AppState {
                services,
                max_upload_bytes,
            }),
        }
    }

    /// Accept connections until `shutdown` resolves, then flush storage
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        info!("docsign server listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    debug!("New connection from {}", remote_addr);

                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(err) = Self::handle_connection(stream, state).await {
                            error!("Connection error from {}: {}", remote_addr, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.state.services.engine.persist()?;
        info!("Storage flushed");
        Ok(())
    }

    async fn handle_connection(stream: TcpStream, state: Arc<AppState>) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let state = state.clone();
            async move { handle_request(req, state).await }
        });

        http1::Builder::new().serve_connection(io, service).await
    }
}
