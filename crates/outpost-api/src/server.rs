//! TLS accept loop of the control channel.
//!
//! ```text
//! accept ─► spawn per connection:
//!             TLS handshake        (bounded by read_timeout)
//!             HTTP/1 serve         (header read bounded by read_timeout)
//!             no request in flight and no bytes for idle_timeout
//!                                  ─► graceful shutdown, then drop
//! ```
//! Accept and handshake errors are logged; the loop never stops.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, HttpBody},
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use tokio::{
    net::{TcpListener, TcpStream},
    time::timeout,
};
use tokio_rustls::TlsAcceptor;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::{
    config::ControlConfig,
    error::ApiError,
    io::{Activity, ActivityIo},
    tls::load_server_config,
};

pub struct ControlServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    read_timeout: Duration,
    idle_timeout: Duration,
}

impl ControlServer {
    /// Loads TLS material and binds the listener. Either failure is fatal for the caller.
    pub async fn bind(cfg: &ControlConfig, app: Router) -> Result<Self, ApiError> {
        let tls = load_server_config(&cfg.tls_cert, &cfg.tls_key)?;
        let listener = TcpListener::bind(cfg.listen_addr)
            .await
            .map_err(|source| ApiError::Bind {
                addr: cfg.listen_addr,
                source,
            })?;

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
            app,
            read_timeout: cfg.read_timeout,
            idle_timeout: cfg.idle_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections forever.
    pub async fn serve(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "control channel listening");
        }
        let conn = Arc::new(ConnConfig {
            acceptor: self.acceptor,
            app: self.app,
            read_timeout: self.read_timeout,
            idle_timeout: self.idle_timeout,
        });

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(handle(stream, peer, Arc::clone(&conn)));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

struct ConnConfig {
    acceptor: TlsAcceptor,
    app: Router,
    read_timeout: Duration,
    idle_timeout: Duration,
}

async fn handle(stream: TcpStream, peer: SocketAddr, cfg: Arc<ConnConfig>) {
    let tls = match timeout(cfg.read_timeout, cfg.acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(e)) => {
            debug!(%peer, error = %e, "tls handshake failed");
            return;
        }
        Err(_) => {
            debug!(%peer, "tls handshake timed out");
            return;
        }
    };

    let (io, activity) = ActivityIo::new(tls);
    let app = cfg
        .app
        .clone()
        .layer(middleware::from_fn_with_state(activity.clone(), track_in_flight));
    let service = TowerToHyperService::new(app);
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(cfg.read_timeout);
    let conn = builder.serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    tokio::select! {
        res = conn.as_mut() => {
            if let Err(e) = res {
                debug!(%peer, error = %e, "connection closed with error");
            }
            return;
        }
        _ = activity.idle(cfg.idle_timeout) => {
            debug!(%peer, "connection idle; closing");
            conn.as_mut().graceful_shutdown();
        }
    }

    if timeout(cfg.read_timeout, conn).await.is_err() {
        debug!(%peer, "graceful close timed out; dropping connection");
    }
}

/// Holds the connection busy from request arrival until the response body is done.
async fn track_in_flight(State(activity): State<Activity>, req: Request, next: Next) -> Response {
    let request = activity.begin();
    let resp = next.run(req).await;
    if resp.body().size_hint().exact().is_some() {
        return resp;
    }

    let (parts, body) = resp.into_parts();
    let body = body.into_data_stream().map(move |chunk| {
        let _held = &request;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(body))
}
