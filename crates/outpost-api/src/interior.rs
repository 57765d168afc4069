use std::net::SocketAddr;

use axum::{Router, body::Bytes, extract::State, http::StatusCode, routing::post};
use outpost_core::MessageRouter;
use outpost_model::Message;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Loopback endpoint through which local workers publish status messages.
pub struct InteriorApi {
    router: MessageRouter,
}

impl InteriorApi {
    pub fn new(router: MessageRouter) -> Self {
        Self { router }
    }

    /// Build axum router.
    ///
    /// Routes:
    /// - POST /pushstatus - dispatch a JSON message
    pub fn router(self) -> Router {
        Router::new()
            .route("/pushstatus", post(push_status))
            .with_state(self.router)
    }
}

/// Binds `addr` and serves [`InteriorApi`] until the listener fails.
pub async fn serve_interior(addr: SocketAddr, router: MessageRouter) -> Result<(), ApiError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })?;
    info!(%addr, "interior endpoint listening");
    axum::serve(listener, InteriorApi::new(router).router()).await?;
    Ok(())
}

/// POST /pushstatus
async fn push_status(State(router): State<MessageRouter>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Message>(&body) {
        Ok(msg) => {
            debug!(kind = %msg.kind, "status pushed");
            router.dispatch(msg);
            StatusCode::OK
        }
        Err(e) => {
            warn!(error = %e, "unparsable status message");
            StatusCode::BAD_REQUEST
        }
    }
}
