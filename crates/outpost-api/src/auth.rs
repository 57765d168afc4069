use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{control::ControlState, error::ApiError};

pub const AUTH_HEADER: &str = "x-auth-key";

/// Shared secret expected in [`AUTH_HEADER`].
#[derive(Clone)]
pub struct AuthKey(Arc<[u8]>);

impl AuthKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self, ApiError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(ApiError::EmptyAuthKey);
        }
        Ok(Self(Arc::from(key.as_bytes())))
    }

    /// Constant-time comparison against the request header. Missing header never matches.
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTH_HEADER)
            .is_some_and(|v| bool::from(v.as_bytes().ct_eq(&self.0)))
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthKey(***)")
    }
}

pub(crate) async fn require_auth(
    State(state): State<Arc<ControlState>>,
    req: Request,
    next: Next,
) -> Response {
    if state.auth.verify(req.headers()) {
        return next.run(req).await;
    }
    warn!(method = %req.method(), path = %req.uri().path(), "rejected request with bad auth key");
    forbidden()
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        [(header::CONNECTION, HeaderValue::from_static("close"))],
    )
        .into_response()
}
