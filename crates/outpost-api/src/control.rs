use std::sync::Arc;

use axum::{Router, middleware, routing::any};
use outpost_core::MessageRouter;

use crate::{
    auth::{AuthKey, require_auth},
    config::HeartbeatConfig,
    heartbeat::monitor,
    proxy::{Upstream, proxy},
};

pub(crate) struct ControlState {
    pub(crate) auth: AuthKey,
    pub(crate) router: MessageRouter,
    pub(crate) heartbeat: HeartbeatConfig,
    pub(crate) upstream: Upstream,
}

/// Builder of the authenticated control-channel application.
pub struct ControlApi {
    auth: AuthKey,
    router: MessageRouter,
    upstream: Upstream,
    heartbeat: HeartbeatConfig,
}

impl ControlApi {
    pub fn new(auth: AuthKey, router: MessageRouter, upstream: Upstream) -> Self {
        Self {
            auth,
            router,
            upstream,
            heartbeat: HeartbeatConfig::default(),
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Build axum router.
    ///
    /// Routes (all behind `X-Auth-Key`):
    /// - /monitor - heartbeat stream, any method
    /// - everything else - proxied to the upstream
    pub fn router(self) -> Router {
        let state = Arc::new(ControlState {
            auth: self.auth,
            router: self.router,
            heartbeat: self.heartbeat,
            upstream: self.upstream,
        });

        Router::new()
            .route("/monitor", any(monitor))
            .fallback(proxy)
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }
}
