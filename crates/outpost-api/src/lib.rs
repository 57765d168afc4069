mod error;
pub use error::ApiError;

mod config;
pub use config::{ControlConfig, HeartbeatConfig};

mod auth;
pub use auth::{AUTH_HEADER, AuthKey};

mod control;
pub use control::ControlApi;

mod heartbeat;
pub use heartbeat::{KEEPALIVE, heartbeat_body};

mod proxy;
pub use proxy::Upstream;

mod io;
mod tls;
pub use tls::load_server_config;

mod server;
pub use server::ControlServer;

mod interior;
pub use interior::{InteriorApi, serve_interior};

pub use axum;
