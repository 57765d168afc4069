use std::{net::SocketAddr, path::PathBuf};

use rustls::pki_types::pem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("auth key must not be empty")]
    EmptyAuthKey,

    #[error("failed to read {path}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: pem::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no supported key exchange group")]
    NoKeyExchangeGroup,

    #[error("tls configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
