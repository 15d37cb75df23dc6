use thiserror::Error;

/// Failures while bringing the transport up.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid bind address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("invalid CORS origin: {0}")]
    CorsOrigin(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
