use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid client subnet: {0}")]
    InvalidSubnet(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Query has no question section")]
    EmptyQuestion,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Failed to connect to {server}: {reason}")]
    TransportConnectionRefused { server: String, reason: String },

    #[error("Timeout talking to {server}")]
    TransportTimeout { server: String },

    #[error("Failed to send query to {server}: {reason}")]
    TransportWriteFailed { server: String, reason: String },

    #[error("Failed to read response from {server}: {reason}")]
    TransportReadFailed { server: String, reason: String },

    #[error("HTTP {status} from {server}")]
    TransportHttpStatus { server: String, status: u16 },

    #[error("Failed to decode response from {server}: {reason}")]
    TransportDecodeFailed { server: String, reason: String },

    #[error("All upstreams failed for {domain}")]
    TransportAllServersUnreachable { domain: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
