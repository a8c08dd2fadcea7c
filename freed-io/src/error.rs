//! Error types for FreedIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a single datagram could not be decoded.
///
/// Decode errors never stop the receive loop; the packet is logged and dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Payload shorter than the configured profile's minimum frame length
    #[error("Packet too short: {len} bytes (profile needs at least {min})")]
    TooShort {
        /// Received payload length
        len: usize,
        /// Minimum frame length for the active profile
        min: usize,
    },

    /// Field could not be extracted or converted
    #[error("Malformed field '{field}': {reason}")]
    MalformedField {
        /// Name of the offending field
        field: &'static str,
        /// What went wrong
        reason: String,
    },
}

/// FreedIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to bind the telemetry socket
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    SocketBind {
        /// Address that was requested
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but holds unusable values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Packet layout declares a field outside the minimum frame or an unusable scale
    #[error("Invalid packet layout: {0}")]
    InvalidLayout(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
