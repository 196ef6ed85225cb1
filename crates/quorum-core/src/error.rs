//! Unified error types for the Quorum client crates.
//!
//! Errors are grouped by concern: transport failures (HTTP or channel),
//! request failures reported by the remote side, payload hydration
//! failures, and client-level failures (plugin contracts, event routing).

use thiserror::Error;

/// Prefix the forum uses to flag transient rate-limit errors.
///
/// Messages of the shape `[[error:too-many-<what>]]` mean "retry after a
/// delay"; everything else is permanent.
pub const RATE_LIMIT_PREFIX: &str = "[[error:too-many-";

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by the HTTP session or the realtime channel.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The channel handshake failed before it completed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The channel is not connected (never connected, or closed since).
    #[error("channel is not connected")]
    NotConnected,

    /// A frame could not be written to the channel.
    #[error("failed to send request: {0}")]
    SendFailed(String),

    /// An HTTP request failed (network error or non-2xx response).
    #[error("{0}")]
    Http(String),

    /// A response body was not valid JSON.
    #[error("{0}")]
    BadJson(String),
}

// =============================================================================
// Request Errors
// =============================================================================

/// Error type for named requests over the channel.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The remote side answered the request with an error.
    ///
    /// The message is already unpacked: bare strings and serialized errors
    /// (`{ "message": ... }`) both arrive here as the plain message text.
    #[error("{message}")]
    Remote {
        /// Message reported by the server.
        message: String,
    },

    /// Transport-level failure before any response arrived.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failed to serialize the outbound frame.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RequestError {
    /// Creates a remote error from a server-provided message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Whether this error is a transient rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Remote { message } if message.starts_with(RATE_LIMIT_PREFIX))
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors raised while hydrating an entity from a payload.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The payload was absent or empty. Raised by entity constructors;
    /// the static `parse` factories upgrade this to [`ParseError::NotFound`].
    #[error("cannot hydrate entity from empty payload")]
    EmptyPayload,

    /// A `parse` factory was handed an empty payload for a specific kind.
    #[error("E_{kind}_NOT_FOUND")]
    NotFound {
        /// Entity kind, uppercased (e.g. `CHATMESSAGE`).
        kind: &'static str,
    },

    /// The payload was present but not a record (or not parseable JSON).
    #[error("malformed payload: {0}")]
    BadPayload(String),
}

impl ParseError {
    /// Maps [`ParseError::EmptyPayload`] to a kind-specific not-found error.
    ///
    /// Used by the static `parse` factories so callers can distinguish
    /// "no data to parse" from other hydration failures.
    pub fn for_kind(self, kind: &'static str) -> Self {
        match self {
            Self::EmptyPayload => Self::NotFound { kind },
            other => other,
        }
    }
}

// =============================================================================
// Client Errors
// =============================================================================

/// Top-level error type for forum client operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// A channel request failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Entity hydration failed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An HTTP session operation failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An inbound event payload was missing a required field.
    #[error("Event payload did not include {0}")]
    PayloadShape(&'static str),

    /// A plugin factory produced an invalid plugin.
    #[error("invalid plugin: {reason}")]
    PluginContract {
        /// Reason the factory result was rejected.
        reason: String,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for channel requests.
pub type RequestResult<T> = Result<T, RequestError>;

/// Result type for entity hydration.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
