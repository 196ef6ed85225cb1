//! # Quorum Core
//!
//! Shared foundation for the Quorum forum bot client:
//!
//! - **Error taxonomy**: transport, request, hydration, and client errors
//!   with `Result` aliases ([`error`]).
//! - **Payload codec**: normalization of raw/serialized server payloads
//!   into field maps plus typed accessor helpers ([`payload`]).
//! - **Retry policy**: the bounded retry utility for transiently
//!   rate-limited requests ([`retry`]).
//!
//! Higher layers build on this crate: `quorum-transport` implements the
//! realtime channel and HTTP session, and `quorum-nodebb` implements the
//! NodeBB provider (entities, event routing, plugin host).

pub mod error;
pub mod payload;
pub mod retry;

pub use error::{
    ClientError, ClientResult, ParseError, ParseResult, RATE_LIMIT_PREFIX, RequestError,
    RequestResult, TransportError, TransportResult,
};
pub use retry::{RATE_LIMIT_ATTEMPTS, retry_rate_limited};
