// src/error.rs
use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by an [`ApiClient`](crate::powerdns::client::ApiClient).
///
/// The model never retries these; they are handed back to the caller as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("PowerDNS {method} {path}: {source}")]
    Request {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("PowerDNS {method} {path} failed with {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("PowerDNS {method} {path} returned a body that is not JSON: {source}")]
    Body {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed {what} in PowerDNS response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("name is not canonical (missing trailing dot): {0}")]
    NonCanonicalName(String),

    #[error("zone rrsets must be given either as a list or as a raw payload, not both")]
    AmbiguousRRSetSource,

    #[error("field '{0}' is already set and cannot be changed")]
    ImmutableField(&'static str),

    #[error("rrset {0} is not attached to a zone")]
    DetachedRRSet(String),

    #[error("zone {0} is not bound to a server")]
    UnboundZone(String),

    /// The write was accepted by the server; only the reload afterwards
    /// failed, so the cached zone is stale.
    #[error("zone {zone} was updated but could not be reloaded: {source}")]
    ReloadAfterWrite {
        zone: String,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid SOA serial '{0}' (expected YYYYMMDDnn)")]
    InvalidSerial(String),

    #[error("SOA serial {0} has no changes left for today")]
    SerialExhausted(String),

    #[error("invalid SOA mailbox '{0}'")]
    InvalidEmail(String),

    #[error("invalid SOA record content '{0}'")]
    InvalidSoa(String),

    #[error("zone {0} has no SOA record")]
    MissingSoa(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn decode(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Error::Decode { what, source }
    }

    pub fn encode(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Error::Encode { what, source }
    }

    pub fn non_canonical(name: impl Into<String>) -> Self {
        Error::NonCanonicalName(name.into())
    }
}
