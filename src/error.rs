//! Error taxonomy for the client. Every failure surfaces to the caller of the
//! operation that triggered it; nothing is retried internally.

use thiserror::Error;

/// Errors produced by connect, request and bind operations.
///
/// The enum is `Clone` so that a single connection-level failure can be
/// delivered to every pending request; I/O and TLS causes are therefore
/// carried as rendered messages rather than source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LdapError {
    /// Endpoint URL failed validation. Rejected before any I/O.
    #[error("invalid LDAP URL: {0}")]
    InvalidUrl(String),

    /// The codec saw malformed (not merely incomplete) BER data. Fatal to the
    /// connection; all pending requests are failed with this error.
    #[error("malformed BER data: {0}")]
    Framing(String),

    /// A decoded reply carried a message id with no registered pending slot.
    /// Indicates a server protocol violation or local bookkeeping bug; the
    /// connection is failed rather than allowed to misattribute replies.
    #[error("no pending request for message id {0}")]
    Correlation(i32),

    /// The server answered the StartTLS extended request with a nonzero
    /// result code. The connection must not be used afterwards.
    #[error("server refused StartTLS (result code {result_code}): {diagnostic}")]
    StartTlsRefused { result_code: i32, diagnostic: String },

    /// Bind completed with a nonzero result code. The connection itself
    /// remains usable.
    #[error("bind failed (result code {result_code}): {diagnostic}")]
    BindFailed { result_code: i32, diagnostic: String },

    /// A SASL mechanism could not produce its next credential blob.
    #[error("SASL mechanism error: {0}")]
    Sasl(String),

    /// The reply matched our message id but carried an operation variant the
    /// caller cannot interpret (e.g. a bind response to an extended request).
    #[error("unexpected response variant: {0}")]
    UnexpectedResponse(String),

    /// TLS configuration or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Underlying transport failure. Fails active requests and closes the
    /// connection; reconnecting is the caller's responsibility.
    #[error("I/O error: {0}")]
    Io(String),

    /// The connection is closed (peer hangup, prior fatal error, or explicit
    /// close).
    #[error("connection closed")]
    Closed,
}

impl From<std::io::Error> for LdapError {
    fn from(e: std::io::Error) -> Self {
        LdapError::Io(e.to_string())
    }
}
