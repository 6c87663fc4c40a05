use thiserror::Error;

/// Operational failures of the Peasant protocol.
///
/// A missing, unknown or expired nonce is *not* an error: those outcomes are
/// protocol denials and travel as [`Denial`](crate::Denial) inside a
/// [`Verdict`](crate::Verdict). Everything in this enum is a genuine failure
/// that the bastion answers with a server error, or that the caller side hands
/// back to its user.
///
/// # Error Categories
///
/// - **Storage Errors**: `DuplicateNonce`, `StorageError`
/// - **Directory Errors**: `KeyNotFound`, `InvalidDirectory`
/// - **Transport Errors**: `MissingNonceHeader`, `TransportError`, `UnexpectedStatus`
/// - **Setup Errors**: `ConfigError`
///
/// # Example
///
/// ```rust
/// use peasant::{Directory, NonceError};
///
/// let directory = Directory::for_base_url("https://h");
/// match directory.url("doSomething") {
///     Ok(url) => println!("resolved {url}"),
///     Err(NonceError::KeyNotFound(key)) => println!("bastion does not publish {key}"),
///     Err(e) => println!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum NonceError {
    /// The storage backend already holds a live nonce with this value.
    ///
    /// With 32 alphanumeric characters this is practically unreachable; the
    /// nonce service regenerates a few times before giving up with it.
    #[error("Nonce already exists")]
    DuplicateNonce,

    /// A storage backend operation failed.
    ///
    /// # When This Occurs
    ///
    /// - A remote or durable backend is unreachable
    /// - The backend refuses a write or returns corrupted data
    ///
    /// The bastion pipeline maps this to `500 Internal Server Error` and never
    /// runs the protected action.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The directory does not publish the requested logical endpoint.
    #[error("Key not found in directory: {0}")]
    KeyNotFound(String),

    /// The directory body could not be decoded into a name to URL mapping.
    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    /// The bootstrap response did not carry the expected nonce header.
    #[error("Response has no {0} header")]
    MissingNonceHeader(String),

    /// The HTTP client failed before a response was received.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The bastion answered with a non-2xx status.
    ///
    /// Displays like the status line, e.g. `403 Forbidden`.
    #[error("{code} {reason}")]
    UnexpectedStatus {
        /// Numeric HTTP status code
        code: u16,
        /// Canonical reason phrase, empty when the code has none
        reason: String,
    },

    /// A configuration value is unusable.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for NonceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NonceError::UnexpectedStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            },
            None => NonceError::TransportError(err.to_string()),
        }
    }
}
