//! The nonce service contract and its storage-backed implementation.
//!
//! The request pipeline talks to nonces only through [`NonceService`]. A
//! service answers every guarded step with a [`Verdict`], keeping protocol
//! denials apart from operational errors: `Ok(Verdict::Proceed)` lets the
//! request continue, `Ok(Verdict::Deny(_))` ends it with a client-error status,
//! and `Err(_)` ends it with a server error.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::http::request::Parts;

use super::config::NonceConfig;
use super::generator::{NonceGeneratorFn, default_generator};
use super::storage::{MemoryStorage, NonceStorage};
use crate::NonceError;

/// Header carrying the nonce in both directions.
pub const NONCE_HEADER: &str = "nonce";

/// Paths exempt from nonce enforcement unless configured otherwise.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &["/new-nonce", "/directory"];

/// How many fresh values `get_nonce` tries when storage reports a collision.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Why a request was refused by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The request carried no nonce.
    Missing,
    /// The nonce was never issued, was already consumed, or has expired.
    Unknown,
    /// The service refused an exempt request in [`NonceService::block`].
    Blocked,
}

impl Denial {
    /// The response status a bastion answers this denial with.
    pub fn status(self) -> StatusCode {
        match self {
            Denial::Missing | Denial::Unknown | Denial::Blocked => StatusCode::FORBIDDEN,
        }
    }
}

/// Outcome of a guarded step that did not fail operationally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The request may continue to the next stage.
    Proceed,
    /// The request is refused; the pipeline stops here.
    Deny(Denial),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Proceed`].
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed)
    }
}

/// Shared handle to the active nonce service.
///
/// Handlers receive it through axum state instead of a global.
pub type SharedNonceService = Arc<dyn NonceService>;

/// The capability surface every nonce backend implements.
///
/// # Example
///
/// ```rust
/// use peasant::{NonceService, StoredNonceService, Verdict};
/// use axum::http::Request;
///
/// # async fn example() -> Result<(), peasant::NonceError> {
/// let service = StoredNonceService::new();
///
/// let (issue, _) = Request::head("/new-nonce").body(()).unwrap().into_parts();
/// let nonce = service.get_nonce(&issue).await?;
///
/// let (guarded, _) = Request::get("/do-something")
///     .header("nonce", &nonce)
///     .body(())
///     .unwrap()
///     .into_parts();
/// assert_eq!(service.consume(&guarded).await?, Verdict::Proceed);
/// assert!(!service.consume(&guarded).await?.is_proceed());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait NonceService: Send + Sync {
    /// Hook for requests that skip enforcement.
    ///
    /// The pipeline calls it on the exempt branch. Returning a denial refuses
    /// the request instead of running the action.
    async fn block(&self, _request: &Parts) -> Result<Verdict, NonceError> {
        Ok(Verdict::Proceed)
    }

    /// Removes a nonce if present. Clearing an absent nonce is not an error.
    async fn clear(&self, nonce: &str) -> Result<(), NonceError>;

    /// Validates the presented nonce and invalidates it on success.
    async fn consume(&self, request: &Parts) -> Result<Verdict, NonceError>;

    /// Mints a nonce, records it as live and returns its value.
    async fn get_nonce(&self, request: &Parts) -> Result<String, NonceError>;

    /// Checks that the request presents a nonce at all.
    async fn provided(&self, request: &Parts) -> Result<Verdict, NonceError>;

    /// Whether the request is exempt from nonce enforcement.
    fn skip(&self, request: &Parts) -> bool;

    /// Whether the request takes part in nonce enforcement.
    fn is_nonced(&self, request: &Parts) -> bool {
        !self.skip(request)
    }
}

/// Reads the presented nonce, treating an empty value as absent.
pub fn presented_nonce(request: &Parts) -> Option<&str> {
    request
        .headers
        .get(NONCE_HEADER)
        .map(|value| value.to_str().unwrap_or_default())
        .filter(|value| !value.is_empty())
}

/// A [`NonceService`] that keeps live nonces in a [`NonceStorage`] backend.
///
/// With the default [`MemoryStorage`] this is the volatile reference service:
/// 32-character alphanumeric nonces that expire 250 milliseconds after issue.
pub struct StoredNonceService<S: NonceStorage = MemoryStorage> {
    storage: Arc<S>,
    config: NonceConfig,
    generator: NonceGeneratorFn,
    exempt_paths: Vec<String>,
}

impl StoredNonceService<MemoryStorage> {
    /// Creates the reference service over a fresh [`MemoryStorage`].
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }
}

impl Default for StoredNonceService<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NonceStorage> StoredNonceService<S> {
    /// Creates a service over the given storage with the default configuration.
    pub fn with_storage(storage: Arc<S>) -> Self {
        Self {
            storage,
            config: NonceConfig::default(),
            generator: default_generator(),
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replaces the nonce configuration.
    pub fn with_config(mut self, config: NonceConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the nonce generator.
    ///
    /// The generator receives the configured nonce length.
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    /// Replaces the paths that skip enforcement.
    ///
    /// A request is exempt only when its path equals one of them exactly, as
    /// seen by the layer running the pipeline (below any `nest` prefix).
    pub fn with_exempt_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.exempt_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &NonceConfig {
        &self.config
    }

    /// Returns the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

#[async_trait]
impl<S: NonceStorage + 'static> NonceService for StoredNonceService<S> {
    async fn clear(&self, nonce: &str) -> Result<(), NonceError> {
        if self.storage.remove(nonce).await? {
            tracing::debug!(nonce = %nonce, "nonce cleared");
        }
        Ok(())
    }

    async fn consume(&self, request: &Parts) -> Result<Verdict, NonceError> {
        let Some(nonce) = presented_nonce(request) else {
            return Ok(Verdict::Deny(Denial::Missing));
        };
        if self.storage.take(nonce).await? {
            tracing::debug!(nonce = %nonce, "nonce consumed");
            Ok(Verdict::Proceed)
        } else {
            Ok(Verdict::Deny(Denial::Unknown))
        }
    }

    async fn get_nonce(&self, _request: &Parts) -> Result<String, NonceError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let nonce = (self.generator)(self.config.nonce_length);
            match self.storage.set(&nonce, self.config.ttl).await {
                Ok(()) => {
                    tracing::debug!(nonce = %nonce, ttl_ms = self.config.ttl.as_millis() as u64, "nonce issued");
                    return Ok(nonce);
                }
                Err(NonceError::DuplicateNonce) if attempts < MAX_ISSUE_ATTEMPTS => {
                    tracing::warn!(attempts, "generated nonce collided with a live one");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn provided(&self, request: &Parts) -> Result<Verdict, NonceError> {
        match presented_nonce(request) {
            Some(_) => Ok(Verdict::Proceed),
            None => Ok(Verdict::Deny(Denial::Missing)),
        }
    }

    fn skip(&self, request: &Parts) -> bool {
        let path = request.uri.path();
        self.exempt_paths.iter().any(|exempt| exempt == path)
    }
}
