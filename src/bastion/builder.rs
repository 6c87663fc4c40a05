use std::sync::Arc;
use std::time::Duration;

use super::Bastion;
use super::handlers::{BastionState, NEW_NONCE_ROUTE};
use crate::client::{Directory, NEW_NONCE_KEY};
use crate::nonce::{
    DEFAULT_EXEMPT_PATHS, MemoryStorage, NonceConfig, NonceError, NonceStorage,
    SharedNonceService, StoredNonceService,
};

/// A builder for creating a [`Bastion`].
///
/// This builder defaults to a [`StoredNonceService`] over `MemoryStorage` and
/// the configuration from [`NonceConfig::default()`].
#[must_use = "The builder does nothing unless `.build_and_init()` is called."]
pub struct BastionBuilder<S: NonceStorage> {
    storage: Arc<S>,
    service: Option<SharedNonceService>,
    config: Option<NonceConfig>,
    exempt_paths: Option<Vec<String>>,
    public_url: Option<String>,
    entries: Vec<(String, String)>,
}

impl BastionBuilder<MemoryStorage> {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            service: None,
            config: None,
            exempt_paths: None,
            public_url: None,
            entries: Vec::new(),
        }
    }
}

impl<S: NonceStorage + 'static> BastionBuilder<S> {
    /// Specifies a custom storage backend to use instead of `MemoryStorage`.
    pub fn with_storage<T: NonceStorage + 'static>(self, storage: Arc<T>) -> BastionBuilder<T> {
        BastionBuilder {
            storage,
            service: self.service,
            config: self.config,
            exempt_paths: self.exempt_paths,
            public_url: self.public_url,
            entries: self.entries,
        }
    }

    /// Uses a ready-made nonce service.
    ///
    /// Storage, configuration and exempt paths set on this builder are then
    /// ignored; the service owns those decisions.
    pub fn with_service(mut self, service: SharedNonceService) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the nonce configuration.
    pub fn with_config(mut self, config: NonceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the nonce TTL, keeping the rest of the configuration.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.ttl = ttl;
        self.config = Some(config);
        self
    }

    /// Sets the paths that skip nonce enforcement, matched exactly.
    ///
    /// Keep `/new-nonce` in the list, or callers can never knock.
    pub fn with_exempt_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.exempt_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the absolute URL where the bastion's router is mounted.
    ///
    /// Directory entries are published relative to it. When unset, the
    /// directory endpoint derives the base URL from each request.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Publishes an extra endpoint in the directory.
    ///
    /// `path` is relative to the public URL, e.g. `"/do-something"`.
    pub fn with_directory_entry(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.entries.push((name.into(), path.into()));
        self
    }

    /// Builds and initializes the `Bastion`.
    ///
    /// Validates the configuration, logging any warnings, and calls the
    /// storage backend's `init()` before returning.
    pub async fn build_and_init(self) -> Result<Bastion, NonceError> {
        let service = match self.service {
            Some(service) => service,
            None => {
                let config = self.config.unwrap_or_default();
                config.ensure_usable()?;
                for warning in config.validate() {
                    tracing::warn!("{}", warning);
                }
                tracing::debug!("{}", config.summary());

                self.storage.init().await?;

                let exempt_paths = self.exempt_paths.unwrap_or_else(|| {
                    DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect()
                });
                let service = StoredNonceService::with_storage(self.storage)
                    .with_config(config)
                    .with_exempt_paths(exempt_paths);
                Arc::new(service) as SharedNonceService
            }
        };

        let mut endpoints = Directory::new().with_entry(NEW_NONCE_KEY, NEW_NONCE_ROUTE);
        for (name, path) in self.entries {
            endpoints.insert(name, path);
        }

        Ok(Bastion {
            state: BastionState {
                service,
                endpoints: Arc::new(endpoints),
                public_url: self.public_url.map(Arc::from),
            },
        })
    }
}
