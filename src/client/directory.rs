//! Discovery of protocol endpoints.
//!
//! A bastion publishes a flat mapping of logical endpoint names to absolute
//! URLs. Callers resolve URLs through a [`DirectoryProvider`] instead of
//! hardcoding them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::transport::check_status;
use crate::NonceError;

/// Directory key of the nonce-issuing endpoint.
pub const NEW_NONCE_KEY: &str = "newNonce";

/// Path of the nonce-issuing endpoint below a bastion's base URL.
pub const NEW_NONCE_PATH: &str = "/nonce/new-nonce";

/// Logical endpoint name to URL mapping, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory(HashMap<String, String>);

impl Directory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory a bastion at `base_url` publishes by convention.
    ///
    /// ```rust
    /// use peasant::Directory;
    ///
    /// let directory = Directory::for_base_url("https://h");
    /// assert_eq!(directory.new_nonce_url().unwrap(), "https://h/nonce/new-nonce");
    /// ```
    pub fn for_base_url(base_url: &str) -> Self {
        Self::new().with_entry(
            NEW_NONCE_KEY,
            format!("{}{}", base_url.trim_end_matches('/'), NEW_NONCE_PATH),
        )
    }

    /// Adds or replaces an entry, returning the previous URL.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), url.into())
    }

    /// Chainable form of [`Directory::insert`].
    pub fn with_entry(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(name, url);
        self
    }

    /// Resolves a logical name.
    ///
    /// Fails with [`NonceError::KeyNotFound`] when the name is not published.
    pub fn url(&self, name: &str) -> Result<&str, NonceError> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| NonceError::KeyNotFound(name.to_string()))
    }

    /// Resolves the nonce-issuing endpoint.
    pub fn new_nonce_url(&self) -> Result<&str, NonceError> {
        self.url(NEW_NONCE_KEY)
    }

    /// Prefixes every URL with `base`.
    pub fn rebased(&self, base: &str) -> Self {
        Self(
            self.0
                .iter()
                .map(|(name, url)| (name.clone(), format!("{base}{url}")))
                .collect(),
        )
    }

    /// Number of published endpoints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is published.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, url)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, url)| (name.as_str(), url.as_str()))
    }
}

impl From<HashMap<String, String>> for Directory {
    fn from(entries: HashMap<String, String>) -> Self {
        Self(entries)
    }
}

/// Source of a bastion's directory.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Returns the current directory.
    async fn directory(&self) -> Result<Directory, NonceError>;

    /// Resolves one logical name to its URL.
    async fn resolve(&self, name: &str) -> Result<String, NonceError> {
        Ok(self.directory().await?.url(name)?.to_string())
    }
}

/// A directory derived from a known base URL, without any network access.
///
/// Publishes `newNonce` at `<base>/nonce/new-nonce` plus any entries added
/// with [`StaticDirectory::with_entry`].
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    base_url: String,
    entries: Directory,
}

impl StaticDirectory {
    /// Creates the conventional directory for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            entries: Directory::for_base_url(&base_url),
            base_url,
        }
    }

    /// Publishes `name` at `path` below the base URL.
    pub fn with_entry(mut self, name: impl Into<String>, path: &str) -> Self {
        self.entries.insert(name, format!("{}{}", self.base_url, path));
        self
    }

    /// The base URL entries are derived from.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DirectoryProvider for StaticDirectory {
    async fn directory(&self) -> Result<Directory, NonceError> {
        Ok(self.entries.clone())
    }
}

/// A directory fetched from the bastion on every resolution.
#[derive(Debug, Clone)]
pub struct RemoteDirectory {
    url: String,
    client: reqwest::Client,
}

impl RemoteDirectory {
    /// Fetches the directory from `url` with a default client.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Fetches the directory from `url` with the given client.
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Where the directory is fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DirectoryProvider for RemoteDirectory {
    async fn directory(&self) -> Result<Directory, NonceError> {
        let response = check_status(self.client.get(&self.url).send().await?)?;
        response
            .json::<Directory>()
            .await
            .map_err(|e| NonceError::InvalidDirectory(e.to_string()))
    }
}
