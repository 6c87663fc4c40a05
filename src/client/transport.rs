//! The caller side of the nonce exchange over HTTP.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};

use super::directory::{Directory, DirectoryProvider, NEW_NONCE_KEY, StaticDirectory};
use crate::NonceError;
use crate::nonce::NONCE_HEADER;

/// How a caller reaches a bastion.
///
/// Implementations hold no protocol state between calls: every nonce comes
/// from a fresh round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the bastion's directory.
    async fn directory(&self) -> Result<Directory, NonceError>;

    /// Resolves the URL of the nonce-issuing endpoint.
    async fn new_nonce_url(&self) -> Result<String, NonceError> {
        Ok(self.directory().await?.new_nonce_url()?.to_string())
    }

    /// Obtains a fresh nonce from the bastion.
    async fn new_nonce(&self) -> Result<String, NonceError>;
}

/// Turns a non-2xx response into [`NonceError::UnexpectedStatus`].
pub fn check_status(response: Response) -> Result<Response, NonceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(NonceError::UnexpectedStatus {
        code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

/// A [`Transport`] over reqwest.
///
/// Knocks with `HEAD` on the directory's `newNonce` URL and reads the nonce
/// from the `nonce` response header, both configurable.
///
/// # Example
///
/// ```rust,no_run
/// use peasant::{HttpTransport, Transport};
/// use reqwest::Method;
///
/// # async fn example() -> Result<(), peasant::NonceError> {
/// let transport = HttpTransport::new("http://127.0.0.1:8080");
/// let nonce = transport.new_nonce().await?;
///
/// // Or knock and build the guarded request in one go
/// let transport = HttpTransport::with_directory(
///     peasant::StaticDirectory::new("http://127.0.0.1:8080")
///         .with_entry("doSomething", "/nonce/do-something"),
/// );
/// let response = transport
///     .nonced_request(Method::GET, "doSomething")
///     .await?
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport<D: DirectoryProvider = StaticDirectory> {
    directory: D,
    client: reqwest::Client,
    nonce_key: String,
    nonce_method: Method,
}

impl HttpTransport<StaticDirectory> {
    /// Creates a transport for the bastion at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_directory(StaticDirectory::new(base_url))
    }
}

impl<D: DirectoryProvider> HttpTransport<D> {
    /// Creates a transport resolving endpoints through `directory`.
    pub fn with_directory(directory: D) -> Self {
        Self {
            directory,
            client: reqwest::Client::new(),
            nonce_key: NONCE_HEADER.to_string(),
            nonce_method: Method::HEAD,
        }
    }

    /// Sets the response header the nonce is read from.
    pub fn with_nonce_key(mut self, nonce_key: impl Into<String>) -> Self {
        self.nonce_key = nonce_key.into();
        self
    }

    /// Sets the method used to request a nonce.
    pub fn with_nonce_method(mut self, method: Method) -> Self {
        self.nonce_method = method;
        self
    }

    /// Uses a preconfigured client, e.g. one with timeouts.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn nonce_key(&self) -> &str {
        &self.nonce_key
    }

    pub fn directory_provider(&self) -> &D {
        &self.directory
    }

    /// Extracts the nonce from a bootstrap response.
    pub fn resolve_nonce(&self, response: &Response) -> Result<String, NonceError> {
        response
            .headers()
            .get(self.nonce_key.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| NonceError::MissingNonceHeader(self.nonce_key.clone()))
    }

    /// Knocks for a fresh nonce and prepares a request to the endpoint
    /// published as `name`, carrying that nonce.
    ///
    /// Both URLs come from a single directory lookup, and an unpublished
    /// `name` fails before any nonce is requested.
    pub async fn nonced_request(
        &self,
        method: Method,
        name: &str,
    ) -> Result<RequestBuilder, NonceError> {
        let directory = self.directory.directory().await?;
        let url = directory.url(name)?;
        let nonce = self.knock(directory.new_nonce_url()?).await?;
        Ok(self
            .client
            .request(method, url)
            .header(self.nonce_key.as_str(), nonce))
    }

    async fn knock(&self, url: &str) -> Result<String, NonceError> {
        let response = self
            .client
            .request(self.nonce_method.clone(), url)
            .send()
            .await?;
        let response = check_status(response)?;
        let nonce = self.resolve_nonce(&response)?;
        tracing::debug!(url = %url, "obtained nonce");
        Ok(nonce)
    }
}

#[async_trait]
impl<D: DirectoryProvider> Transport for HttpTransport<D> {
    async fn directory(&self) -> Result<Directory, NonceError> {
        self.directory.directory().await
    }

    async fn new_nonce_url(&self) -> Result<String, NonceError> {
        self.directory.resolve(NEW_NONCE_KEY).await
    }

    async fn new_nonce(&self) -> Result<String, NonceError> {
        let url = self.new_nonce_url().await?;
        self.knock(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults() -> Result<(), NonceError> {
        let transport = HttpTransport::new("https://h");
        assert_eq!(transport.nonce_key(), "nonce");
        assert_eq!(transport.nonce_method, Method::HEAD);
        assert_eq!(
            transport.new_nonce_url().await?,
            "https://h/nonce/new-nonce"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_configuration() {
        let transport = HttpTransport::new("https://h")
            .with_nonce_key("Replay-Nonce")
            .with_nonce_method(Method::GET);
        assert_eq!(transport.nonce_key(), "Replay-Nonce");
        assert_eq!(transport.nonce_method, Method::GET);
        assert_eq!(transport.directory_provider().base_url(), "https://h");
    }

    #[tokio::test]
    async fn test_unpublished_name_fails_before_knocking() {
        // Nothing listens on the discard port; a knock would be a transport error
        let transport = HttpTransport::new("http://127.0.0.1:9");
        match transport.nonced_request(Method::GET, "doSomethingElse").await {
            Err(NonceError::KeyNotFound(key)) => assert_eq!(key, "doSomethingElse"),
            other => panic!("expected KeyNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_directory_without_new_nonce() {
        struct Empty;

        #[async_trait]
        impl DirectoryProvider for Empty {
            async fn directory(&self) -> Result<Directory, NonceError> {
                Ok(Directory::new().with_entry("newNonceTypo", "https://h/nonce/new-nonce"))
            }
        }

        let transport = HttpTransport::with_directory(Empty);
        assert!(matches!(
            transport.new_nonce().await,
            Err(NonceError::KeyNotFound(key)) if key == "newNonce"
        ));
    }
}
