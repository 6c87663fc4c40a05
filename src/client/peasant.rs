use super::transport::Transport;
use crate::NonceError;

/// The calling agent of the Peasant protocol.
///
/// A thin façade over a [`Transport`]. Protocol-specific actions are added by
/// wrapping a `Peasant` (or its transport) in a type of your own:
///
/// ```rust,no_run
/// use peasant::{HttpTransport, NonceError, Peasant, StaticDirectory};
/// use reqwest::Method;
///
/// struct Worker(Peasant<HttpTransport>);
///
/// impl Worker {
///     async fn do_something(&self) -> Result<String, NonceError> {
///         let request = self
///             .0
///             .transport()
///             .nonced_request(Method::GET, "doSomething")
///             .await?;
///         let response = peasant::check_status(request.send().await?)?;
///         Ok(response.text().await?)
///     }
/// }
///
/// # async fn example() -> Result<(), NonceError> {
/// let directory = StaticDirectory::new("http://127.0.0.1:8080")
///     .with_entry("doSomething", "/nonce/do-something");
/// let worker = Worker(Peasant::new(HttpTransport::with_directory(directory)));
/// println!("{}", worker.do_something().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Peasant<T: Transport> {
    transport: T,
}

impl<T: Transport> Peasant<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Knocks: obtains a fresh nonce through the transport.
    pub async fn new_nonce(&self) -> Result<String, NonceError> {
        self.transport.new_nonce().await
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
