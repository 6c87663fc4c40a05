use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};

use super::BastionBuilder;
use super::handlers::{self, BastionState, DIRECTORY_ROUTE, NEW_NONCE_ROUTE};
use super::pipeline::nonced;
use crate::client::Directory;
use crate::nonce::{MemoryStorage, SharedNonceService};

/// The trusted endpoint of the Peasant protocol.
///
/// A `Bastion` owns the active nonce service and the directory it publishes.
/// It produces axum routers: the nonce endpoints themselves, and a guard that
/// puts any router behind the nonce pipeline.
///
/// To create an instance, use [`Bastion::builder()`].
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use peasant::Bastion;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bastion = Bastion::builder()
///     .with_public_url("http://127.0.0.1:8080/nonce")
///     .build_and_init()
///     .await?;
///
/// let guarded = Router::new().route("/do-something", get(|| async { "done" }));
/// let app = Router::new().nest("/nonce", bastion.router(guarded));
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bastion {
    pub(crate) state: BastionState,
}

impl Bastion {
    /// Creates a new `BastionBuilder` backed by `MemoryStorage`.
    pub fn builder() -> BastionBuilder<MemoryStorage> {
        BastionBuilder::new()
    }

    /// Returns the active nonce service.
    pub fn service(&self) -> &SharedNonceService {
        &self.state.service
    }

    /// Returns the published directory.
    ///
    /// URLs are absolute when a public URL was configured. Otherwise they are
    /// paths relative to the mount point, and `/directory` resolves them
    /// against each request.
    pub fn directory(&self) -> Directory {
        match &self.state.public_url {
            Some(url) => self.state.endpoints.rebased(url),
            None => self.state.endpoints.as_ref().clone(),
        }
    }

    /// `/new-nonce` and `/directory`, without the nonce pipeline.
    pub fn nonce_routes(&self) -> Router {
        Router::new()
            .route(NEW_NONCE_ROUTE, any(handlers::new_nonce))
            .route(DIRECTORY_ROUTE, get(handlers::directory))
            .with_state(self.state.clone())
    }

    /// Puts every route of `router` behind the nonce pipeline.
    ///
    /// Only matched routes are guarded; unknown paths still answer `404`.
    /// `router` must already contain its routes.
    ///
    /// Exempt paths are compared exactly against the path this layer sees.
    /// Protect a router before nesting it, so that `/new-nonce` is not seen
    /// under its mount prefix.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self.state.service.clone(), nonced))
    }

    /// The nonce endpoints merged with `protected`, all behind the pipeline.
    ///
    /// The nonce endpoints pass through because the service exempts them.
    pub fn router(&self, protected: Router) -> Router {
        self.protect(self.nonce_routes().merge(protected))
    }
}
