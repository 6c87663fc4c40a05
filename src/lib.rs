//! # Peasant
//!
//! Replay protection between an untrusted caller (the *peasant*) and a trusted
//! endpoint (the *bastion*).
//!
//! Before a guarded action the peasant *knocks*: it asks the bastion for a
//! single-use, time-bounded nonce and presents it exactly once on the guarded
//! request. The bastion consumes the nonce, runs the action and hands back a
//! fresh nonce for the next call.
//!
//! ## Features
//!
//! - **Single-use nonces**: a nonce passes consumption at most once, even under
//!   concurrent attempts
//! - **Automatic expiry**: every nonce expires on its own after its TTL
//!   (250 milliseconds by default)
//! - **Pluggable backends**: the pipeline only sees the [`NonceService`] trait;
//!   the reference [`StoredNonceService`] sits on any [`NonceStorage`]
//! - **axum middleware**: [`Bastion`] guards any router with the nonce pipeline
//! - **Endpoint discovery**: callers resolve URLs through a [`Directory`]
//!   instead of hardcoding them
//!
//! ## Quick Start
//!
//! ### Bastion
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use peasant::Bastion;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bastion = Bastion::builder()
//!     .with_public_url("http://127.0.0.1:8080/nonce")
//!     .with_directory_entry("doSomething", "/do-something")
//!     .build_and_init()
//!     .await?;
//!
//! let guarded = Router::new().route("/do-something", get(|| async { "done" }));
//! let app = Router::new().nest("/nonce", bastion.router(guarded));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Peasant
//!
//! ```rust,no_run
//! use peasant::{HttpTransport, Peasant, RemoteDirectory};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), peasant::NonceError> {
//! let directory = RemoteDirectory::new("http://127.0.0.1:8080/nonce/directory");
//! let caller = Peasant::new(HttpTransport::with_directory(directory));
//!
//! let nonce = caller.new_nonce().await?;
//! println!("knocked and got {nonce}");
//!
//! let response = caller
//!     .transport()
//!     .nonced_request(Method::GET, "doSomething")
//!     .await?
//!     .send()
//!     .await?;
//! let response = peasant::check_status(response)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire Contract
//!
//! - `HEAD <mount>/new-nonce` answers `200`, an empty body and a `nonce`
//!   header; any other method answers `405`.
//! - Guarded endpoints require a `nonce` request header. A missing, unknown,
//!   consumed or expired nonce answers `403`; success answers the handler's
//!   response plus a new `nonce` header.
//! - `GET <mount>/directory` answers a flat JSON object of endpoint names to
//!   absolute URLs.
//!
//! ## Architecture
//!
//! - **[`nonce`]**: the nonce lifecycle: [`NonceService`], [`NonceStorage`],
//!   configuration and errors
//! - **[`bastion`]**: the request pipeline and nonce endpoints on axum
//! - **[`client`]**: [`DirectoryProvider`], [`Transport`] and [`Peasant`]
//!   on reqwest

pub mod bastion;
pub mod client;
pub mod nonce;

pub use nonce::storage;

pub use bastion::{Admission, Bastion, BastionBuilder, Stage, admit, nonced};
pub use client::{
    Directory, DirectoryProvider, HttpTransport, NEW_NONCE_KEY, Peasant, RemoteDirectory,
    StaticDirectory, Transport, check_status,
};
pub use nonce::{
    ConfigPreset, Denial, MemoryStorage, NONCE_HEADER, NonceConfig, NonceError, NonceService,
    NonceStorage, SharedNonceService, StoredNonceService, Verdict,
};
