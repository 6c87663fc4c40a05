//! A bastion guarding one action.
//!
//! Run with: cargo run --example bastion
//! Then in another shell: cargo run --example knock

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::get;
use peasant::{Bastion, NONCE_HEADER};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const ADDR: &str = "127.0.0.1:8080";

async fn do_something(headers: HeaderMap) -> String {
    let nonce = headers
        .get(NONCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    format!("Func done with nonce {nonce}")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "peasant=debug,info".into()),
        )
        .init();

    let bastion = Bastion::builder()
        .with_public_url(format!("http://{ADDR}/nonce"))
        .with_directory_entry("doSomething", "/do-something")
        .build_and_init()
        .await?;

    let guarded = Router::new().route("/do-something", get(do_something));
    let app = Router::new()
        .nest("/nonce", bastion.router(guarded))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(ADDR).await?;
    tracing::info!("bastion listening on http://{}", ADDR);
    axum::serve(listener, app).await?;
    Ok(())
}
