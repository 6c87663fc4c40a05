//! The peasant side against a live bastion on a loopback socket.
//!
//! Run with: cargo test --test peasant

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::get;
use peasant::{
    Bastion, ConfigPreset, DirectoryProvider, HttpTransport, NONCE_HEADER, NonceError, Peasant,
    RemoteDirectory, StaticDirectory, Transport, check_status,
};
use reqwest::Method;
use tokio::net::TcpListener;

async fn do_something(headers: HeaderMap) -> String {
    let nonce = headers
        .get(NONCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    format!("Func done with nonce {nonce}")
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    (listener, base_url)
}

/// Mounts `bastion` at `/nonce` with a guarded `/do-something`.
fn spawn(listener: TcpListener, bastion: Bastion) {
    let guarded = Router::new().route("/do-something", get(do_something));
    let app = Router::new().nest("/nonce", bastion.router(guarded));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

/// Serves a bastion with a configured public URL and returns its base URL.
async fn serve_bastion() -> String {
    let (listener, base_url) = bind().await;
    let bastion = Bastion::builder()
        .with_config(ConfigPreset::Testing.into())
        .with_public_url(format!("{base_url}/nonce"))
        .with_directory_entry("doSomething", "/do-something")
        .build_and_init()
        .await
        .unwrap();
    spawn(listener, bastion);
    base_url
}

#[tokio::test]
async fn test_new_nonce() -> Result<(), NonceError> {
    let base_url = serve_bastion().await;
    let caller = Peasant::new(HttpTransport::new(&base_url));

    let nonce = caller.new_nonce().await?;
    assert_eq!(nonce.len(), 32);
    assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));

    let other = caller.new_nonce().await?;
    assert_ne!(nonce, other);
    Ok(())
}

#[tokio::test]
async fn test_do_something() -> Result<(), NonceError> {
    let base_url = serve_bastion().await;
    let directory = StaticDirectory::new(&base_url).with_entry("doSomething", "/nonce/do-something");
    let caller = Peasant::new(HttpTransport::with_directory(directory));

    let response = caller
        .transport()
        .nonced_request(Method::GET, "doSomething")
        .await?
        .send()
        .await?;
    let response = check_status(response)?;
    let next = caller.transport().resolve_nonce(&response)?;
    assert_eq!(next.len(), 32);

    let body = response.text().await?;
    assert!(body.starts_with("Func done with nonce "));
    assert_eq!(body.len(), "Func done with nonce ".len() + 32);
    Ok(())
}

#[tokio::test]
async fn test_reused_nonce_is_forbidden() -> Result<(), NonceError> {
    let base_url = serve_bastion().await;
    let transport = HttpTransport::new(&base_url);
    let url = format!("{base_url}/nonce/do-something");

    let nonce = transport.new_nonce().await?;
    let first = transport
        .client()
        .get(&url)
        .header(NONCE_HEADER, &nonce)
        .send()
        .await?;
    check_status(first)?;

    let second = transport
        .client()
        .get(&url)
        .header(NONCE_HEADER, &nonce)
        .send()
        .await?;
    match check_status(second) {
        Err(NonceError::UnexpectedStatus { code, reason }) => {
            assert_eq!(code, 403);
            assert_eq!(reason, "Forbidden");
        }
        other => panic!("expected 403, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_remote_directory() -> Result<(), NonceError> {
    let base_url = serve_bastion().await;
    let directory = RemoteDirectory::new(format!("{base_url}/nonce/directory"));

    let published = directory.directory().await?;
    assert_eq!(published.len(), 2);
    assert_eq!(
        published.new_nonce_url()?,
        format!("{base_url}/nonce/new-nonce")
    );

    let caller = Peasant::new(HttpTransport::with_directory(directory));
    let body = caller
        .transport()
        .nonced_request(Method::GET, "doSomething")
        .await?
        .send()
        .await?
        .text()
        .await?;
    assert!(body.starts_with("Func done with nonce "));
    Ok(())
}

#[tokio::test]
async fn test_remote_directory_without_public_url() -> Result<(), NonceError> {
    let (listener, base_url) = bind().await;
    let bastion = Bastion::builder()
        .with_directory_entry("doSomething", "/do-something")
        .build_and_init()
        .await?;
    spawn(listener, bastion);

    let directory = RemoteDirectory::new(format!("{base_url}/nonce/directory"));
    assert_eq!(
        directory.resolve("newNonce").await?,
        format!("{base_url}/nonce/new-nonce")
    );

    let caller = Peasant::new(HttpTransport::with_directory(directory));
    assert_eq!(caller.new_nonce().await?.len(), 32);

    let response = caller
        .transport()
        .nonced_request(Method::GET, "doSomething")
        .await?
        .send()
        .await?;
    let body = check_status(response)?.text().await?;
    assert!(body.starts_with("Func done with nonce "));
    Ok(())
}

#[tokio::test]
async fn test_unpublished_endpoint() -> Result<(), NonceError> {
    let base_url = serve_bastion().await;
    let transport = HttpTransport::new(&base_url);

    match transport.nonced_request(Method::GET, "doSomethingElse").await {
        Err(NonceError::KeyNotFound(key)) => assert_eq!(key, "doSomethingElse"),
        other => panic!("expected KeyNotFound, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn test_wrong_nonce_method() {
    let base_url = serve_bastion().await;
    let transport = HttpTransport::new(&base_url).with_nonce_method(Method::GET);

    assert!(matches!(
        transport.new_nonce().await,
        Err(NonceError::UnexpectedStatus { code: 405, .. })
    ));
}

#[tokio::test]
async fn test_missing_nonce_header() {
    let base_url = serve_bastion().await;
    let transport = HttpTransport::new(&base_url).with_nonce_key("replay-nonce");

    assert!(matches!(
        transport.new_nonce().await,
        Err(NonceError::MissingNonceHeader(key)) if key == "replay-nonce"
    ));
}

#[tokio::test]
async fn test_unreachable_bastion() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport = HttpTransport::new(&base_url);
    assert!(matches!(
        transport.new_nonce().await,
        Err(NonceError::TransportError(_))
    ));
}
