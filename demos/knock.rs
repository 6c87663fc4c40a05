//! A peasant calling the guarded action of the `bastion` demo.
//!
//! Run with: cargo run --example knock [base-url]

use peasant::{HttpTransport, Peasant, RemoteDirectory, check_status};
use reqwest::Method;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "peasant=debug,info".into()),
        )
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
    let directory = RemoteDirectory::new(format!("{base_url}/nonce/directory"));
    let caller = Peasant::new(HttpTransport::with_directory(directory));

    for attempt in 1..=3 {
        let response = caller
            .transport()
            .nonced_request(Method::GET, "doSomething")
            .await?
            .send()
            .await?;
        let response = check_status(response)?;
        let next = caller.transport().resolve_nonce(&response)?;
        println!("#{attempt}: {} (next nonce {next})", response.text().await?);
    }

    // A nonce that was already spent is refused
    let nonce = caller.new_nonce().await?;
    let url = format!("{base_url}/nonce/do-something");
    for label in ["fresh", "replayed"] {
        let response = caller
            .transport()
            .client()
            .get(&url)
            .header(caller.transport().nonce_key(), &nonce)
            .send()
            .await?;
        println!("{label} nonce: {}", response.status());
    }

    Ok(())
}
