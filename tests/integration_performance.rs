//! Load behaviour of the nonce lifecycle.
//!
//! Thresholds are deliberately loose; these tests catch order-of-magnitude
//! regressions and check single-use under contention, not exact throughput.
//!
//! Run with: cargo test --test integration_performance -- --nocapture

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::http::Request;
use axum::http::request::Parts;
use peasant::storage::MemoryStorage;
use peasant::{ConfigPreset, NONCE_HEADER, NonceService, NonceStorage, StoredNonceService, Verdict};
use tokio::task::JoinSet;

/// Benchmark result
#[derive(Debug)]
pub struct BenchmarkResult {
    pub operation: String,
    pub duration: Duration,
    pub operations: usize,
    pub ops_per_sec: f64,
}

impl BenchmarkResult {
    pub fn new(operation: &str, duration: Duration, operations: usize) -> Self {
        let ops_per_sec = operations as f64 / duration.as_secs_f64();
        Self {
            operation: operation.to_string(),
            duration,
            operations,
            ops_per_sec,
        }
    }

    pub fn print(&self) {
        println!(
            "  {}: {:?} ({:.0} ops/sec, {} ops)",
            self.operation, self.duration, self.ops_per_sec, self.operations
        );
    }

    pub fn assert_min_ops_per_sec(&self, min_ops: f64) {
        assert!(
            self.ops_per_sec >= min_ops,
            "{} should achieve at least {:.0} ops/sec, got {:.0}",
            self.operation,
            min_ops,
            self.ops_per_sec
        );
    }
}

/// Benchmark a closure and return the result
pub async fn benchmark<F, Fut, R>(operation: &str, operations: usize, f: F) -> BenchmarkResult
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let start = Instant::now();
    let _ = f().await;
    BenchmarkResult::new(operation, start.elapsed(), operations)
}

fn guarded(nonce: &str) -> Parts {
    Request::get("/do-something")
        .header(NONCE_HEADER, nonce)
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn knock() -> Parts {
    Request::head("/new-nonce").body(()).unwrap().into_parts().0
}

#[tokio::test]
async fn test_storage_throughput() {
    let dataset_size = 10_000;
    let storage = MemoryStorage::with_capacity(dataset_size);

    let writes = benchmark("Memory writes", dataset_size, || async {
        for i in 0..dataset_size {
            storage
                .set(&format!("load-{i}"), Duration::from_secs(60))
                .await
                .unwrap();
        }
    })
    .await;
    let takes = benchmark("Memory takes", dataset_size, || async {
        for i in 0..dataset_size {
            assert!(storage.take(&format!("load-{i}")).await.unwrap());
        }
    })
    .await;

    writes.print();
    takes.print();
    writes.assert_min_ops_per_sec(10_000.0);
    takes.assert_min_ops_per_sec(10_000.0);

    assert_eq!(storage.get_stats().await.unwrap().total_records, 0);
}

#[tokio::test]
async fn test_issue_consume_cycle() {
    let cycles = 5_000;
    let service = StoredNonceService::new().with_config(ConfigPreset::Production.into());

    let result = benchmark("Issue and consume", cycles, || async {
        for _ in 0..cycles {
            let nonce = service.get_nonce(&knock()).await.unwrap();
            assert_eq!(service.consume(&guarded(&nonce)).await.unwrap(), Verdict::Proceed);
        }
    })
    .await;

    result.print();
    result.assert_min_ops_per_sec(5_000.0);
    assert_eq!(
        service.storage().get_stats().await.unwrap().total_records,
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_use_under_contention() {
    let service = Arc::new(StoredNonceService::new().with_config(ConfigPreset::Production.into()));
    let nonces: Vec<String> = {
        let mut nonces = Vec::new();
        for _ in 0..200 {
            nonces.push(service.get_nonce(&knock()).await.unwrap());
        }
        nonces
    };
    let nonces = Arc::new(nonces);
    let admitted = Arc::new(AtomicUsize::new(0));

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let nonces = Arc::clone(&nonces);
        let admitted = Arc::clone(&admitted);
        tasks.spawn(async move {
            for nonce in nonces.iter() {
                if service.consume(&guarded(nonce)).await.unwrap().is_proceed() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), nonces.len());
}

#[tokio::test]
async fn test_expiry_keeps_storage_bounded() {
    let storage = MemoryStorage::new();
    for i in 0..1_000 {
        storage
            .set(&format!("short-{i}"), Duration::from_millis(20))
            .await
            .unwrap();
    }
    assert_eq!(storage.get_stats().await.unwrap().total_records, 1_000);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(storage.get_stats().await.unwrap().total_records, 0);
    assert_eq!(storage.cleanup_expired().await.unwrap(), 0);
}
