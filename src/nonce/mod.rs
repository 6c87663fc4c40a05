// Core nonce lifecycle
mod config;
mod error;
mod generator;
mod service;

// Storage backends
pub mod storage;

pub use config::{ConfigPreset, DEFAULT_NONCE_LENGTH, DEFAULT_NONCE_TTL, NonceConfig};
pub use error::NonceError;
pub use generator::{NonceGeneratorFn, default_generator, generate_nonce};
pub use service::{
    DEFAULT_EXEMPT_PATHS, Denial, NONCE_HEADER, NonceService, SharedNonceService,
    StoredNonceService, Verdict, presented_nonce,
};
pub use storage::{MemoryStorage, NonceEntry, NonceStorage, StorageStats};
