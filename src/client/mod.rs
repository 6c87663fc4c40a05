//! The peasant side: endpoint discovery and nonce acquisition over reqwest.

mod directory;
mod peasant;
mod transport;

pub use directory::{
    Directory, DirectoryProvider, NEW_NONCE_KEY, NEW_NONCE_PATH, RemoteDirectory, StaticDirectory,
};
pub use peasant::Peasant;
pub use transport::{HttpTransport, Transport, check_status};
