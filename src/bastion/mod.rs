//! The bastion side: nonce endpoints and the guarded request pipeline on axum.

mod builder;
mod handlers;
pub mod pipeline;
mod server;

pub use builder::BastionBuilder;
pub use handlers::{BastionState, directory, new_nonce};
pub use pipeline::{Admission, Stage, admit, nonced};
pub use server::Bastion;
