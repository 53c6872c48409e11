pub mod backend;
pub mod client;

pub use backend::{KvGroupStore, KvTokenStore};
pub use client::{VaultAuth, VaultClient, VaultConfig};
