//! Concrete `TokenStore`/`GroupStore` backends. The
//! trait definitions themselves live in `auth_core::storage` so that
//! `auth-core`'s services can depend on them without a cycle back into this
//! crate.

pub mod file;
pub mod memory;

pub use file::{FileGroupStore, FileTokenStore};
pub use memory::{MemoryGroupStore, MemoryTokenStore};
