//! Bootstrap (`Bootstrapper`) and long-lived identity agent
//! (`IdentityAgent`) for services that sit behind a sealed remote
//! secret store.

pub mod bootstrap;
pub mod identity;
pub mod secrets_dir;

pub use bootstrap::{BootstrapConfig, Bootstrapper};
pub use identity::{IdentityAgent, IdentityState};
