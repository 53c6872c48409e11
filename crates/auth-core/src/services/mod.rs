pub mod auth_service;
pub mod group_registry;
pub mod token_service;

pub use auth_service::*;
pub use group_registry::*;
pub use token_service::*;
