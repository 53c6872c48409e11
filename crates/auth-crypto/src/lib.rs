pub mod jwt;
pub mod keys;

pub use jwt::{JwtClaims, JwtConfig, JwtError, JwtService};
pub use keys::{KeyError, SigningKey, MIN_SECRET_BYTES};
