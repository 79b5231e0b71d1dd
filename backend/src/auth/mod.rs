//! Authentication module
//!
//! Argon2 password hashing, dual-secret JWT issuance and the request guard.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenIdentity, TokenType};
pub use middleware::AuthUser;
pub use password::{PasswordService, DUMMY_HASH};
