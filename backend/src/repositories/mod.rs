//! User data access
//!
//! The authentication core only needs a keyed store of credential records;
//! [`UserRepository`] provides it on Postgres, [`InMemoryUserStore`] in memory.

pub mod memory;
pub mod user;

pub use memory::InMemoryUserStore;
pub use user::{CredentialRecord, NewUser, UserAccount, UserRepository, UserStore};
