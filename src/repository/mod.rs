//! User storage abstraction and data types.
//!
//! The gateway consumes user accounts through [`UserRepository`]; plug in a
//! database-backed implementation or use [`InMemoryUserRepository`].

mod memory;
mod user;

pub use memory::InMemoryUserRepository;
pub use user::{Credentials, NewUser, User, UserRepository};
