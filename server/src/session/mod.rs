//! Single-use session codes handed to the calling app in place of raw tokens.
//!
//! A code is minted once the provider exchange completes, and it resolves to the
//! stored [`Credentials`] exactly once. Entries that are never claimed are evicted by
//! the periodic sweep in [`crate::cron`].

mod code;
mod store;

pub use code::generate_session_code;
pub use store::{Credentials, InMemorySessionStore, SessionStore, DEFAULT_SESSION_TTL_SECS};
