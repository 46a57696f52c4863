//! Server-side sessions: a cookie holds an opaque id, the `sessions` table
//! holds the principal token and expiry.

pub mod codec;
pub mod store;

pub use codec::{PrincipalToken, Rehydrated, SessionCodec};
pub use store::{spawn_pruner, PgSessionStore, SessionId, SessionStore};
