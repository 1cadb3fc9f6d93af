//! Client-held session: credentials plus the authenticated principal.

mod model;
mod store;

pub use model::{ADMIN_ROLE, LoginRequest, Principal, RefreshRequest, RefreshResponse, Session};
pub use store::{SESSION_KEY, SessionStore};
