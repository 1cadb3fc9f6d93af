//! WILMA client library.
//!
//! Session handling, the authenticated request gateway, typed API surfaces
//! for the main backend and the forecasting service, and the optimistic
//! vote controller.

pub mod api;
pub mod error;
pub mod events;
pub mod gateway;
pub mod polls;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::ClientError;
pub use events::{EventBus, NoticeLevel, SessionEvent};
pub use gateway::{ApiRequest, ApiResponse, Gateway, Service, Upload};
pub use session::{Principal, Session, SessionStore};
