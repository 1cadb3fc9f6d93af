//! Authenticated request gateway.
//!
//! Attaches bearer credentials to outgoing requests, recovers from an
//! expired access token with a single-flight refresh plus one retry, and
//! expires the session when recovery is impossible.

mod client;
mod request;

#[cfg(test)]
mod tests;

pub use client::Gateway;
pub use request::{ApiRequest, ApiResponse, Attempt, Body, Service, Upload};
