//! `WILMA` Core Library
//!
//! Shared functionality for `WILMA` components:
//! - Settings resolution (defaults, settings file, environment)
//! - Durable key-value local storage
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod storage;
pub mod tracing_init;

pub use config::Settings;
pub use error::{Error, Result};
pub use storage::{FileStorage, MemoryStorage, Storage};
