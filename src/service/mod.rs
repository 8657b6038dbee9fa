//! Service layer for the in-house bot
//!
//! Application state, health checks and the line-oriented command console
//! that stands in for the chat platform.

pub mod app;
pub mod console;
pub mod health;

pub use app::{AppState, ServiceError};
pub use console::{execute, Command, Reply};
pub use health::{HealthCheck, HealthStatus};
