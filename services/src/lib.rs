pub mod assignment_engine;
pub mod assignment_service;
pub mod audit_service;
pub mod auth;
pub mod email;
pub mod error;
pub mod notification_service;
pub mod period_service;
pub mod preference_service;
pub mod qualification;

#[cfg(test)]
mod test_support;

pub use error::{SelectionError, SelectionResult};
