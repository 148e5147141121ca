/*!
 * Core Module
 * Fundamental kernel types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod task;
pub mod types;

// Re-export for convenience
pub use config::KernelConfig;
pub use errors::*;
pub use types::*;
