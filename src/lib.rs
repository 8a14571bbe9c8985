pub mod assertion;
pub mod case;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod logger;
pub mod placeholder;
pub mod report;
pub mod runner;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, RucaseError};
