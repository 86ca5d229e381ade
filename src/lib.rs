// Scriptkit - a CSV grade report and an S3 bucket inspector

pub mod analysis;
pub mod config;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use types::{AppError, AppResult};
