pub mod config;
pub mod error;
pub mod suite;
pub mod types;
