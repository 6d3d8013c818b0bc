pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gcp;
pub mod models;
pub mod reporting;
pub mod utils;
