pub mod types;
pub mod classification;

pub use types::PatchyError;
pub use classification::ErrorClassification;
