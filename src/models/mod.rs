pub mod finding;
pub mod identity;
pub mod patch;
pub mod report;

pub use finding::*;
pub use identity::*;
pub use patch::*;
pub use report::*;
