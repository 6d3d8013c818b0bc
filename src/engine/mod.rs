pub mod credentials;
pub mod driver;
pub mod executor;
pub mod prober;
pub mod state;
pub mod templater;

pub use credentials::{load_static, CredentialSource, StaticCredential};
pub use driver::{DriverOptions, ExploitationDriver};
pub use prober::PrivilegeProber;
pub use state::{AuditScope, DriverState};
pub use templater::{RequestTemplater, TemplateValues};
