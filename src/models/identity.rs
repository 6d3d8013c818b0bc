use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::gcp::token::TokenSource;

/// A principal the run can act as.
#[derive(Clone)]
pub struct Identity {
    /// Service account email.
    pub email: String,
    pub credential: Arc<dyn TokenSource>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(email: impl Into<String>, credential: Arc<dyn TokenSource>) -> Self {
        Self {
            email: email.into(),
            credential,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// Credentials stay out of Debug output.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// The project the run operates in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_id: String,
}

impl ProjectContext {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into() }
    }

    /// `projects/<id>`, the form every API here takes as parent or scope.
    pub fn resource_name(&self) -> String {
        format!("projects/{}", self.project_id)
    }
}
