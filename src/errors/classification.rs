use super::types::PatchyError;

/// Marker Google APIs put in the error status of an authorization failure.
const PERMISSION_DENIED_MARKER: &str = "PERMISSION_DENIED";

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    /// Recoverable errors end the attempt for one identity, not the run.
    pub recoverable: bool,
}

impl PatchyError {
    /// True when the error is an authorization-denied response from a Google API.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            PatchyError::Api { status, message, .. } => {
                *status == 403 || message.contains(PERMISSION_DENIED_MARKER)
            }
            _ => false,
        }
    }

    /// Classify this error to decide whether the run can move on to the next identity.
    pub fn classify(&self) -> ErrorClassification {
        if self.is_permission_denied() {
            return ErrorClassification {
                error_type: "PermissionDenied",
                recoverable: true,
            };
        }

        let error_type = match self {
            PatchyError::NotInCloudEnvironment(_) => "NotInCloudEnvironment",
            PatchyError::Config(_) => "ConfigError",
            PatchyError::Credential(_) => "CredentialError",
            PatchyError::Metadata(_) => "MetadataError",
            PatchyError::Template(_) => "TemplateError",
            PatchyError::ObjectStore(_) => "ObjectStoreError",
            PatchyError::Api { .. } => "ApiError",
            PatchyError::UnexpectedStatus { .. } => "UnexpectedStatus",
            PatchyError::Network(_) => "NetworkError",
            PatchyError::Cancelled => "Cancelled",
            PatchyError::Io(_) => "IoError",
            PatchyError::Json(_) => "JsonError",
            PatchyError::Yaml(_) => "YamlError",
            PatchyError::Internal(_) => "InternalError",
        };

        ErrorClassification {
            error_type,
            recoverable: false,
        }
    }

    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PatchyError::Config(_) | PatchyError::Yaml(_) => 2,
            PatchyError::NotInCloudEnvironment(_) | PatchyError::Metadata(_) => 3,
            PatchyError::Credential(_) => 4,
            PatchyError::Cancelled => 130,
            _ => 1,
        }
    }
}
