use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

use super::token::TokenSource;
use crate::errors::PatchyError;
use crate::utils::truncation::truncate_error;

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Attach the current bearer token from `credential`.
pub(crate) async fn authorize(
    request: RequestBuilder,
    credential: &dyn TokenSource,
) -> Result<RequestBuilder, PatchyError> {
    let token = credential.token().await?;
    Ok(request.bearer_auth(token.value))
}

/// Pass 2xx responses through; turn everything else into `PatchyError::Api`.
pub(crate) async fn check_response(
    service: &'static str,
    resp: Response,
) -> Result<Response, PatchyError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(PatchyError::Api {
        service,
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// `STATUS: message` from a Google error envelope, or the raw body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(status) => format!("{}: {}", status, env.error.message),
            None => env.error.message,
        },
        Err(_) => truncate_error(body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":403,"message":"Permission 'osconfig.patchJobs.exec' denied","status":"PERMISSION_DENIED"}}"#;
        let msg = error_message(body);
        assert!(msg.starts_with("PERMISSION_DENIED: "));
        assert!(msg.contains("osconfig.patchJobs.exec"));
    }

    #[test]
    fn test_error_message_raw_body() {
        assert_eq!(error_message("  upstream connect error  "), "upstream connect error");
    }
}
