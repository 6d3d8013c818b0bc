use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::errors::PatchyError;

/// An OAuth2 bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { value: value.into(), expires_at }
    }

    /// True if the token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at.map_or(false, |exp| exp - margin <= Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &crate::config::credentials::redact_token(&self.value))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Wire shape of an OAuth2 token response (metadata server and token endpoint alike).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> Result<AccessToken, PatchyError> {
        if let Some(kind) = &self.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(PatchyError::Credential(format!("unsupported token type: {}", kind)));
            }
        }
        let expires_at = self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(AccessToken::new(self.access_token, expires_at))
    }
}

/// Anything that can hand out a current bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<AccessToken, PatchyError>;
}

/// Wraps a token that was fetched ahead of time.
pub struct StaticTokenSource {
    token: AccessToken,
}

impl StaticTokenSource {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<AccessToken, PatchyError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_sets_expiry() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        let token = resp.into_access_token().unwrap();
        assert_eq!(token.value, "ya29.abc");
        assert!(!token.expires_within(Duration::minutes(5)));
        assert!(token.expires_within(Duration::hours(2)));
    }

    #[test]
    fn test_token_response_rejects_non_bearer() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"x","token_type":"MAC"}"#).unwrap();
        assert!(resp.into_access_token().is_err());
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::new("ya29.very-secret-token-value", None);
        let dbg = format!("{:?}", token);
        assert!(!dbg.contains("very-secret-token-value"));
    }

    #[tokio::test]
    async fn test_static_source_returns_wrapped_token() {
        let source = StaticTokenSource::new(AccessToken::new("ya29.t", None));
        assert_eq!(source.token().await.unwrap().value, "ya29.t");
    }
}
