use tracing::debug;

/// Resolve a config value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved value from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

/// Mask a bearer token, keeping a short prefix so tokens can still be told apart in logs.
pub fn redact_token(token: &str) -> String {
    const VISIBLE: usize = 8;
    if token.chars().count() <= VISIBLE * 2 {
        return "[REDACTED]".to_string();
    }
    let prefix: String = token.chars().take(VISIBLE).collect();
    format!("{}...[REDACTED]", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_credential_literal() {
        assert_eq!(resolve_credential("drop-bucket"), "drop-bucket");
    }

    #[test]
    fn test_resolve_credential_env_var() {
        std::env::set_var("TEST_PATCHY_CRED", "secret123");
        assert_eq!(resolve_credential("$TEST_PATCHY_CRED"), "secret123");
        std::env::remove_var("TEST_PATCHY_CRED");
    }

    #[test]
    fn test_resolve_credential_missing_env_var() {
        let result = resolve_credential("$NONEXISTENT_PATCHY_VAR");
        assert_eq!(result, "$NONEXISTENT_PATCHY_VAR");
    }

    #[test]
    fn test_redact_token_keeps_prefix() {
        let redacted = redact_token("ya29.a0AfH6SMBx-long-secret-part");
        assert_eq!(redacted, "ya29.a0A...[REDACTED]");
    }

    #[test]
    fn test_redact_short_token_fully() {
        assert_eq!(redact_token("short"), "[REDACTED]");
    }
}
