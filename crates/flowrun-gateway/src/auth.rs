use flowrun_core::config::GatewayConfig;

/// Result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The matching key's name, `legacy-token`, or `anonymous`.
    pub name: String,
}

/// Bearer token -> api_keys -> legacy token. Anonymous when no credential
/// is configured.
///
/// Returns `None` on auth failure.
pub fn validate_auth(config: &GatewayConfig, bearer: Option<&str>) -> Option<AuthResult> {
    if !config.auth_enabled() {
        return Some(AuthResult {
            name: "anonymous".into(),
        });
    }

    let bearer = bearer?;
    if let Some(ak) = config.api_keys.iter().find(|ak| ak.key == bearer) {
        return Some(AuthResult {
            name: ak.name.clone(),
        });
    }
    if config.token.as_deref() == Some(bearer) {
        return Some(AuthResult {
            name: "legacy-token".into(),
        });
    }
    None
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}
