//! Request gatekeeping: rate limit, API version, keys.
//!
//! Applied in this order, outermost first:
//!
//! 1. [`rate_limit`]: `rate_limit_error` once the limiter is exhausted
//! 2. [`require_version`]: `invalid_request_error` for a missing or
//!    unsupported `anthropic-version`
//! 3. [`require_admin`] / [`require_workspace`]: `authentication_error` for a
//!    missing or unknown `x-api-key`, `permission_error` when the key belongs
//!    to the other scope

use super::error::ApiError;
use super::AppState;
use admiral_core::headers::{
    is_supported_version, parse_betas, KeyScope, ANTHROPIC_BETA, ANTHROPIC_VERSION,
    SUPPORTED_VERSIONS, X_API_KEY,
};
use admiral_core::ErrorKind;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::{Choice, ConstantTimeEq};

// =============================================================================
// KEY RING
// =============================================================================

/// The API keys the server accepts, by scope.
#[derive(Default, Clone)]
pub struct KeyRing {
    admin: Vec<String>,
    workspace: Vec<String>,
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("admin", &self.admin.len())
            .field("workspace", &self.workspace.len())
            .finish()
    }
}

impl KeyRing {
    pub fn new(admin: Vec<String>, workspace: Vec<String>) -> Self {
        for (key, expected) in admin
            .iter()
            .map(|k| (k, KeyScope::Admin))
            .chain(workspace.iter().map(|k| (k, KeyScope::Workspace)))
        {
            if KeyScope::of(key) != Some(expected) {
                tracing::warn!(
                    scope = %expected,
                    "configured key lacks the usual prefix for its scope"
                );
            }
        }
        Self { admin, workspace }
    }

    /// Build from comma-separated lists, as found in the environment.
    pub fn from_lists(admin: &str, workspace: &str) -> Self {
        Self::new(split_keys(admin), split_keys(workspace))
    }

    pub fn is_empty(&self) -> bool {
        self.admin.is_empty() && self.workspace.is_empty()
    }

    /// Which scope `key` belongs to, if any.
    ///
    /// Every configured key is compared, each in constant time.
    pub fn scope_of(&self, key: &str) -> Option<KeyScope> {
        let matches = |keys: &[String]| {
            let mut hit = Choice::from(0);
            for known in keys {
                hit |= known.as_bytes().ct_eq(key.as_bytes());
            }
            bool::from(hit)
        };
        let admin = matches(&self.admin);
        let workspace = matches(&self.workspace);
        if admin {
            Some(KeyScope::Admin)
        } else if workspace {
            Some(KeyScope::Workspace)
        } else {
            None
        }
    }
}

fn split_keys(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Reject requests once the configured rate is exceeded.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            tracing::warn!(uri = %req.uri(), "rate limit exceeded");
            return Err(ApiError::new(
                ErrorKind::RateLimitError,
                "Number of requests has exceeded your rate limit",
            ));
        }
    }
    Ok(next.run(req).await)
}

/// Betas requested through `anthropic-beta`, attached to the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Betas(pub Vec<String>);

/// Require a supported `anthropic-version`; collect `anthropic-beta`.
pub async fn require_version(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let version = req
        .headers()
        .get(ANTHROPIC_VERSION)
        .map(|v| v.to_str().unwrap_or_default().to_string());
    match version.as_deref() {
        None => {
            return Err(ApiError::invalid(format!(
                "{}: header is required",
                ANTHROPIC_VERSION
            )));
        }
        Some(v) if !is_supported_version(v) => {
            return Err(ApiError::invalid(format!(
                "{}: '{}' is not a supported version (expected one of {})",
                ANTHROPIC_VERSION,
                v,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }
        Some(_) => {}
    }

    let betas = parse_betas(
        req.headers()
            .get_all(ANTHROPIC_BETA)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    );
    if !betas.is_empty() {
        tracing::debug!(betas = ?betas, "anthropic-beta");
    }
    req.extensions_mut().insert(Betas(betas));
    Ok(next.run(req).await)
}

fn authorize(state: &AppState, req: &Request, required: KeyScope) -> Result<(), ApiError> {
    let Some(key) = req.headers().get(X_API_KEY) else {
        return Err(ApiError::new(
            ErrorKind::AuthenticationError,
            format!("{}: header is required", X_API_KEY),
        ));
    };
    let key = key.to_str().unwrap_or_default();
    match state.keys.scope_of(key) {
        None => Err(ApiError::new(
            ErrorKind::AuthenticationError,
            "invalid x-api-key",
        )),
        Some(scope) if scope != required => Err(ApiError::new(
            ErrorKind::PermissionError,
            format!("this endpoint requires a {} key, got a {} key", required, scope),
        )),
        Some(_) => Ok(()),
    }
}

/// Organization endpoints: admin keys only.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, &req, KeyScope::Admin)?;
    Ok(next.run(req).await)
}

/// Message batch endpoints: workspace keys only.
pub async fn require_workspace(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, &req, KeyScope::Workspace)?;
    Ok(next.run(req).await)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use tower::ServiceExt;

    #[test]
    fn key_ring_resolves_scopes() {
        let ring = KeyRing::from_lists("sk-ant-admin01-a, sk-ant-admin01-b", "sk-ant-api03-w");
        assert_eq!(ring.scope_of("sk-ant-admin01-b"), Some(KeyScope::Admin));
        assert_eq!(ring.scope_of("sk-ant-api03-w"), Some(KeyScope::Workspace));
        assert_eq!(ring.scope_of("sk-ant-api03-other"), None);
        assert_eq!(ring.scope_of(""), None);
    }

    #[test]
    fn empty_lists_accept_nothing() {
        let ring = KeyRing::from_lists(" , ", "");
        assert!(ring.is_empty());
        assert_eq!(ring.scope_of("anything"), None);
    }

    fn betas_app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(Betas(betas)): Extension<Betas>| async move { betas.join("|") }),
            )
            .layer(middleware::from_fn(require_version))
    }

    #[tokio::test]
    async fn version_check_attaches_requested_betas() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(ANTHROPIC_VERSION, "2023-06-01")
            .header(ANTHROPIC_BETA, "message-batches-2024-09-24, other-beta")
            .header(ANTHROPIC_BETA, "other-beta")
            .body(Body::empty())
            .unwrap();
        let response = betas_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"message-batches-2024-09-24|other-beta");
    }

    #[tokio::test]
    async fn version_check_rejects_before_the_handler() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(ANTHROPIC_VERSION, "2020-01-01")
            .body(Body::empty())
            .unwrap();
        let response = betas_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
