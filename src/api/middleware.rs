//! API Middleware
//!
//! Session authentication and request logging middleware. Sessions and
//! users are owned by the auth subsystem; this service only resolves
//! tokens against them.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the opaque session token
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Authenticated caller resolved from a session token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl CurrentUser {
    /// True when the caller is `user_id` or an administrator.
    pub fn can_act_for(&self, user_id: Uuid) -> bool {
        self.is_admin || self.user_id == user_id
    }
}

/// Lowercase hex SHA-256, matching the encoding stored in sessions.token_hash
pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// =========================================================================
// Session Authentication Middleware
// =========================================================================

/// Extract and validate the session token from the X-Session-Token header
pub async fn auth_middleware(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    // Extract session token
    let token = match headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(token) => token,
        None => return Err(AppError::Unauthenticated.into_response()),
    };

    // The plaintext token never reaches the database; only its hash does
    let token_hash = sha256_hex(token);

    let session: Option<(Uuid, bool)> = match sqlx::query_as(
        r#"
        SELECT u.id, u.is_admin
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Database error during session validation: {}", e);
            return Err(AppError::Database(e).into_response());
        }
    };

    let (user_id, is_admin) = match session {
        Some(session) => session,
        None => return Err(AppError::InvalidSession.into_response()),
    };

    // Store the authenticated caller in request extensions
    request.extensions_mut().insert(CurrentUser { user_id, is_admin });

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "x-session-token",
    "authorization",
    "cookie",
    "set-cookie",
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    // Mask sensitive headers
    let headers = mask_headers_for_logging(request.headers());

    // Client-supplied correlation ID, if any
    let correlation_id = request
        .headers()
        .get("X-Correlation-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let start = std::time::Instant::now();

    // Log request
    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    // Process request
    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    // Log response
    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
