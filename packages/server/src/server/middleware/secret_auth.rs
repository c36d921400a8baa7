//! Shared-secret check for machine-to-machine endpoints (cron triggers,
//! operator retries).

use axum::http::HeaderMap;

use crate::server::error::ApiError;

pub const AUTOMATION_SECRET_HEADER: &str = "x-automation-secret";

/// Require the shared secret when one is configured.
///
/// With no secret configured the endpoints are open (local development);
/// with one configured, a missing or mismatched header is rejected before
/// any queue state is touched.
pub fn verify_shared_secret(
    configured: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let Some(expected) = configured else {
        return Ok(());
    };

    let presented = headers
        .get(AUTOMATION_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}
