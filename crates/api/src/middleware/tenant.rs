//! Tenant context extractor.
//!
//! Authentication happens upstream: the gateway validates the caller and
//! forwards the resolved tenant in `x-client-id` (and optionally the acting
//! user in `x-user-id`). This service trusts those headers completely and
//! only refuses requests that arrive without a tenant.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pixora_core::error::CoreError;
use pixora_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Tenant (and optional acting user) for the current request.
///
/// Use this as an extractor parameter in any handler that operates on
/// tenant-owned data:
///
/// ```ignore
/// async fn my_handler(client: ClientContext) -> AppResult<Json<()>> {
///     tracing::info!(client_id = client.client_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// The tenant's internal database id (from `x-client-id`).
    pub client_id: DbId,
    /// The acting user within the tenant, when the gateway forwards one.
    pub user_id: Option<DbId>,
}

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let client_id = header_id(parts, "x-client-id")?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing x-client-id header".into()))
        })?;

        let user_id = header_id(parts, "x-user-id")?;

        Ok(ClientContext { client_id, user_id })
    }
}

/// Read an optional numeric id header, rejecting malformed values.
fn header_id(parts: &Parts, name: &'static str) -> Result<Option<DbId>, AppError> {
    let Some(raw) = parts.headers.get(name).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    raw.parse::<DbId>().map(Some).map_err(|_| {
        AppError::Core(CoreError::Unauthorized(format!(
            "Invalid {name} header: expected a numeric id"
        )))
    })
}
