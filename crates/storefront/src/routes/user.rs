//! Account routes: session check, profile and saved delivery addresses.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use balance_botanica_core::AddressId;

use crate::error::Result;
use crate::extract::AppJson;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{DeliveryAddress, NewAddress, ProfileUpdate, User};
use crate::state::AppState;

/// Whether the caller is signed in, and as whom.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl SessionResponse {
    #[must_use]
    pub const fn signed_in(user: User) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }
}

/// GET /api/user/session-check
pub async fn session_check(OptionalAuth(current): OptionalAuth) -> Json<SessionResponse> {
    Json(current.map_or_else(SessionResponse::anonymous, |s| {
        SessionResponse::signed_in(s.user)
    }))
}

/// GET /api/user/profile
pub async fn profile(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}

/// Update names and phone.
///
/// PUT /api/user/profile
///
/// # Errors
///
/// 400 on an empty or overlong name or an invalid phone number.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<User>> {
    let user = state.users().update_profile(&user.id, update).await?;
    Ok(Json(user))
}

/// GET /api/user/addresses
///
/// # Errors
///
/// 500 on storage failure.
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<DeliveryAddress>>> {
    Ok(Json(state.users().list_addresses(&user.id).await?))
}

/// POST /api/user/addresses
///
/// # Errors
///
/// 400 on invalid fields.
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(address): AppJson<NewAddress>,
) -> Result<(StatusCode, Json<DeliveryAddress>)> {
    let address = state.users().add_address(&user.id, address).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// DELETE /api/user/addresses/{id}
///
/// # Errors
///
/// 404 if the address is not one of the caller's.
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    state.users().delete_address(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
