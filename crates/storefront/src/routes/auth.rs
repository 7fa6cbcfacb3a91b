//! Storefront authentication status.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::epcc::AuthStatus;
use crate::state::AppState;

/// Token status as shown in the storefront banner.
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub status: AuthStatus,
    /// Expiry of the current token as Unix epoch seconds.
    pub expires: Option<i64>,
}

/// Report the storefront token status, obtaining a token if none has been
/// requested yet.
pub async fn status(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    let auth = state.client().authenticator();

    let mut status = auth.status().await;
    if status == AuthStatus::Unknown {
        status = auth.initialize().await;
    }
    let expires = auth.credentials().await.map(|token| token.expires);

    Json(AuthStatusResponse {
        authenticated: status.is_authenticated(),
        status,
        expires,
    })
}
