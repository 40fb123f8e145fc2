use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    get_me, get_sessions, login_user, logout, logout_all, refresh_token, register_user,
    verify_token,
};
use crate::state::AppState;

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(get_me))
        .route("/verify", post(verify_token))
        .route("/sessions", get(get_sessions))
}
