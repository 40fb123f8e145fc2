use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{cleanup_sessions, get_session_stats, revoke_user_sessions};
use crate::state::AppState;

pub fn init_admin_router() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/revoke", post(revoke_user_sessions))
        .route("/cleanup", post(cleanup_sessions))
        .route("/sessions/stats", get(get_session_stats))
}
