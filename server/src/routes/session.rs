use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware::from_fn, Extension, Router};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::session_handlers::{
    activate_poster, download, generate, get_ratios, get_session, select_ratio, set_prompt,
    translate, upload,
};
use crate::middleware::session_middleware::{require_session, session_middleware};
use crate::state::AppState;

pub fn session_routes() -> Router {
    let actions = Router::new()
        .route("/session/upload", post(upload))
        .route("/session/ratio", post(select_ratio))
        .route("/session/prompt", post(set_prompt))
        .route("/session/generate", post(generate))
        .route("/session/translate", post(translate))
        .route("/session/posters/{posterId}/activate", post(activate_poster))
        .route("/session/download", get(download))
        .layer(from_fn(require_session));

    Router::new()
        // the only route that starts sessions
        .route("/session", get(get_session))
        .layer(from_fn(session_middleware))
        .merge(actions)
        // the catalog needs no session
        .route("/ratios", get(get_ratios))
}

pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/api", session_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CookieManagerLayer::new())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
