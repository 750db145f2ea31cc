use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Json},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use poster_fusion_cli::SessionController;
use serde_json::json;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "pfsession";

fn cookies_of(req: &Request<Body>) -> Result<Cookies, Response> {
    req.extensions().get::<Cookies>().cloned().ok_or_else(|| {
        (StatusCode::INTERNAL_SERVER_ERROR, "Cookie manager missing").into_response()
    })
}

fn existing_session(state: &AppState, cookies: &Cookies) -> Option<Arc<SessionController>> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .and_then(|id| state.touch(&id))
}

// Entry point of the app: resolves the caller's poster session from its
// cookie, starting one (and setting the cookie) when missing or expired.
pub async fn session_middleware(
    Extension(state): Extension<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let cookies = match cookies_of(&req) {
        Ok(c) => c,
        Err(response) => return response,
    };

    let controller = match existing_session(&state, &cookies) {
        Some(controller) => controller,
        None => {
            let Some((id, controller)) = state.create() else {
                warn!(live = state.sessions.len(), "session limit reached");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "message": "Too many active sessions. Please try again later." })),
                )
                    .into_response();
            };
            debug!(session = %id, "created poster session");
            cookies.add(
                Cookie::build((SESSION_COOKIE, id.to_string()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .build(),
            );
            controller
        }
    };

    req.extensions_mut().insert(controller);
    next.run(req).await
}

// Session actions only run against a session started by `GET /api/session`.
pub async fn require_session(
    Extension(state): Extension<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let cookies = match cookies_of(&req) {
        Ok(c) => c,
        Err(response) => return response,
    };

    match existing_session(&state, &cookies) {
        Some(controller) => {
            req.extensions_mut().insert(controller);
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Your session has expired. Please reload the page." })),
        )
            .into_response(),
    }
}
