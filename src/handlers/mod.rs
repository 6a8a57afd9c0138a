//! HTTP surface: the chat page, the JSON API and health

pub mod api;
pub mod page;

#[cfg(test)]
mod test_handlers;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::PainCareError;
use crate::service::ChatService;
use crate::session::SessionStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self::with_sessions(chat, Arc::new(SessionStore::new()))
    }

    pub fn with_sessions(chat: ChatService, sessions: Arc<SessionStore>) -> Self {
        Self { sessions, chat }
    }
}

pub fn router(state: AppState, bearer_token: Option<String>) -> Router {
    let mut api = Router::new()
        .route("/sessions", post(api::create_session))
        .route(
            "/sessions/:id",
            get(api::get_session).delete(api::discard_session),
        )
        .route("/sessions/:id/messages", post(api::submit_message));
    if let Some(expected) = bearer_token {
        api = api.route_layer(middleware::from_fn_with_state(
            Arc::new(expected),
            require_bearer,
        ));
    }

    Router::new()
        .route("/", get(page::start))
        .route("/chat/:id", get(page::show).post(page::submit))
        .nest("/api", api)
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let headers: &HeaderMap = req.headers();
    let header_ok = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()));

    // Fallback for clients that cannot set headers: ?access_token= or ?token=
    let query_ok = req.uri().query().is_some_and(|q| {
        q.split('&').any(|pair| {
            pair.split_once('=').is_some_and(|(k, v)| {
                (k == "access_token" || k == "token") && v == expected.as_str()
            })
        })
    });

    if !(header_ok || query_ok) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

impl PainCareError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PainCareError::Validation(_) => StatusCode::BAD_REQUEST,
            PainCareError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            PainCareError::SessionBusy(_) => StatusCode::CONFLICT,
            PainCareError::Upstream { .. } | PainCareError::Http(_) | PainCareError::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
            PainCareError::Config(_) | PainCareError::Io(_) | PainCareError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to clients; upstream bodies stay in the log
    pub fn public_message(&self) -> String {
        match self {
            PainCareError::Upstream { status, .. } => {
                format!("Assessment service unavailable (Groq API returned {status})")
            }
            PainCareError::Http(_) | PainCareError::Json(_) => {
                "Assessment service unavailable".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for PainCareError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
