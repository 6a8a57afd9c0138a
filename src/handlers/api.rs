use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::Result;
use crate::render::{DisplayUnit, render, render_history};
use crate::session::{ConversationSession, SessionState};

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<DisplayUnit>,
}

impl SessionView {
    fn from_session(session: &ConversationSession) -> Self {
        Self {
            id: session.id(),
            state: session.state(),
            created_at: session.created_at(),
            messages: render_history(session.history()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub reply: DisplayUnit,
    pub history_len: usize,
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let (_, handle) = state.sessions.create().await;
    let view = SessionView::from_session(&*handle.lock().await);
    (StatusCode::CREATED, Json(view))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let handle = state.sessions.get(id).await?;
    let view = SessionView::from_session(&*handle.lock().await);
    Ok(Json(view))
}

pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    let handle = state.sessions.get(id).await?;
    let turn = state.chat.submit(&handle, &request.content).await?;
    let history_len = handle.lock().await.history().len();
    Ok(Json(SubmitResponse {
        reply: render(&turn),
        history_len,
    }))
}

pub async fn discard_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.discard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
