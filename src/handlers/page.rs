use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::error::PainCareError;
use crate::render::{Notice, render_page};

const EMPTY_INPUT_WARNING: &str = "กรุณาพิมพ์คำถามก่อนส่ง";
const BUSY_WARNING: &str = "กำลังรอคำตอบจากข้อความก่อนหน้า กรุณารอสักครู่";
const UPSTREAM_ERROR: &str = "ไม่สามารถติดต่อระบบประเมินได้ในขณะนี้ กรุณาลองใหม่อีกครั้ง";

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub query: String,
}

/// Every visit to `/` opens a fresh session
pub async fn start(State(state): State<AppState>) -> Redirect {
    let (id, _) = state.sessions.create().await;
    Redirect::to(&format!("/chat/{id}"))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.get(id).await {
        Ok(handle) => {
            let session = handle.lock().await;
            Html(render_page(id, session.history(), None)).into_response()
        }
        Err(_) => Redirect::to("/").into_response(),
    }
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<ChatForm>,
) -> Response {
    let handle = match state.sessions.get(id).await {
        Ok(handle) => handle,
        Err(_) => return Redirect::to("/").into_response(),
    };

    // Post/Redirect/Get: a browser refresh must not resubmit the form
    let (status, notice) = match state.chat.submit(&handle, &form.query).await {
        Ok(_) => return Redirect::to(&format!("/chat/{id}")).into_response(),
        Err(PainCareError::Validation(_)) => (
            StatusCode::OK,
            Notice::Warning(EMPTY_INPUT_WARNING.to_string()),
        ),
        Err(PainCareError::SessionBusy(_)) => (
            StatusCode::CONFLICT,
            Notice::Warning(BUSY_WARNING.to_string()),
        ),
        Err(e) => (e.status_code(), Notice::Error(UPSTREAM_ERROR.to_string())),
    };

    let session = handle.lock().await;
    (status, Html(render_page(id, session.history(), Some(&notice)))).into_response()
}
