use super::*;
use crate::error::Result;
use crate::models::{ChatMessage, Choice, GroqRequest, GroqResponse};
use crate::render::NOT_SPECIFIED;
use crate::session::GREETING;
use crate::transport::Transport;

use async_trait::async_trait;
use axum::http::{Method, header};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Mutex;
use tower::ServiceExt;

// Answers every request with the same content, or fails if none is set
struct MockTransport {
    content: Option<String>,
    calls: Mutex<usize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn chat(&self, _req: &GroqRequest) -> Result<GroqResponse> {
        *self.calls.lock().unwrap() += 1;
        match &self.content {
            Some(content) => Ok(GroqResponse {
                choices: vec![Choice {
                    message: ChatMessage {
                        role: "assistant".to_string(),
                        content: content.clone(),
                    },
                }],
                usage: None,
            }),
            None => Err(PainCareError::Upstream {
                status: 503,
                body: "upstream-secret-detail".to_string(),
            }),
        }
    }
}

fn test_state(content: Option<&str>) -> (AppState, Arc<MockTransport>) {
    let mock = Arc::new(MockTransport {
        content: content.map(str::to_string),
        calls: Mutex::new(0),
    });
    let chat = ChatService::new(mock.clone(), "test-model".to_string());
    (AppState::new(chat), mock)
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state(None);
    let response = router(state, None)
        .oneshot(json_request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_api_end_to_end_conversation() {
    let content = r#"{"pain_level":"No pain","management":"ไม่ต้องให้ยาเพิ่มเติม เพียงติดตาม","reason":"ไม่มีสัญญาณปวด"}"#;
    let (state, _) = test_state(Some(content));
    let app = router(state, None);

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/sessions", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["messages"].as_array().unwrap().len(), 1);
    assert_eq!(created["messages"][0]["text"], GREETING);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/sessions/{id}/messages"),
            Some(json!({"content": "ผู้ป่วยหายใจปกติ ไม่มีอาการปวด"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = body_json(response).await;
    assert_eq!(submitted["history_len"], 3);
    assert_eq!(submitted["reply"]["kind"], "assessment");

    let response = app
        .clone()
        .oneshot(json_request(Method::GET, &format!("/api/sessions/{id}"), None))
        .await
        .unwrap();
    let view = body_json(response).await;
    let messages = view["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(view["state"], "idle");
    assert_eq!(messages[1]["kind"], "user_text");
    assert_eq!(messages[1]["text"], "ผู้ป่วยหายใจปกติ ไม่มีอาการปวด");
    assert_eq!(messages[2]["fields"][0]["value"], "No pain");
    assert_eq!(messages[2]["fields"][3]["value"], NOT_SPECIFIED);
}

#[tokio::test]
async fn test_api_blank_message_is_bad_request() {
    let (state, mock) = test_state(Some("unused"));
    let (id, handle) = state.sessions.create().await;
    let app = router(state, None);

    let response = app
        .oneshot(json_request(
            Method::POST,
            &format!("/api/sessions/{id}/messages"),
            Some(json!({"content": "   "})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
    assert_eq!(*mock.calls.lock().unwrap(), 0);
    assert_eq!(handle.lock().await.history().len(), 1);
}

#[tokio::test]
async fn test_api_upstream_failure_is_bad_gateway() {
    let (state, _) = test_state(None);
    let (id, handle) = state.sessions.create().await;
    let app = router(state, None);

    let response = app
        .oneshot(json_request(
            Method::POST,
            &format!("/api/sessions/{id}/messages"),
            Some(json!({"content": "ปวดท้อง"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("503"));
    assert!(!error.contains("upstream-secret-detail"));
    assert_eq!(handle.lock().await.history().len(), 1);
}

#[tokio::test]
async fn test_api_unknown_and_discarded_sessions() {
    let (state, _) = test_state(None);
    let app = router(state, None);
    let missing = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request(Method::GET, &format!("/api/sessions/{missing}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let created = body_json(
        app.clone()
            .oneshot(json_request(Method::POST, "/api/sessions", None))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(Method::DELETE, &format!("/api/sessions/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request(Method::GET, &format!("/api/sessions/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_bearer_token_required() {
    let (state, _) = test_state(None);
    let app = router(state, Some("secret".to_string()));

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/sessions", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = json_request(Method::POST, "/api/sessions", None);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/sessions?token=secret", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // the page and health stay open
    let response = app
        .oneshot(json_request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_page_start_redirects_to_new_session() {
    let (state, _) = test_state(None);
    let sessions = Arc::clone(&state.sessions);
    let app = router(state, None);

    let response = app
        .oneshot(json_request(Method::GET, "/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/chat/"));
    assert_eq!(sessions.len().await, 1);
}

#[tokio::test]
async fn test_page_submit_redirects_then_renders_assessment() {
    let content = r#"{"pain_level":"Severe pain","management":"X","reason":"Y"}"#;
    let (state, mock) = test_state(Some(content));
    let (id, handle) = state.sessions.create().await;
    let app = router(state, None);

    let response = app
        .clone()
        .oneshot(form_request(
            &format!("/chat/{id}"),
            "query=%E0%B8%9B%E0%B8%A7%E0%B8%94",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(location, format!("/chat/{id}"));

    // following the redirect (and reloading it) never calls the model again
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(Method::GET, &location, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_string(response).await;
        assert!(page.contains(GREETING));
        assert!(page.contains("Severe pain"));
        assert!(page.contains(NOT_SPECIFIED));
    }
    assert_eq!(*mock.calls.lock().unwrap(), 1);
    assert_eq!(handle.lock().await.history().len(), 3);
}

#[tokio::test]
async fn test_page_start_is_bounded_by_session_limit() {
    let (state, _) = test_state(None);
    let sessions = Arc::new(SessionStore::with_limits(
        std::time::Duration::from_secs(3600),
        25,
    ));
    let state = AppState::with_sessions(state.chat, Arc::clone(&sessions));
    let app = router(state, Some("secret".to_string()));

    for _ in 0..500 {
        let response = app
            .clone()
            .oneshot(json_request(Method::GET, "/", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    assert_eq!(sessions.len().await, 25);
}

#[tokio::test]
async fn test_expired_session_page_redirects_home() {
    let (state, _) = test_state(None);
    let sessions = Arc::new(SessionStore::with_limits(std::time::Duration::ZERO, 10));
    let (id, _) = sessions.create().await;
    let app = router(AppState::with_sessions(state.chat, sessions), None);

    let response = app
        .oneshot(json_request(Method::GET, &format!("/chat/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_page_blank_submit_shows_warning() {
    let (state, mock) = test_state(Some("unused"));
    let (id, handle) = state.sessions.create().await;
    let app = router(state, None);

    let response = app
        .oneshot(form_request(&format!("/chat/{id}"), "query=+++"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("กรุณาพิมพ์คำถามก่อนส่ง"));
    assert_eq!(*mock.calls.lock().unwrap(), 0);
    assert_eq!(handle.lock().await.history().len(), 1);
}

#[tokio::test]
async fn test_page_upstream_failure_shows_error_notice() {
    let (state, _) = test_state(None);
    let (id, handle) = state.sessions.create().await;
    let app = router(state, None);

    let response = app
        .oneshot(form_request(&format!("/chat/{id}"), "query=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let page = body_string(response).await;
    assert!(page.contains("notice error"));
    assert_eq!(handle.lock().await.history().len(), 1);
}

#[tokio::test]
async fn test_page_unknown_session_redirects_home() {
    let (state, _) = test_state(None);
    let app = router(state, None);

    let response = app
        .oneshot(json_request(
            Method::GET,
            &format!("/chat/{}", uuid::Uuid::new_v4()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}
