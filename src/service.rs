use std::sync::Arc;

use crate::assessment::Reply;
use crate::config::Config;
use crate::error::{PainCareError, Result};
use crate::models::GroqRequest;
use crate::prompt::build_request;
use crate::session::{SessionHandle, Turn};
use crate::transport::{GroqTransport, Transport};

/// Drives one submission: validate, compose, call the model, append the pair
#[derive(Clone)]
pub struct ChatService {
    tx: Arc<dyn Transport>,
    model: String,
}

impl ChatService {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self { tx, model }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let transport = GroqTransport::new(
            cfg.groq.api_key.clone(),
            cfg.groq.api_url.clone(),
            cfg.request_timeout(),
        )?;
        Ok(Self::new(Arc::new(transport), cfg.groq.model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Submit `text` to the session and return the assistant turn that was appended.
    ///
    /// Blank input is rejected before anything is composed. On a failed call the
    /// history is left exactly as it was and the session is Idle again.
    pub async fn submit(&self, session: &SessionHandle, text: &str) -> Result<Turn> {
        let query = text.trim();
        if query.is_empty() {
            return Err(PainCareError::Validation(
                "Message must not be empty".to_string(),
            ));
        }

        let session_id = {
            let mut guard = session.lock().await;
            guard.begin_submit()?;
            guard.id()
        };
        tracing::info!(%session_id, chars = query.chars().count(), "Submitting symptom description");

        let request = build_request(&self.model, query);
        let query = query.to_string();
        let tx = Arc::clone(&self.tx);
        let session = Arc::clone(session);

        // Detached so a dropped HTTP request cannot leave the session Awaiting.
        let task = tokio::spawn(async move {
            let result = complete(tx.as_ref(), &request).await;

            let mut guard = session.lock().await;
            guard.finish_submit();
            match result {
                Ok(answer) => {
                    tracing::info!(
                        %session_id,
                        structured = Reply::parse(&answer).is_structured(),
                        "Assessment reply received"
                    );
                    guard.append_user_turn(query);
                    guard.append_assistant_turn(answer.clone());
                    Ok(Turn::assistant(answer))
                }
                Err(e) => {
                    tracing::warn!(%session_id, "Inference call failed: {}", e);
                    Err(e)
                }
            }
        });

        task.await
            .map_err(|e| PainCareError::Internal(format!("Submission task failed: {e}")))?
    }
}

async fn complete(tx: &dyn Transport, request: &GroqRequest) -> Result<String> {
    let response = tx.chat(request).await?;
    if let Some(usage) = response.usage {
        tracing::debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Groq usage"
        );
    }
    match response.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content.trim().to_string()),
        None => Err(PainCareError::Internal(
            "Groq API returned empty choices".to_string(),
        )),
    }
}
