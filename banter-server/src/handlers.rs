use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{error, info};

use banter_core::session::{Conversation, ConversationTurn};
use banter_relay::RelayEvent;
use banter_store::SessionRow;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_name: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub session_id: String,
    pub conversation: Option<Vec<ConversationTurn>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub api_key: String,
}

pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    if payload.session_name.trim().is_empty() {
        return Err(ApiError::Validation("Session name is required".to_string()));
    }

    let session_id = state.store.create_session(&payload.session_name).await?;
    info!("Created session {} ({})", session_id, payload.session_name);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    ))
}

pub async fn list_sessions_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionRow>>, ApiError> {
    Ok(Json(state.store.list_sessions().await?))
}

pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionRow>, ApiError> {
    state
        .store
        .get_session(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

pub async fn update_session_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.session_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "Session ID and conversation are required".to_string(),
        ));
    }
    let conversation = payload.conversation.ok_or_else(|| {
        ApiError::Validation("Session ID and conversation are required".to_string())
    })?;

    let data = Conversation { conversation }
        .encode()
        .map_err(banter_store::StoreError::from)?;

    let updated = state
        .store
        .update_session(&payload.session_id, &data)
        .await?;
    if !updated {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Relay a chat message to the upstream completion API, re-framing its
/// token stream as `data: <fragment>` events terminated by `data: [DONE]`.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // No credential, no upstream call.
    if payload.api_key.trim().is_empty() {
        return Err(ApiError::Validation("API Key is required".to_string()));
    }

    let upstream = state
        .relay
        .chat_stream(&payload.api_key, &payload.message)
        .await?;

    let stream = upstream.map(|event| {
        let frame = match event {
            Ok(RelayEvent::Delta(text)) => Event::default().data(text),
            Ok(RelayEvent::Done) => Event::default().data("[DONE]"),
            Err(e) => {
                // Headers are already committed; surface the failure as an
                // inline fragment and let the stream close.
                error!("Upstream stream failed: {}", e);
                Event::default().data(format!("[ERROR] {}", e))
            }
        };
        Ok(frame)
    });

    Ok(Sse::new(stream))
}
