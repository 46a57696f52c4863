use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateMessageRequest, CreatedMessageResponse, ListQuery, MessageView},
    services::{create_message, view_for},
};
use crate::{auth::extractors::MaybeUser, error::AppError, state::AppState};

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(post_message))
}

#[instrument(skip(state, viewer))]
pub async fn list_messages(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let limit = q.limit.clamp(1, 200);
    let rows = state.messages.list_recent(limit).await?;
    Ok(Json(view_for(viewer.user.as_ref(), rows)))
}

#[instrument(skip(state, viewer, payload))]
pub async fn post_message(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<CreatedMessageResponse>), AppError> {
    let msg = create_message(
        state.messages.as_ref(),
        viewer.user,
        &payload.title,
        &payload.message,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedMessageResponse {
            id: msg.id,
            title: msg.title,
            body: msg.body,
            created_at: msg.created_at,
        }),
    ))
}
