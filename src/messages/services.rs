use tracing::info;

use super::{
    dto::MessageView,
    repo::MessageStore,
    repo_types::{Message, MessageWithAuthor},
};
use crate::auth::{gate::require_authenticated, repo_types::User};
use crate::error::AppError;

const MAX_TITLE_LEN: usize = 200;
const MAX_BODY_LEN: usize = 10_000;

/// Creates a message owned by the viewer. Nothing is written unless the
/// viewer is authenticated and the content is non-empty.
pub async fn create_message(
    store: &dyn MessageStore,
    viewer: Option<User>,
    title: &str,
    body: &str,
) -> Result<Message, AppError> {
    let author = require_authenticated(viewer)?;

    let title = title.trim();
    let body = body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(AppError::Validation("Title and message are required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN || body.chars().count() > MAX_BODY_LEN {
        return Err(AppError::Validation("Message too long".into()));
    }

    let msg = store.insert(author.id, title, body).await?;
    info!(user_id = %author.id, message_id = %msg.id, "message created");
    Ok(msg)
}

/// Hides author and date from anyone who is not a member.
pub fn view_for(viewer: Option<&User>, rows: Vec<MessageWithAuthor>) -> Vec<MessageView> {
    let reveal = viewer.is_some_and(User::is_member);
    rows.into_iter()
        .map(|m| MessageView {
            id: m.id,
            title: m.title,
            body: m.body,
            author: reveal.then(|| format!("{} {}", m.author_first_name, m.author_last_name)),
            created_at: reveal.then_some(m.created_at),
        })
        .collect()
}
