use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::auth::repo_types::User;
use crate::error::AppError;
use crate::session::{Rehydrated, SessionCodec, SessionId};
use crate::state::AppState;

/// The request's user, if its session cookie resolves to one.
///
/// Unknown, expired, or invalidated sessions all produce an anonymous
/// viewer; only store failures reject the request.
pub struct MaybeUser {
    pub user: Option<User>,
}

impl MaybeUser {
    fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(&state.config.session.cookie_name) else {
            return Ok(Self::anonymous());
        };
        let sid = SessionId::from(cookie.value().to_string());

        let Some(principal) = state.sessions.load(&sid).await? else {
            debug!("session cookie without live session");
            return Ok(Self::anonymous());
        };

        match SessionCodec::from_ref(state).deserialize(&principal).await? {
            Rehydrated::User(user) => Ok(Self { user: Some(user) }),
            Rehydrated::Invalidated => {
                if let Err(e) = state.sessions.destroy(&sid).await {
                    warn!(error = %format!("{e:#}"), "failed to drop invalidated session");
                }
                Ok(Self::anonymous())
            }
        }
    }
}
