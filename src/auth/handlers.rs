use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, MembershipRequest, PublicUser, RegisterRequest},
        extractors::MaybeUser,
        gate::{require_authenticated, MembershipGate},
        services::register_user,
    },
    error::AppError,
    session::{SessionCodec, SessionId},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/membership", post(upgrade_membership))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = register_user(state.users.as_ref(), &state.hasher, payload).await?;
    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<PublicUser>), AppError> {
    let user = state
        .authenticator
        .authenticate(&payload.email, &payload.password)
        .await?;

    // Re-login replaces whatever session the browser held.
    if let Some(old) = jar.get(&state.config.session.cookie_name) {
        state
            .sessions
            .destroy(&SessionId::from(old.value().to_string()))
            .await?;
    }

    let principal = SessionCodec::from_ref(&state).serialize(&user);
    let sid = state.sessions.create(&principal, state.session_ttl()).await?;

    info!(user_id = %user.id, "user logged in");
    Ok((jar.add(session_cookie(&state, sid)), Json(user.into())))
}

/// Always succeeds, whether or not a live session existed.
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    let name = state.config.session.cookie_name.clone();
    if let Some(cookie) = jar.get(&name) {
        state
            .sessions
            .destroy(&SessionId::from(cookie.value().to_string()))
            .await?;
    }
    let removal = Cookie::build((name, String::new())).path("/");
    Ok((jar.remove(removal), StatusCode::NO_CONTENT))
}

#[instrument(skip(viewer))]
pub async fn get_me(viewer: MaybeUser) -> Result<Json<PublicUser>, AppError> {
    let user = require_authenticated(viewer.user)?;
    Ok(Json(user.into()))
}

#[instrument(skip(gate, viewer, payload))]
pub async fn upgrade_membership(
    State(gate): State<MembershipGate>,
    viewer: MaybeUser,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = gate
        .upgrade_membership(viewer.user, &payload.secret_code)
        .await?;
    Ok(Json(user.into()))
}

fn session_cookie(state: &AppState, sid: SessionId) -> Cookie<'static> {
    let cfg = &state.config.session;
    Cookie::build((cfg.cookie_name.clone(), sid.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.cookie_secure)
        .max_age(state.session_ttl())
        .build()
}
