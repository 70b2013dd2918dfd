use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Role, SessionUser},
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "pokedex_session";
/// Key under which the authenticated `SessionUser` is stored in the session record.
pub const SESSION_USER_KEY: &str = "user";
/// Where anonymous requests to protected routes are sent.
pub const LOGIN_PATH: &str = "/login";

/// session_layer
///
/// Builds the session middleware over `store`: an `HttpOnly`, `SameSite=Lax` cookie on
/// path `/`, `Secure` in production, expiring after `session_ttl_minutes` of inactivity.
pub fn session_layer<Store>(store: Store, config: &AppConfig) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.cookie_secure())
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.session_ttl_minutes,
        )))
}

/// Binds `user` to the session under a fresh id, replacing whatever it held before.
pub async fn sign_in(session: &tower_sessions::Session, user: &SessionUser) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, user).await?;
    Ok(())
}

/// Deletes the session record and clears the cookie.
pub async fn sign_out(session: &tower_sessions::Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// Session
///
/// The typed view of the per-request session. A missing, unknown or expired session
/// id, or a session without a stored user, is `Anonymous`.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Anonymous,
    Authenticated { user: SessionUser },
}

impl Session {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { user } => Some(user),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role)
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = tower_sessions::Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| AppError::Internal(reason.to_string()))?;

        Ok(match session.get::<SessionUser>(SESSION_USER_KEY).await? {
            Some(user) => Session::Authenticated { user },
            None => Session::Anonymous,
        })
    }
}

/// CurrentUser
///
/// Extractor for routes that require a login. Anonymous requests are redirected to
/// the login entry point rather than refused with an error status.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Session::from_request_parts(parts, state).await {
            Ok(Session::Authenticated { user }) => Ok(CurrentUser(user)),
            Ok(Session::Anonymous) => Err(Redirect::to(LOGIN_PATH).into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

/// AdminUser
///
/// Extractor for admin-only routes. Not logged in → redirect to login, as for
/// `CurrentUser`. Logged in with another role → 403, so a refused USER can tell
/// "unauthorized" apart from "not logged in".
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            tracing::warn!(user = %user.email, "non-admin session refused on admin route");
            return Err(AppError::Forbidden.into_response());
        }
        Ok(AdminUser(user))
    }
}
