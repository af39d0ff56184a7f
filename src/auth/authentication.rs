use rocket::Request;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FlashMessage, FromRequest, Outcome};
use rocket::response::{Flash, Redirect};

use crate::error::AppError;

use super::{Permission, SessionUser};

pub const SESSION_COOKIE: &str = "session";

pub fn start_session(cookies: &CookieJar<'_>, user: &SessionUser) -> Result<(), AppError> {
    let claims = serde_json::to_string(user)
        .map_err(|e| AppError::Internal(format!("Failed to encode session: {}", e)))?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, claims))
            .same_site(SameSite::Lax)
            .http_only(true),
    );

    Ok(())
}

pub fn end_session(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::build(SESSION_COOKIE));
}

pub fn session_from_cookies(cookies: &CookieJar<'_>) -> Option<SessionUser> {
    let cookie = cookies.get_private(SESSION_COOKIE)?;

    match serde_json::from_str(cookie.value()) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable session cookie");
            None
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("session_guard");
        let _guard = auth_span.enter();

        match session_from_cookies(request.cookies()) {
            Some(user) => {
                tracing::debug!(username = %user.username, role = %user.role(), "Session accepted");
                Outcome::Success(user)
            }
            None => Outcome::Error((Status::Unauthorized, AppError::Unauthenticated)),
        }
    }
}

/// A session whose role may view and export every record.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = match request.guard::<SessionUser>().await {
            Outcome::Success(user) => user,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let allowed = [Permission::ViewAllRecords, Permission::ExportAllRecords]
            .into_iter()
            .all(|permission| user.require_permission(permission).is_ok());

        if allowed {
            Outcome::Success(AdminUser(user))
        } else {
            Outcome::Error((Status::Forbidden, AppError::Unauthorized))
        }
    }
}

/// One-line transient notice rendered at the top of every page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notice {
    pub kind: String,
    pub message: String,
}

impl From<FlashMessage<'_>> for Notice {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        }
    }
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Flash<Redirect> {
    tracing::warn!(uri = %req.uri(), "Unauthenticated access attempt");
    Flash::error(Redirect::to("/login"), "Please log in to access this page.")
}

#[catch(403)]
pub fn forbidden(req: &Request) -> Flash<Redirect> {
    tracing::warn!(uri = %req.uri(), "Forbidden access attempt");
    Flash::error(Redirect::to("/"), "Admin access required.")
}
