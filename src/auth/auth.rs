use rocket::State;
use rocket::form::{Errors, Form};
use rocket::http::CookieJar;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket_dyn_templates::{Template, context};
use tracing::{info, warn};

use crate::env::AppConfig;
use crate::error::AppError;
use crate::repository::DynRepository;

use super::{Notice, SessionUser, authenticate_user, end_session, register_user, start_session};

const MISSING_CREDENTIALS: &str = "Username and password are required.";

#[derive(FromForm)]
pub struct CredentialsForm<'r> {
    #[field(validate = len(1..))]
    username: &'r str,
    #[field(validate = len(1..))]
    password: &'r str,
}

#[get("/register")]
pub fn register(user: Option<SessionUser>, flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "register",
        context! {
            title: "Register - Tax Records",
            current_user: user,
            notice: flash.map(Notice::from),
        },
    )
}

#[post("/register", data = "<form>")]
pub async fn process_register(
    form: Result<Form<CredentialsForm<'_>>, Errors<'_>>,
    repository: &State<DynRepository>,
    config: &State<AppConfig>,
) -> Result<Flash<Redirect>, AppError> {
    let form = match form {
        Ok(form) => form,
        Err(errors) => {
            warn!(errors = %errors, "Registration form rejected");
            return Ok(Flash::error(Redirect::to(uri!(register)), MISSING_CREDENTIALS));
        }
    };
    info!("Registration attempt: {}", form.username);

    match register_user(
        repository.inner().as_ref(),
        form.username,
        form.password,
        config.bcrypt_cost,
    )
    .await
    {
        Ok(_) => Ok(Flash::success(
            Redirect::to(uri!(login)),
            "Registration successful. Please log in.",
        )),
        Err(AppError::DuplicateUsername(username)) => {
            warn!(username = %username, "Registration rejected: username taken");
            Ok(Flash::error(
                Redirect::to(uri!(register)),
                "Username already exists.",
            ))
        }
        Err(e) => Err(e),
    }
}

#[get("/login")]
pub fn login(user: Option<SessionUser>, flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "login",
        context! {
            title: "Login - Tax Records",
            current_user: user,
            notice: flash.map(Notice::from),
        },
    )
}

#[post("/login", data = "<form>")]
pub async fn process_login(
    form: Result<Form<CredentialsForm<'_>>, Errors<'_>>,
    cookies: &CookieJar<'_>,
    repository: &State<DynRepository>,
) -> Result<Flash<Redirect>, AppError> {
    let form = match form {
        Ok(form) => form,
        Err(errors) => {
            warn!(errors = %errors, "Login form rejected");
            return Ok(Flash::error(Redirect::to(uri!(login)), MISSING_CREDENTIALS));
        }
    };
    info!("Login attempt: {}", form.username);

    match authenticate_user(repository.inner().as_ref(), form.username, form.password).await {
        Ok(user) => {
            start_session(cookies, &user)?;
            info!(username = %user.username, role = %user.role(), "Authentication successful");
            Ok(Flash::success(Redirect::to("/"), "Login successful."))
        }
        Err(AppError::InvalidCredentials) => {
            warn!("Authentication failed for {}", form.username);
            Ok(Flash::error(
                Redirect::to(uri!(login)),
                "Invalid username or password.",
            ))
        }
        Err(e) => Err(e),
    }
}

#[get("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Flash<Redirect> {
    end_session(cookies);
    Flash::success(Redirect::to("/"), "You have been logged out.")
}
