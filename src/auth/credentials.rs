use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::repository::Repository;

use super::SessionUser;

/// Hashes `password` and stores a new non-admin user.
#[instrument(skip(repository, password))]
pub async fn register_user(
    repository: &dyn Repository,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<i64, AppError> {
    let hashed_password = bcrypt::hash(password, cost)?;
    let user_id = repository
        .insert_user(username, &hashed_password, false)
        .await?;

    info!(user_id, "Registered new user");
    Ok(user_id)
}

/// Checks a username/password pair. Unknown users and wrong passwords both
/// yield `InvalidCredentials`.
#[instrument(skip(repository, password))]
pub async fn authenticate_user(
    repository: &dyn Repository,
    username: &str,
    password: &str,
) -> Result<SessionUser, AppError> {
    let Some(user) = repository.find_user_by_name(username).await? else {
        return Err(AppError::InvalidCredentials);
    };

    match bcrypt::verify(password, &user.password_hash) {
        Ok(true) => Ok(SessionUser::from(&user)),
        Ok(false) => Err(AppError::InvalidCredentials),
        Err(e) => {
            warn!(error = %e, "Stored password hash could not be verified");
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Creates the configured admin account unless that username is taken.
#[instrument(skip(repository, password))]
pub async fn ensure_admin(
    repository: &dyn Repository,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<(), AppError> {
    match repository.find_user_by_name(username).await? {
        Some(user) if user.is_admin => {
            info!("Admin account already present");
        }
        Some(_) => {
            warn!("Configured admin username belongs to a non-admin user");
        }
        None => {
            let hashed_password = bcrypt::hash(password, cost)?;
            let user_id = repository
                .insert_user(username, &hashed_password, true)
                .await?;
            info!(user_id, "Created admin account");
        }
    }

    Ok(())
}
