#[macro_use]
extern crate rocket;

mod auth;
mod db;
mod env;
mod error;
mod models;
mod presentation;
mod repository;
mod routes;
mod telemetry;
#[cfg(test)]
mod test;
mod uploads;
mod validation;

use std::sync::Arc;

use auth::{
    ensure_admin, forbidden, login, logout, process_login, process_register, register,
    unauthorized,
};
use db::SqliteRepository;
use env::AppConfig;
use error::AppError;
use repository::DynRepository;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use routes::{
    all_records, compute, download_csv, download_my_csv, health, index, my_records,
    uploaded_file,
};
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::{error, info, warn};
use uploads::FileStore;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Figment(#[from] rocket::figment::Error),
    #[error("{0}")]
    Rocket(#[from] rocket::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let loaded_env_files = env::load_environment();
    let _telemetry = init_tracing();

    match loaded_env_files {
        Ok(files) => {
            for path in &files.missing {
                warn!("Environment file {} not found, skipping", path);
            }
            info!(files = ?files.loaded, "Environment loaded");
        }
        Err(e) => error!("Failed to load environment files: {}", e),
    }

    let config = AppConfig::from_figment(&rocket::Config::figment())?;

    let repository = SqliteRepository::connect(&config.database_url).await?;

    let _rocket = init_rocket(Arc::new(repository), config).launch().await?;

    info!("Tax records server stopped");
    Ok(())
}

pub fn init_rocket(repository: DynRepository, config: AppConfig) -> Rocket<Build> {
    info!("Starting tax records");

    let store = FileStore::new(config.upload_dir.clone());

    rocket::build()
        .manage(repository)
        .manage(store)
        .manage(config)
        .mount(
            "/",
            routes![
                index,
                register,
                process_register,
                login,
                process_login,
                logout,
                compute,
                my_records,
                download_my_csv,
                all_records,
                download_csv,
                uploaded_file,
                health,
            ],
        )
        .register("/", catchers![unauthorized, forbidden])
        .attach(Template::fairing())
        .attach(AdHoc::try_on_ignite("Upload directory", |rocket| async move {
            let Some(store) = rocket.state::<FileStore>() else {
                return Err(rocket);
            };

            match store.ensure_root().await {
                Ok(()) => {
                    info!(path = %store.root().display(), "Upload directory ready");
                    Ok(rocket)
                }
                Err(e) => {
                    e.log_and_record("Creating upload directory");
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::try_on_ignite("Admin bootstrap", |rocket| async move {
            let (Some(repository), Some(config)) = (
                rocket.state::<DynRepository>(),
                rocket.state::<AppConfig>(),
            ) else {
                return Err(rocket);
            };

            let Some((username, password)) = config.admin_credentials() else {
                return Ok(rocket);
            };

            match ensure_admin(repository.as_ref(), username, password, config.bcrypt_cost).await
            {
                Ok(()) => Ok(rocket),
                Err(e) => {
                    e.log_and_record("Bootstrapping admin account");
                    Err(rocket)
                }
            }
        }))
        .attach(TelemetryFairing)
}
