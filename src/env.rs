use std::path::{Path, PathBuf};

use rocket::figment::Figment;
use serde::Deserialize;

pub type EnvError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of an environment load. Reported by the caller once tracing is up.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnvFiles {
    pub loaded: Vec<String>,
    pub missing: Vec<String>,
}

pub fn load_environment() -> Result<EnvFiles, EnvError> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        ["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        ["config/common.env", "config/dev.env", ".secrets.env"]
    };

    load_env_files(&env_files)
}

/// Later files override earlier ones; absent files are skipped.
pub fn load_env_files<P: AsRef<Path>>(paths: &[P]) -> Result<EnvFiles, EnvError> {
    let mut files = EnvFiles::default();

    for path in paths {
        let path = path.as_ref();
        let name = path.display().to_string();

        if !path.exists() {
            files.missing.push(name);
            continue;
        }

        dotenvy::from_filename_override(path)?;
        files.loaded.push(name);
    }

    Ok(files)
}

/// Application settings read from Rocket's figment, so they come from
/// `Rocket.toml` or `ROCKET_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tax_records.db".to_string(),
            upload_dir: PathBuf::from("uploads"),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.extract()
    }

    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        }
    }
}
