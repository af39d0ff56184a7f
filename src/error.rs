use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::Request;
use thiserror::Error;
use tracing::{Span, error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("Password hashing error: {0}")]
    Crypto(#[from] bcrypt::BcryptError),

    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Admin access required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Value recorded as `error.type` on the active span.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Migration(_) => "migration_error",
            AppError::Storage(_) => "storage_error",
            AppError::Export(_) => "export_error",
            AppError::Crypto(_) => "crypto_error",
            AppError::DuplicateUsername(_) => "duplicate_username",
            AppError::InvalidCredentials | AppError::Unauthenticated => "authentication_error",
            AppError::Unauthorized => "authorization_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Storage(_)
            | AppError::Export(_)
            | AppError::Crypto(_)
            | AppError::Internal(_) => Status::InternalServerError,
            AppError::DuplicateUsername(_) => Status::Conflict,
            AppError::InvalidCredentials | AppError::Unauthenticated => Status::Unauthorized,
            AppError::Unauthorized => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
        }
    }

    /// Logs the error (server faults at error level, client faults at warn)
    /// and marks the current span as failed.
    pub fn log_and_record(&self, ctx: &str) {
        let kind = self.kind();
        let server_fault = self.status_code().class().is_server_error();

        if server_fault {
            error!(error = %self, kind, context = %ctx, "Request failed");
        } else {
            warn!(error = %self, kind, context = %ctx, "Request rejected");
        }

        let span = Span::current();
        if span.is_none() {
            return;
        }

        span.record("error", true);
        span.record(ERROR_TYPE, kind);
        span.record("error.message", tracing::field::display(self));
        if server_fault {
            span.record(OTEL_STATUS_CODE, "ERROR");
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        self.log_and_record(&format!("{} {}", req.method(), req.uri()));
        self.status_code().respond_to(req)
    }
}
