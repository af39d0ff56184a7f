use std::sync::Arc;

use crate::auth::User;
use crate::error::AppError;
use crate::models::{NewTaxRecord, TaxRecord};

/// Storage seam for credentials and tax records.
#[rocket::async_trait]
pub trait Repository: Send + Sync {
    /// Persists one record and returns its id.
    async fn insert_record(&self, record: NewTaxRecord) -> Result<i64, AppError>;

    /// Records owned by `user_id`, in id order.
    async fn list_records_for_user(&self, user_id: i64) -> Result<Vec<TaxRecord>, AppError>;

    /// Every record, in id order.
    async fn list_all_records(&self) -> Result<Vec<TaxRecord>, AppError>;

    /// Storage key of the newest record whose document was uploaded as
    /// `file_name`.
    async fn latest_file_key(&self, file_name: &str) -> Result<Option<String>, AppError>;

    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Stores a user with an already hashed password. Fails with
    /// `DuplicateUsername` when the name is taken.
    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, AppError>;
}

pub type DynRepository = Arc<dyn Repository>;
