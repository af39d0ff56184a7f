#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::{Arc, Once};

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use tempfile::TempDir;
    use tracing_subscriber::EnvFilter;

    use crate::auth::{SESSION_COOKIE, SessionUser};
    use crate::db::SqliteRepository;
    use crate::env::AppConfig;
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{NewTaxRecord, TaxFigures};
    use crate::repository::{DynRepository, Repository};
    use crate::test::memory::MemoryRepository;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";
    pub const TEST_BCRYPT_COST: u32 = 4;
    pub const BOUNDARY: &str = "X-TAX-RECORDS-BOUNDARY";

    pub struct TestUser {
        pub username: String,
        pub password: String,
        pub is_admin: bool,
    }

    pub struct TestRecord {
        pub owner: String,
        pub firm_name: String,
        pub net_profit: f64,
    }

    #[derive(Default)]
    pub struct TestAppBuilder {
        users: Vec<TestUser>,
        records: Vec<TestRecord>,
        sqlite: bool,
        admin_bootstrap: Option<(String, String)>,
    }

    impl TestAppBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(self, username: &str) -> Self {
            self.user_with_password(username, STANDARD_PASSWORD, false)
        }

        pub fn admin(self, username: &str) -> Self {
            self.user_with_password(username, STANDARD_PASSWORD, true)
        }

        pub fn user_with_password(mut self, username: &str, password: &str, is_admin: bool) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                password: password.to_string(),
                is_admin,
            });
            self
        }

        pub fn record(mut self, owner: &str, firm_name: &str, net_profit: f64) -> Self {
            self.records.push(TestRecord {
                owner: owner.to_string(),
                firm_name: firm_name.to_string(),
                net_profit,
            });
            self
        }

        /// Back the app with an in-memory SQLite database instead of the
        /// memory repository.
        pub fn sqlite(mut self) -> Self {
            self.sqlite = true;
            self
        }

        pub fn admin_bootstrap(mut self, username: &str, password: &str) -> Self {
            self.admin_bootstrap = Some((username.to_string(), password.to_string()));
            self
        }

        pub async fn build(self) -> Result<TestApp, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new("debug"))
                    .with_test_writer()
                    .try_init();
            });

            let (repository, memory, sqlite): (
                DynRepository,
                Option<Arc<MemoryRepository>>,
                Option<SqliteRepository>,
            ) = if self.sqlite {
                let sqlite = SqliteRepository::in_memory().await?;
                let repository: DynRepository = Arc::new(sqlite.clone());
                (repository, None, Some(sqlite))
            } else {
                let memory = Arc::new(MemoryRepository::new());
                let repository: DynRepository = memory.clone();
                (repository, Some(memory), None)
            };

            let mut user_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let hashed_password = bcrypt::hash(&user.password, TEST_BCRYPT_COST)?;
                let user_id = repository
                    .insert_user(&user.username, &hashed_password, user.is_admin)
                    .await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            for record in &self.records {
                let user_id = user_id_map.get(&record.owner).copied().ok_or_else(|| {
                    AppError::NotFound(format!("Test user {} not declared", record.owner))
                })?;

                repository
                    .insert_record(NewTaxRecord {
                        firm_name: Some(record.firm_name.clone()),
                        date_period: Some("2024".to_string()),
                        figures: TaxFigures {
                            net_profit: record.net_profit,
                            ..TaxFigures::default()
                        },
                        user_id,
                        ..NewTaxRecord::default()
                    })
                    .await?;
            }

            let upload_dir = TempDir::new()?;
            let (admin_username, admin_password) = match self.admin_bootstrap {
                Some((username, password)) => (Some(username), Some(password)),
                None => (None, None),
            };

            let config = AppConfig {
                database_url: "sqlite::memory:".to_string(),
                upload_dir: upload_dir.path().to_path_buf(),
                bcrypt_cost: TEST_BCRYPT_COST,
                admin_username,
                admin_password,
            };

            Ok(TestApp {
                repository,
                memory,
                sqlite,
                user_id_map,
                upload_dir,
                config,
            })
        }
    }

    pub struct TestApp {
        pub repository: DynRepository,
        pub memory: Option<Arc<MemoryRepository>>,
        pub sqlite: Option<SqliteRepository>,
        pub user_id_map: HashMap<String, i64>,
        pub upload_dir: TempDir,
        pub config: AppConfig,
    }

    impl TestApp {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub async fn user_count(&self, username: &str) -> i64 {
            if let Some(memory) = &self.memory {
                return memory.user_count(username) as i64;
            }

            let sqlite = self.sqlite.as_ref().expect("Test app has no backing store");
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(sqlite.pool())
                .await
                .expect("Failed to count users")
        }
    }

    /// Admin plus two ordinary users who each own one record.
    pub async fn create_standard_test_app() -> TestApp {
        TestAppBuilder::new()
            .admin("admin_user")
            .user("alice")
            .user("bob")
            .record("alice", "Alice Trading", 500.0)
            .record("bob", "Bob Holdings", 750.0)
            .build()
            .await
            .expect("Failed to build test app")
    }

    pub async fn setup_test_client(app: &TestApp) -> Client {
        Client::tracked(init_rocket(app.repository.clone(), app.config.clone()))
            .await
            .expect("Failed to build rocket client")
    }

    pub async fn login_test_user(client: &Client, username: &str, password: &str) -> Status {
        let response = client
            .post("/login")
            .header(ContentType::Form)
            .body(format!("username={}&password={}", username, password))
            .dispatch()
            .await;

        response.status()
    }

    pub fn session_of(client: &Client) -> Option<SessionUser> {
        let cookie = client.cookies().get_private(SESSION_COOKIE)?;
        serde_json::from_str(cookie.value()).ok()
    }

    /// Hand-built `multipart/form-data` body for driving `/compute`.
    #[derive(Default)]
    pub struct MultipartBody {
        body: Vec<u8>,
    }

    impl MultipartBody {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn content_type() -> ContentType {
            ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
        }

        pub fn text(mut self, name: &str, value: &str) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
            self
        }

        pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, name, filename, content_type
                )
                .as_bytes(),
            );
            self.body.extend_from_slice(bytes);
            self.body.extend_from_slice(b"\r\n");
            self
        }

        pub fn finish(mut self) -> Vec<u8> {
            self.body
                .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
            self.body
        }
    }

    pub async fn submit_record(client: &Client, body: MultipartBody) -> (Status, String) {
        let response = client
            .post("/compute")
            .header(MultipartBody::content_type())
            .body(body.finish())
            .dispatch()
            .await;

        let status = response.status();
        let body = response.into_string().await.unwrap_or_default();
        (status, body)
    }
}
