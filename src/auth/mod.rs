pub mod auth;
pub mod authentication;
pub mod credentials;
pub mod permissions;
pub mod user;

pub use auth::*;
pub use authentication::*;
pub use credentials::*;
pub use permissions::*;
pub use user::*;
