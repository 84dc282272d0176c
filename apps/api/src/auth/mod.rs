pub mod accounts;
pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod registration;
pub mod validation;

pub use accounts::{AccountStatus, PgAccountStatus};
pub use extractor::AuthUser;
