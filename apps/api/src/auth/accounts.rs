//! Account status lookup used on every authenticated request.
//!
//! A token stays valid until it expires, so the extractor asks this seam whether the account
//! behind it still exists and is enabled.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait AccountStatus: Send + Sync {
    /// `None` when the account is gone, otherwise its `user_active` flag.
    async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgAccountStatus {
    pool: PgPool,
}

impl PgAccountStatus {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStatus for PgAccountStatus {
    async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Fixed account table for router tests.
    #[derive(Default)]
    pub struct MemoryAccounts {
        accounts: Mutex<HashMap<Uuid, bool>>,
    }

    impl MemoryAccounts {
        pub fn set(&self, user_id: Uuid, active: bool) {
            self.accounts.lock().unwrap().insert(user_id, active);
        }
    }

    #[async_trait]
    impl AccountStatus for MemoryAccounts {
        async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, sqlx::Error> {
            Ok(self.accounts.lock().unwrap().get(&user_id).copied())
        }
    }
}
