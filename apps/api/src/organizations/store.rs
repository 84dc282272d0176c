//! Organization persistence seam.
//!
//! The resolver only needs three lookups, so it talks to this trait instead of the pool.
//! `PgOrganizationStore` is what `AppState` carries; tests use the in-memory store below.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::organization::{NewOrganization, Organization};

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>, sqlx::Error>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, sqlx::Error>;

    /// Inserts the organization unless one with the same slug exists; returns the stored row
    /// either way.
    async fn create_if_absent(&self, org: NewOrganization) -> Result<Organization, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgOrganizationStore {
    pool: PgPool,
}

impl PgOrganizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationStore for PgOrganizationStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM organizations WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_if_absent(&self, org: NewOrganization) -> Result<Organization, sqlx::Error> {
        // Concurrent first registrations race on the default pool; the unique slug decides.
        let inserted: Option<Organization> = sqlx::query_as(
            r#"
            INSERT INTO organizations (id, name, slug, branding_config, subscription_plan)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&org.name)
        .bind(&org.slug)
        .bind(&org.branding_config)
        .bind(&org.subscription_plan)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                tracing::info!("Created organization {} ({})", row.name, row.slug);
                Ok(row)
            }
            None => sqlx::query_as("SELECT * FROM organizations WHERE slug = $1")
                .bind(&org.slug)
                .fetch_one(&self.pool)
                .await,
        }
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// In-memory store used by resolver tests.
    #[derive(Default)]
    pub struct MemoryOrganizationStore {
        orgs: Mutex<Vec<Organization>>,
    }

    impl MemoryOrganizationStore {
        pub fn with(names_and_slugs: &[(&str, &str)]) -> Self {
            let store = Self::default();
            {
                let mut orgs = store.orgs.lock().unwrap();
                for (name, slug) in names_and_slugs {
                    orgs.push(Organization {
                        id: Uuid::new_v4(),
                        name: name.to_string(),
                        slug: slug.to_string(),
                        branding_config: serde_json::json!({}),
                        subscription_plan: "trial".to_string(),
                        is_active: true,
                        created_at: Utc::now(),
                    });
                }
            }
            store
        }

        pub fn len(&self) -> usize {
            self.orgs.lock().unwrap().len()
        }

        pub fn id_of(&self, slug: &str) -> Option<Uuid> {
            self.orgs
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.slug == slug)
                .map(|o| o.id)
        }
    }

    #[async_trait]
    impl OrganizationStore for MemoryOrganizationStore {
        async fn find_by_name(&self, name: &str) -> Result<Option<Organization>, sqlx::Error> {
            Ok(self
                .orgs
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.name == name)
                .cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, sqlx::Error> {
            Ok(self
                .orgs
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.slug == slug)
                .cloned())
        }

        async fn create_if_absent(
            &self,
            org: NewOrganization,
        ) -> Result<Organization, sqlx::Error> {
            let mut orgs = self.orgs.lock().unwrap();
            if let Some(existing) = orgs.iter().find(|o| o.slug == org.slug) {
                return Ok(existing.clone());
            }
            let row = Organization {
                id: Uuid::new_v4(),
                name: org.name,
                slug: org.slug,
                branding_config: org.branding_config,
                subscription_plan: org.subscription_plan,
                is_active: true,
                created_at: Utc::now(),
            };
            orgs.push(row.clone());
            Ok(row)
        }
    }

    /// Store whose every call fails, for error-propagation tests.
    pub struct FailingOrganizationStore;

    #[async_trait]
    impl OrganizationStore for FailingOrganizationStore {
        async fn find_by_name(&self, _name: &str) -> Result<Option<Organization>, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn find_by_slug(&self, _slug: &str) -> Result<Option<Organization>, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn create_if_absent(
            &self,
            _org: NewOrganization,
        ) -> Result<Organization, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
