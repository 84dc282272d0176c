use serde::Serialize;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::organization::{NewOrganization, Organization};
use crate::organizations::resolver::assign_candidate_to_organization;
use crate::organizations::store::OrganizationStore;

/// Demo tenants: (name, slug, primary colour).
const DEMO_ORGANIZATIONS: &[(&str, &str, &str)] = &[
    ("TechCorp Solutions", "techcorp", "#0d6efd"),
    ("InnovateTech", "innovatetech", "#198754"),
    ("StartupXY", "startupxy", "#fd7e14"),
];

#[derive(Debug, Serialize, FromRow)]
pub struct OrganizationBreakdown {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub candidate_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OrganizationStats {
    pub total_candidates: i64,
    pub unassigned_candidates: i64,
    pub organizations: Vec<OrganizationBreakdown>,
}

#[derive(Debug, FromRow)]
struct UnassignedCandidate {
    id: Uuid,
    email: String,
}

/// Assigns every candidate without an organization, by email domain or the default pool.
/// A failing row is logged and skipped. Returns how many rows were updated.
pub async fn backfill_unassigned_candidates(
    pool: &PgPool,
    store: &dyn OrganizationStore,
) -> Result<u64, sqlx::Error> {
    let candidates: Vec<UnassignedCandidate> = sqlx::query_as(
        "SELECT id, email FROM users WHERE role = 'candidate' AND organization_id IS NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut updated = 0u64;
    for candidate in candidates {
        let assignment =
            assign_candidate_to_organization(store, &candidate.email, None, None).await?;
        let result = sqlx::query(
            "UPDATE users SET organization_id = $1, updated_at = now() WHERE id = $2",
        )
        .bind(assignment.organization_id)
        .bind(candidate.id)
        .execute(pool)
        .await;

        match result {
            Ok(_) => updated += 1,
            Err(e) => warn!("Could not backfill organization for {}: {e}", candidate.id),
        }
    }

    info!("Backfilled organization for {updated} candidates");
    Ok(updated)
}

pub async fn organization_stats(pool: &PgPool) -> Result<OrganizationStats, sqlx::Error> {
    let total_candidates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'candidate'")
            .fetch_one(pool)
            .await?;
    let unassigned_candidates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'candidate' AND organization_id IS NULL",
    )
    .fetch_one(pool)
    .await?;
    let organizations: Vec<OrganizationBreakdown> = sqlx::query_as(
        r#"
        SELECT o.id AS organization_id, o.name, o.slug,
               COUNT(u.id) FILTER (WHERE u.role = 'candidate') AS candidate_count
        FROM organizations o
        LEFT JOIN users u ON u.organization_id = o.id
        GROUP BY o.id, o.name, o.slug
        ORDER BY candidate_count DESC, o.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(OrganizationStats {
        total_candidates,
        unassigned_candidates,
        organizations,
    })
}

/// Creates the demo tenants if they are missing.
pub async fn seed_demo_organizations(
    store: &dyn OrganizationStore,
) -> Result<Vec<Organization>, sqlx::Error> {
    let mut seeded = Vec::with_capacity(DEMO_ORGANIZATIONS.len());
    for (name, slug, color) in DEMO_ORGANIZATIONS {
        let org = store
            .create_if_absent(NewOrganization {
                name: name.to_string(),
                slug: slug.to_string(),
                branding_config: json!({ "theme": "corporate", "color": color }),
                subscription_plan: "trial".to_string(),
            })
            .await?;
        seeded.push(org);
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::resolver::AssignmentSource;
    use crate::organizations::store::memory::MemoryOrganizationStore;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryOrganizationStore::default();
        let first = seed_demo_organizations(&store).await.unwrap();
        let second = seed_demo_organizations(&store).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(first[0].id, second[0].id);
        assert!(first.iter().all(|o| o.subscription_plan == "trial"));
    }

    #[tokio::test]
    async fn test_seeded_techcorp_receives_domain_candidates() {
        let store = MemoryOrganizationStore::default();
        seed_demo_organizations(&store).await.unwrap();
        let assignment = assign_candidate_to_organization(&store, "jane@techcorp.com", None, None)
            .await
            .unwrap();
        assert_eq!(assignment.source, AssignmentSource::EmailDomain);
        assert_eq!(store.id_of("techcorp"), Some(assignment.organization_id));
    }
}
