//! Organization assignment for newly registered candidates.
//!
//! Strict priority, first match wins:
//! 1. invitation code (hook, never matches yet)
//! 2. email domain via [`DOMAIN_ORGANIZATIONS`], looked up by organization name
//! 3. referrer URL, subdomain form then path form, looked up by slug
//! 4. the lazily created "Open Candidate Pool"
//!
//! The result is never empty. Storage errors propagate to the caller.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::organization::{NewOrganization, Organization};
use crate::organizations::store::OrganizationStore;

pub const DEFAULT_POOL_NAME: &str = "Open Candidate Pool";
pub const DEFAULT_POOL_SLUG: &str = "open-pool";

/// Email domains that belong to a known organization, keyed to the organization's name.
pub const DOMAIN_ORGANIZATIONS: &[(&str, &str)] = &[
    ("techcorp.com", "TechCorp Solutions"),
    ("innovate.io", "InnovateTech"),
    ("startupxy.com", "StartupXY"),
    ("example.com", "Example Corp"),
];

static SUBDOMAIN_REFERRER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://([^./]+)\.talentiq\.com").expect("valid regex"));
static PATH_REFERRER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"talentiq\.com/([^/?#]+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    SignupLink,
    InvitationCode,
    EmailDomain,
    Referrer,
    DefaultPool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub source: AssignmentSource,
}

impl Assignment {
    pub fn from_org(org: Organization, source: AssignmentSource) -> Self {
        Self {
            organization_id: org.id,
            organization_name: org.name,
            source,
        }
    }
}

pub async fn assign_candidate_to_organization(
    store: &dyn OrganizationStore,
    email: &str,
    referrer_url: Option<&str>,
    invitation_code: Option<&str>,
) -> Result<Assignment, sqlx::Error> {
    if let Some(code) = invitation_code.filter(|c| !c.trim().is_empty()) {
        if let Some(org) = organization_for_invitation_code(store, code).await? {
            return Ok(Assignment::from_org(org, AssignmentSource::InvitationCode));
        }
    }

    if let Some(name) = email_domain(email).and_then(|d| organization_name_for_domain(&d)) {
        match store.find_by_name(name).await? {
            Some(org) => {
                info!("Assigned {email} to {} by email domain", org.name);
                return Ok(Assignment::from_org(org, AssignmentSource::EmailDomain));
            }
            None => debug!("Domain organization '{name}' for {email} does not exist"),
        }
    }

    for slug in referrer_url.map(referrer_slugs).unwrap_or_default() {
        if let Some(org) = store.find_by_slug(&slug).await? {
            info!("Assigned {email} to {} by referrer", org.name);
            return Ok(Assignment::from_org(org, AssignmentSource::Referrer));
        }
        debug!("No organization with referrer slug '{slug}'");
    }

    let pool = default_pool(store).await?;
    info!("Assigned {email} to the default candidate pool");
    Ok(Assignment::from_org(pool, AssignmentSource::DefaultPool))
}

/// Invitation codes are not issued yet, so nothing ever matches.
async fn organization_for_invitation_code(
    _store: &dyn OrganizationStore,
    _code: &str,
) -> Result<Option<Organization>, sqlx::Error> {
    Ok(None)
}

/// Gets or creates the "Open Candidate Pool" organization.
pub async fn default_pool(store: &dyn OrganizationStore) -> Result<Organization, sqlx::Error> {
    if let Some(org) = store.find_by_slug(DEFAULT_POOL_SLUG).await? {
        return Ok(org);
    }
    store
        .create_if_absent(NewOrganization {
            name: DEFAULT_POOL_NAME.to_string(),
            slug: DEFAULT_POOL_SLUG.to_string(),
            branding_config: json!({ "theme": "default", "color": "#6c757d" }),
            subscription_plan: "free".to_string(),
        })
        .await
}

/// Resolves the `?org=<slug>` parameter of an organization-specific signup link.
pub async fn organization_from_signup_context(
    store: &dyn OrganizationStore,
    org_slug: Option<&str>,
) -> Result<Option<Organization>, sqlx::Error> {
    match org_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Ok(store
            .find_by_slug(&slug.to_lowercase())
            .await?
            .filter(|o| o.is_active)),
        None => Ok(None),
    }
}

pub fn signup_link(slug: &str) -> String {
    format!("/register?org={slug}")
}

/// Lower-cased domain part of an email address.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_ascii_lowercase())
}

pub fn organization_name_for_domain(domain: &str) -> Option<&'static str> {
    DOMAIN_ORGANIZATIONS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, name)| *name)
}

/// Candidate organization slugs in a referrer such as `https://acme.talentiq.com/jobs`
/// or `https://talentiq.com/acme/careers`: the subdomain first, then the first path
/// segment after the host. `https://www.talentiq.com/acme` yields both `www` and `acme`.
pub fn referrer_slugs(url: &str) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::with_capacity(2);
    for pattern in [&*SUBDOMAIN_REFERRER, &*PATH_REFERRER] {
        let Some(slug) = pattern
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
        else {
            continue;
        };
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::store::memory::{FailingOrganizationStore, MemoryOrganizationStore};

    #[test]
    fn test_email_domain_is_case_insensitive() {
        assert_eq!(email_domain("Jane@TechCorp.com").as_deref(), Some("techcorp.com"));
        assert_eq!(email_domain("no-at-sign"), None);
        assert_eq!(email_domain("trailing@"), None);
    }

    #[test]
    fn test_referrer_slug_patterns() {
        assert_eq!(
            referrer_slugs("https://acme.talentiq.com/jobs/12"),
            vec!["acme".to_string(), "jobs".to_string()]
        );
        assert_eq!(
            referrer_slugs("http://talentiq.com/globex/careers"),
            vec!["globex".to_string()]
        );
        assert_eq!(
            referrer_slugs("https://WWW.talentiq.com/Globex"),
            vec!["www".to_string(), "globex".to_string()]
        );
        assert!(referrer_slugs("https://www.google.com/search?q=jobs").is_empty());
    }

    #[test]
    fn test_signup_link_format() {
        assert_eq!(signup_link("techcorp"), "/register?org=techcorp");
    }

    #[tokio::test]
    async fn test_techcorp_email_joins_existing_org() {
        let store = MemoryOrganizationStore::with(&[("TechCorp Solutions", "techcorp")]);
        let result = assign_candidate_to_organization(&store, "jane@techcorp.com", None, None)
            .await
            .unwrap();
        assert_eq!(result.organization_name, "TechCorp Solutions");
        assert_eq!(result.source, AssignmentSource::EmailDomain);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_techcorp_email_without_org_falls_back_to_pool() {
        let store = MemoryOrganizationStore::default();
        let result = assign_candidate_to_organization(&store, "jane@techcorp.com", None, None)
            .await
            .unwrap();
        assert_eq!(result.organization_name, DEFAULT_POOL_NAME);
        assert_eq!(result.source, AssignmentSource::DefaultPool);
        assert_eq!(store.id_of(DEFAULT_POOL_SLUG), Some(result.organization_id));
    }

    #[tokio::test]
    async fn test_email_domain_beats_referrer() {
        let store = MemoryOrganizationStore::with(&[
            ("TechCorp Solutions", "techcorp"),
            ("Globex", "globex"),
        ]);
        let result = assign_candidate_to_organization(
            &store,
            "jane@techcorp.com",
            Some("https://globex.talentiq.com"),
            Some("ABC123"),
        )
        .await
        .unwrap();
        assert_eq!(result.organization_name, "TechCorp Solutions");
    }

    #[tokio::test]
    async fn test_referrer_used_for_unknown_domain() {
        let store = MemoryOrganizationStore::with(&[("Globex", "globex")]);
        let result = assign_candidate_to_organization(
            &store,
            "sam@gmail.com",
            Some("https://talentiq.com/globex"),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.organization_name, "Globex");
        assert_eq!(result.source, AssignmentSource::Referrer);
    }

    #[tokio::test]
    async fn test_referrer_path_used_when_subdomain_is_unknown() {
        let store = MemoryOrganizationStore::with(&[("Globex", "globex")]);
        let result = assign_candidate_to_organization(
            &store,
            "sam@gmail.com",
            Some("https://www.talentiq.com/globex"),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.organization_name, "Globex");
        assert_eq!(result.source, AssignmentSource::Referrer);
    }

    #[tokio::test]
    async fn test_unknown_referrer_slug_falls_through() {
        let store = MemoryOrganizationStore::default();
        let result = assign_candidate_to_organization(
            &store,
            "sam@gmail.com",
            Some("https://nobody.talentiq.com"),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.source, AssignmentSource::DefaultPool);
    }

    #[tokio::test]
    async fn test_default_pool_created_once() {
        let store = MemoryOrganizationStore::default();
        let first = assign_candidate_to_organization(&store, "a@gmail.com", None, None)
            .await
            .unwrap();
        let second = assign_candidate_to_organization(&store, "b@yahoo.com", None, None)
            .await
            .unwrap();
        assert_eq!(first.organization_id, second.organization_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let result =
            assign_candidate_to_organization(&FailingOrganizationStore, "a@gmail.com", None, None)
                .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_signup_context_ignores_inactive_and_blank() {
        let store = MemoryOrganizationStore::with(&[("Globex", "globex")]);
        let found = organization_from_signup_context(&store, Some("Globex"))
            .await
            .unwrap();
        assert_eq!(found.map(|o| o.slug).as_deref(), Some("globex"));
        assert!(organization_from_signup_context(&store, Some("  "))
            .await
            .unwrap()
            .is_none());
        assert!(organization_from_signup_context(&store, None)
            .await
            .unwrap()
            .is_none());
    }
}
