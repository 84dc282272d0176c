//! Recruiting dashboard metrics.
//!
//! Every query takes an optional organization scope: `Some(org)` restricts counts to that
//! tenant, `None` (super admins only) covers the whole platform.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Responses at or above this score count as successful.
pub const SUCCESS_SCORE: f64 = 70.0;
pub const REPORTING_WINDOW_DAYS: i64 = 30;
/// Weeks in the 30-day window, used to compare the last week against the average.
const WEEKS_PER_WINDOW: f64 = 30.0 / 7.0;
const TOP_ORGANIZATIONS: i64 = 5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total` as a percentage with two decimals; zero when `total` is zero.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// 90 and above
    pub excellent: i64,
    /// 70 to 89
    pub good: i64,
    /// 50 to 69
    pub fair: i64,
    /// below 50
    pub poor: i64,
}

impl ScoreDistribution {
    pub fn from_scores(scores: &[f64]) -> Self {
        let mut dist = Self::default();
        for &s in scores {
            match s {
                s if s >= 90.0 => dist.excellent += 1,
                s if s >= 70.0 => dist.good += 1,
                s if s >= 50.0 => dist.fair += 1,
                _ => dist.poor += 1,
            }
        }
        dist
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub applications_last_30_days: i64,
    pub applications_last_7_days: i64,
    pub weekly_trend_percentage: f64,
    pub trend_direction: TrendDirection,
}

impl TrendAnalysis {
    pub fn from_counts(last_30_days: i64, last_7_days: i64) -> Self {
        let weekly_avg = last_30_days as f64 / WEEKS_PER_WINDOW;
        let pct = if weekly_avg > 0.0 {
            round2((last_7_days as f64 - weekly_avg) / weekly_avg * 100.0)
        } else {
            0.0
        };
        let trend_direction = if pct > 0.0 {
            TrendDirection::Up
        } else if pct < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };
        Self {
            applications_last_30_days: last_30_days,
            applications_last_7_days: last_7_days,
            weekly_trend_percentage: pct,
            trend_direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Organization,
    CrossOrganizational,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub total_candidates: i64,
    pub total_interviews: i64,
    pub total_applications: i64,
    pub total_responses: i64,
    pub scope: Scope,
    pub organization_name: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PipelineMetrics {
    pub status_distribution: BTreeMap<String, i64>,
    pub recent_applications: i64,
    pub approval_rate: f64,
    pub total_in_pipeline: i64,
}

#[derive(Debug, Serialize)]
pub struct PerformanceMetrics {
    pub interview_success_rate: f64,
    pub total_interviews_conducted: i64,
    pub successful_interviews: i64,
}

#[derive(Debug, Serialize)]
pub struct InterviewAnalytics {
    pub total_interviews: i64,
    pub completed_interviews: i64,
    pub completion_rate: f64,
    pub average_score: f64,
    pub score_distribution: ScoreDistribution,
}

#[derive(Debug, Serialize, FromRow)]
pub struct OrganizationRanking {
    pub name: String,
    pub candidates: i64,
    pub interviews: i64,
}

#[derive(Debug, Serialize)]
pub struct CrossOrgInsights {
    pub total_organizations: i64,
    pub top_organizations: Vec<OrganizationRanking>,
    pub total_platform_candidates: i64,
    pub total_platform_interviews: i64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub overview: Overview,
    pub pipeline: PipelineMetrics,
    pub performance: PerformanceMetrics,
    pub trends: TrendAnalysis,
    pub interview_analytics: InterviewAnalytics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_org_insights: Option<CrossOrgInsights>,
}

async fn count(pool: &PgPool, sql: &str, scope: Option<Uuid>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql).bind(scope).fetch_one(pool).await
}

async fn count_since(
    pool: &PgPool,
    sql: &str,
    scope: Option<Uuid>,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql)
        .bind(scope)
        .bind(since)
        .fetch_one(pool)
        .await
}

const APPLICATIONS_SINCE: &str = r#"
    SELECT COUNT(*) FROM interview_applications a
    JOIN interviews i ON i.id = a.interview_id
    WHERE ($1::uuid IS NULL OR i.organization_id = $1) AND a.applied_at >= $2
"#;

async fn overview(
    pool: &PgPool,
    scope: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Overview, sqlx::Error> {
    let total_candidates = count(
        pool,
        "SELECT COUNT(*) FROM users WHERE role = 'candidate' \
         AND ($1::uuid IS NULL OR organization_id = $1)",
        scope,
    )
    .await?;
    let total_interviews = count(
        pool,
        "SELECT COUNT(*) FROM interviews WHERE $1::uuid IS NULL OR organization_id = $1",
        scope,
    )
    .await?;
    let total_applications = count(
        pool,
        "SELECT COUNT(*) FROM interview_applications a JOIN interviews i ON i.id = a.interview_id \
         WHERE $1::uuid IS NULL OR i.organization_id = $1",
        scope,
    )
    .await?;
    let total_responses = count(
        pool,
        "SELECT COUNT(*) FROM interview_responses r JOIN interviews i ON i.id = r.interview_id \
         WHERE $1::uuid IS NULL OR i.organization_id = $1",
        scope,
    )
    .await?;
    let organization_name: Option<String> = match scope {
        Some(org) => {
            sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
                .bind(org)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok(Overview {
        total_candidates,
        total_interviews,
        total_applications,
        total_responses,
        scope: if scope.is_some() {
            Scope::Organization
        } else {
            Scope::CrossOrganizational
        },
        organization_name,
        generated_at: now,
    })
}

async fn pipeline(
    pool: &PgPool,
    scope: Option<Uuid>,
    since: DateTime<Utc>,
) -> Result<PipelineMetrics, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT a.status::text, COUNT(*)
        FROM interview_applications a
        JOIN interviews i ON i.id = a.interview_id
        WHERE $1::uuid IS NULL OR i.organization_id = $1
        GROUP BY a.status
        "#,
    )
    .bind(scope)
    .fetch_all(pool)
    .await?;
    let status_distribution: BTreeMap<String, i64> = rows.into_iter().collect();
    let total_in_pipeline: i64 = status_distribution.values().sum();
    let approved = status_distribution.get("approved").copied().unwrap_or(0);
    let recent_applications = count_since(pool, APPLICATIONS_SINCE, scope, since).await?;

    Ok(PipelineMetrics {
        approval_rate: percentage(approved, total_in_pipeline),
        status_distribution,
        recent_applications,
        total_in_pipeline,
    })
}

async fn performance(
    pool: &PgPool,
    scope: Option<Uuid>,
    since: DateTime<Utc>,
) -> Result<PerformanceMetrics, sqlx::Error> {
    let (total, successful): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE r.ai_score >= $3)
        FROM interview_responses r
        JOIN interviews i ON i.id = r.interview_id
        WHERE ($1::uuid IS NULL OR i.organization_id = $1) AND r.completed_at >= $2
        "#,
    )
    .bind(scope)
    .bind(since)
    .bind(SUCCESS_SCORE)
    .fetch_one(pool)
    .await?;

    Ok(PerformanceMetrics {
        interview_success_rate: percentage(successful, total),
        total_interviews_conducted: total,
        successful_interviews: successful,
    })
}

async fn interview_analytics(
    pool: &PgPool,
    scope: Option<Uuid>,
    since: DateTime<Utc>,
) -> Result<InterviewAnalytics, sqlx::Error> {
    let total_interviews = count_since(
        pool,
        "SELECT COUNT(*) FROM interviews \
         WHERE ($1::uuid IS NULL OR organization_id = $1) AND created_at >= $2",
        scope,
        since,
    )
    .await?;
    let completed_interviews = count_since(
        pool,
        "SELECT COUNT(*) FROM interview_responses r JOIN interviews i ON i.id = r.interview_id \
         WHERE ($1::uuid IS NULL OR i.organization_id = $1) AND i.created_at >= $2",
        scope,
        since,
    )
    .await?;
    let scores: Vec<f64> = sqlx::query_scalar(
        r#"
        SELECT r.ai_score FROM interview_responses r
        JOIN interviews i ON i.id = r.interview_id
        WHERE ($1::uuid IS NULL OR i.organization_id = $1)
          AND i.created_at >= $2 AND r.ai_score IS NOT NULL
        "#,
    )
    .bind(scope)
    .bind(since)
    .fetch_all(pool)
    .await?;

    let average_score = if scores.is_empty() {
        0.0
    } else {
        round2(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Ok(InterviewAnalytics {
        total_interviews,
        completed_interviews,
        completion_rate: percentage(completed_interviews, total_interviews),
        average_score,
        score_distribution: ScoreDistribution::from_scores(&scores),
    })
}

async fn cross_org_insights(pool: &PgPool) -> Result<CrossOrgInsights, sqlx::Error> {
    let total_organizations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(pool)
        .await?;
    let top_organizations: Vec<OrganizationRanking> = sqlx::query_as(
        r#"
        SELECT o.name,
               (SELECT COUNT(*) FROM users u
                 WHERE u.organization_id = o.id AND u.role = 'candidate') AS candidates,
               (SELECT COUNT(*) FROM interviews i WHERE i.organization_id = o.id) AS interviews
        FROM organizations o
        ORDER BY candidates DESC, o.name
        LIMIT $1
        "#,
    )
    .bind(TOP_ORGANIZATIONS)
    .fetch_all(pool)
    .await?;
    let total_platform_candidates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'candidate'")
            .fetch_one(pool)
            .await?;
    let total_platform_interviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interviews")
        .fetch_one(pool)
        .await?;

    Ok(CrossOrgInsights {
        total_organizations,
        top_organizations,
        total_platform_candidates,
        total_platform_interviews,
    })
}

/// Builds the full dashboard for one organization, or for the platform when `scope`
/// is `None`.
pub async fn dashboard(pool: &PgPool, scope: Option<Uuid>) -> Result<Dashboard, sqlx::Error> {
    let now = Utc::now();
    let window_start = now - Duration::days(REPORTING_WINDOW_DAYS);
    let week_start = now - Duration::days(7);

    let applications_30 = count_since(pool, APPLICATIONS_SINCE, scope, window_start).await?;
    let applications_7 = count_since(pool, APPLICATIONS_SINCE, scope, week_start).await?;

    Ok(Dashboard {
        overview: overview(pool, scope, now).await?,
        pipeline: pipeline(pool, scope, window_start).await?,
        performance: performance(pool, scope, window_start).await?,
        trends: TrendAnalysis::from_counts(applications_30, applications_7),
        interview_analytics: interview_analytics(pool, scope, window_start).await?,
        cross_org_insights: match scope {
            None => Some(cross_org_insights(pool).await?),
            Some(_) => None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_distribution_bands() {
        let dist = ScoreDistribution::from_scores(&[100.0, 90.0, 89.9, 70.0, 69.5, 50.0, 49.9, 0.0]);
        assert_eq!(
            dist,
            ScoreDistribution {
                excellent: 2,
                good: 2,
                fair: 2,
                poor: 2,
            }
        );
        assert_eq!(ScoreDistribution::from_scores(&[]), ScoreDistribution::default());
    }

    #[test]
    fn test_percentage_handles_zero_total() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 2), 100.0);
    }

    #[test]
    fn test_trend_direction() {
        // 30 applications over the window is 7 a week on average.
        let up = TrendAnalysis::from_counts(30, 14);
        assert_eq!(up.trend_direction, TrendDirection::Up);
        assert_eq!(up.weekly_trend_percentage, 100.0);

        let down = TrendAnalysis::from_counts(30, 0);
        assert_eq!(down.trend_direction, TrendDirection::Down);
        assert_eq!(down.weekly_trend_percentage, -100.0);

        let idle = TrendAnalysis::from_counts(0, 0);
        assert_eq!(idle.trend_direction, TrendDirection::Stable);
        assert_eq!(idle.weekly_trend_percentage, 0.0);
    }
}
