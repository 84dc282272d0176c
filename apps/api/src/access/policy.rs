//! Authorization policy.
//!
//! Every permission question in the API goes through [`authorize`], keyed by
//! (actor role, resource, action). Decisions carry a human-readable reason so a denial can
//! be returned verbatim as a 403 body. Nothing in here touches the database: callers load
//! the facts (see `access::facts`) and pass them in.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{
    ApplicationStatus, Interview, InterviewType, InvitationStatus, ScheduleStatus,
};
use crate::models::technical::TechnicalInterviewAssignment;
use crate::models::user::{User, UserRole};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
}

impl Actor {
    fn same_org(&self, org: Option<Uuid>) -> bool {
        matches!((self.organization_id, org), (Some(a), Some(b)) if a == b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    View,
    /// Open and answer an interview as a candidate.
    Take,
    /// Edit, review applications, invite, schedule, read responses, assign interviewers.
    Manage,
    SubmitFeedback,
    Message,
    Administer,
}

/// What a candidate has on record for one interview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateInterviewFacts {
    pub application_status: Option<ApplicationStatus>,
    pub invitation_status: Option<InvitationStatus>,
    pub schedule_status: Option<ScheduleStatus>,
    pub has_response: bool,
}

/// Visibility-relevant columns of an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterviewAccess {
    pub interview_type: InterviewType,
    pub cross_org_accessible: bool,
    pub public_invitation_enabled: bool,
    pub is_active: bool,
    pub organization_id: Uuid,
}

impl From<&Interview> for InterviewAccess {
    fn from(i: &Interview) -> Self {
        Self {
            interview_type: i.interview_type,
            cross_org_accessible: i.cross_org_accessible,
            public_invitation_enabled: i.public_invitation_enabled,
            is_active: i.is_active,
            organization_id: i.organization_id,
        }
    }
}

/// Profile facts used for cross-tenant visibility and messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileAccess {
    pub user_id: Uuid,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
    pub public_profile_enabled: bool,
    pub cross_org_accessible: bool,
}

impl From<&User> for ProfileAccess {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            role: u.role,
            organization_id: u.organization_id,
            public_profile_enabled: u.public_profile_enabled,
            cross_org_accessible: u.cross_org_accessible,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Interview {
        interview: InterviewAccess,
        candidate: Option<&'a CandidateInterviewFacts>,
    },
    /// A new interview inside the given organization.
    NewInterview { organization_id: Option<Uuid> },
    Profile(&'a ProfileAccess),
    TechnicalAssignment(&'a TechnicalInterviewAssignment),
    /// Tenant-level data: stats, analytics, audit trail.
    Organization(Option<Uuid>),
    /// Cross-tenant maintenance: backfills, demo seeding.
    Platform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }

    /// Converts a denial into a 403.
    pub fn require(self) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(self.reason))
        }
    }
}

pub fn authorize(actor: &Actor, resource: Resource<'_>, action: Action) -> Decision {
    use Action::*;
    use UserRole::*;

    match (actor.role, resource, action) {
        (SuperAdmin, _, _) => Decision::allow("Super admin"),

        (Candidate, Resource::Interview { interview, candidate }, View | Take) => {
            let facts = candidate.copied().unwrap_or_default();
            interview_visibility(&interview, &facts)
        }
        (TechnicalPerson, Resource::Interview { interview, .. }, View) => {
            same_org(actor, Some(interview.organization_id), "Interview")
        }
        (Recruiter | Admin, Resource::Interview { interview, .. }, View) => {
            if actor.same_org(Some(interview.organization_id)) {
                Decision::allow("Interview belongs to your organization")
            } else if interview.interview_type == InterviewType::Public
                && interview.cross_org_accessible
            {
                Decision::allow("Interview is shared across organizations")
            } else {
                Decision::deny("Interview belongs to another organization")
            }
        }
        (Recruiter | Admin, Resource::Interview { interview, .. }, Manage) => {
            same_org(actor, Some(interview.organization_id), "Interview")
        }

        (Recruiter | Admin, Resource::NewInterview { organization_id }, Create) => {
            if organization_id.is_some() && actor.same_org(organization_id) {
                Decision::allow("Recruiters create interviews in their organization")
            } else {
                Decision::deny("Interviews can only be created inside your organization")
            }
        }

        (_, Resource::Profile(profile), View) if profile.user_id == actor.user_id => {
            Decision::allow("Own profile")
        }
        (Recruiter | Admin, Resource::Profile(profile), View) => {
            if actor.same_org(profile.organization_id) {
                Decision::allow("Profile belongs to your organization")
            } else if profile.public_profile_enabled && profile.cross_org_accessible {
                Decision::allow("Profile is public")
            } else {
                Decision::deny("Profile is private to another organization")
            }
        }
        (TechnicalPerson, Resource::Profile(profile), View) => {
            same_org(actor, profile.organization_id, "Profile")
        }
        (_, Resource::Profile(recipient), Message) => can_message(actor, recipient),

        (TechnicalPerson, Resource::TechnicalAssignment(a), View | SubmitFeedback) => {
            if a.technical_person_id == actor.user_id {
                Decision::allow("Assigned to you")
            } else {
                Decision::deny("Technical interview is assigned to someone else")
            }
        }
        (Recruiter | Admin, Resource::TechnicalAssignment(a), View | Manage) => {
            same_org(actor, Some(a.organization_id), "Technical interview")
        }

        (Recruiter | Admin, Resource::Organization(org), View) => {
            same_org(actor, org, "Organization data")
        }
        (Admin, Resource::Organization(org), Administer) => same_org(actor, org, "Organization"),

        (role, _, action) => Decision::deny(format!(
            "Role '{}' may not perform {:?} on this resource",
            role.as_str(),
            action
        )),
    }
}

/// Whether a candidate may open (and take) an interview.
///
/// - `public`: approved application, or either sharing flag, or an accepted invitation
/// - `private`: accepted invitation only
/// - `scheduled`: a booking still in `scheduled` status only
pub fn interview_visibility(
    interview: &InterviewAccess,
    facts: &CandidateInterviewFacts,
) -> Decision {
    if !interview.is_active {
        return Decision::deny("Interview is no longer active");
    }

    let accepted_invitation = facts.invitation_status == Some(InvitationStatus::Accepted);

    match interview.interview_type {
        InterviewType::Public => {
            if facts.application_status == Some(ApplicationStatus::Approved) {
                Decision::allow("Application approved")
            } else if interview.cross_org_accessible {
                Decision::allow("Interview is open across organizations")
            } else if interview.public_invitation_enabled {
                Decision::allow("Interview is open to the public")
            } else if accepted_invitation {
                Decision::allow("Invitation accepted")
            } else {
                Decision::deny("Apply and wait for approval to access this interview")
            }
        }
        InterviewType::Private => {
            if accepted_invitation {
                Decision::allow("Invitation accepted")
            } else {
                Decision::deny("This interview is by invitation only")
            }
        }
        InterviewType::Scheduled => {
            if facts.schedule_status == Some(ScheduleStatus::Scheduled) {
                Decision::allow("Interview slot booked")
            } else {
                Decision::deny("No scheduled slot for this interview")
            }
        }
    }
}

/// Messaging rule: same organization, a super admin sender, or a candidate recipient that
/// opted into cross-organization contact.
fn can_message(actor: &Actor, recipient: &ProfileAccess) -> Decision {
    if recipient.user_id == actor.user_id {
        Decision::deny("You cannot message yourself")
    } else if actor.same_org(recipient.organization_id) {
        Decision::allow("Same organization")
    } else if recipient.role == UserRole::Candidate && recipient.cross_org_accessible {
        Decision::allow("Candidate accepts cross-organization contact")
    } else {
        Decision::deny("Recipient is not reachable from your organization")
    }
}

fn same_org(actor: &Actor, org: Option<Uuid>, what: &str) -> Decision {
    if actor.same_org(org) {
        Decision::allow(format!("{what} belongs to your organization"))
    } else {
        Decision::deny(format!("{what} belongs to another organization"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::technical::AssignmentStatus;

    const APPLICATION: [Option<ApplicationStatus>; 4] = [
        None,
        Some(ApplicationStatus::Applied),
        Some(ApplicationStatus::Approved),
        Some(ApplicationStatus::Rejected),
    ];
    const INVITATION: [Option<InvitationStatus>; 5] = [
        None,
        Some(InvitationStatus::Pending),
        Some(InvitationStatus::Accepted),
        Some(InvitationStatus::Declined),
        Some(InvitationStatus::Expired),
    ];
    const SCHEDULE: [Option<ScheduleStatus>; 4] = [
        None,
        Some(ScheduleStatus::Scheduled),
        Some(ScheduleStatus::Completed),
        Some(ScheduleStatus::Cancelled),
    ];

    fn interview(kind: InterviewType, cross_org: bool, public_inv: bool) -> InterviewAccess {
        InterviewAccess {
            interview_type: kind,
            cross_org_accessible: cross_org,
            public_invitation_enabled: public_inv,
            is_active: true,
            organization_id: Uuid::new_v4(),
        }
    }

    fn all_facts() -> Vec<CandidateInterviewFacts> {
        let mut out = Vec::new();
        for application_status in APPLICATION {
            for invitation_status in INVITATION {
                for schedule_status in SCHEDULE {
                    out.push(CandidateInterviewFacts {
                        application_status,
                        invitation_status,
                        schedule_status,
                        has_response: false,
                    });
                }
            }
        }
        out
    }

    fn actor(role: UserRole, org: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            organization_id: org,
        }
    }

    #[test]
    fn test_visibility_matches_rules_for_full_cross_product() {
        for kind in [
            InterviewType::Public,
            InterviewType::Private,
            InterviewType::Scheduled,
        ] {
            for cross_org in [false, true] {
                for public_inv in [false, true] {
                    let iv = interview(kind, cross_org, public_inv);
                    for facts in all_facts() {
                        let accepted =
                            facts.invitation_status == Some(InvitationStatus::Accepted);
                        let expected = match kind {
                            InterviewType::Public => {
                                facts.application_status == Some(ApplicationStatus::Approved)
                                    || cross_org
                                    || public_inv
                                    || accepted
                            }
                            InterviewType::Private => accepted,
                            InterviewType::Scheduled => {
                                facts.schedule_status == Some(ScheduleStatus::Scheduled)
                            }
                        };
                        let decision = interview_visibility(&iv, &facts);
                        assert_eq!(
                            decision.allowed, expected,
                            "{kind:?} cross_org={cross_org} public_inv={public_inv} {facts:?}"
                        );
                        assert!(!decision.reason.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_inactive_interview_hidden_from_candidates() {
        let mut iv = interview(InterviewType::Public, true, true);
        iv.is_active = false;
        let facts = CandidateInterviewFacts {
            application_status: Some(ApplicationStatus::Approved),
            ..Default::default()
        };
        assert!(!interview_visibility(&iv, &facts).allowed);
    }

    #[test]
    fn test_public_invitation_open_to_candidate_from_any_org() {
        let iv = interview(InterviewType::Public, false, true);
        let outsider = actor(UserRole::Candidate, Some(Uuid::new_v4()));
        let decision = authorize(
            &outsider,
            Resource::Interview {
                interview: iv,
                candidate: None,
            },
            Action::Take,
        );
        assert!(decision.allowed);
    }

    #[test]
    fn test_recruiter_manages_only_own_org() {
        let org = Uuid::new_v4();
        let mut iv = interview(InterviewType::Private, false, false);
        iv.organization_id = org;
        let resource = Resource::Interview {
            interview: iv,
            candidate: None,
        };

        assert!(authorize(&actor(UserRole::Recruiter, Some(org)), resource, Action::Manage).allowed);
        let outsider = actor(UserRole::Recruiter, Some(Uuid::new_v4()));
        let decision = authorize(&outsider, resource, Action::Manage);
        assert!(!decision.allowed);
        assert!(decision.reason.contains("another organization"));
        assert!(authorize(&actor(UserRole::SuperAdmin, None), resource, Action::Manage).allowed);
    }

    #[test]
    fn test_candidate_cannot_manage_or_create() {
        let org = Some(Uuid::new_v4());
        let candidate = actor(UserRole::Candidate, org);
        let iv = interview(InterviewType::Public, true, true);
        assert!(
            !authorize(
                &candidate,
                Resource::Interview {
                    interview: iv,
                    candidate: None
                },
                Action::Manage
            )
            .allowed
        );
        assert!(
            !authorize(
                &candidate,
                Resource::NewInterview {
                    organization_id: org
                },
                Action::Create
            )
            .allowed
        );
    }

    #[test]
    fn test_recruiter_without_org_cannot_create() {
        let recruiter = actor(UserRole::Recruiter, None);
        let decision = authorize(
            &recruiter,
            Resource::NewInterview {
                organization_id: None,
            },
            Action::Create,
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn test_messaging_rules() {
        let org_a = Some(Uuid::new_v4());
        let org_b = Some(Uuid::new_v4());
        let recruiter = actor(UserRole::Recruiter, org_a);
        let profile = |role, org, cross| ProfileAccess {
            user_id: Uuid::new_v4(),
            role,
            organization_id: org,
            public_profile_enabled: true,
            cross_org_accessible: cross,
        };

        let colleague = profile(UserRole::Recruiter, org_a, false);
        assert!(authorize(&recruiter, Resource::Profile(&colleague), Action::Message).allowed);

        let open_candidate = profile(UserRole::Candidate, org_b, true);
        assert!(authorize(&recruiter, Resource::Profile(&open_candidate), Action::Message).allowed);

        let closed_candidate = profile(UserRole::Candidate, org_b, false);
        assert!(
            !authorize(&recruiter, Resource::Profile(&closed_candidate), Action::Message).allowed
        );

        let foreign_recruiter = profile(UserRole::Recruiter, org_b, true);
        assert!(
            !authorize(&recruiter, Resource::Profile(&foreign_recruiter), Action::Message)
                .allowed
        );

        let super_admin = actor(UserRole::SuperAdmin, None);
        assert!(
            authorize(&super_admin, Resource::Profile(&closed_candidate), Action::Message)
                .allowed
        );
    }

    #[test]
    fn test_recruiter_sees_public_profiles_across_orgs() {
        let recruiter = actor(UserRole::Recruiter, Some(Uuid::new_v4()));
        let mut candidate = ProfileAccess {
            user_id: Uuid::new_v4(),
            role: UserRole::Candidate,
            organization_id: Some(Uuid::new_v4()),
            public_profile_enabled: true,
            cross_org_accessible: true,
        };
        assert!(authorize(&recruiter, Resource::Profile(&candidate), Action::View).allowed);
        candidate.public_profile_enabled = false;
        assert!(!authorize(&recruiter, Resource::Profile(&candidate), Action::View).allowed);
    }

    #[test]
    fn test_technical_person_limited_to_own_assignment() {
        let org = Uuid::new_v4();
        let tech = actor(UserRole::TechnicalPerson, Some(org));
        let mut assignment = TechnicalInterviewAssignment {
            id: Uuid::new_v4(),
            interview_id: Uuid::new_v4(),
            technical_person_id: tech.user_id,
            candidate_id: Uuid::new_v4(),
            organization_id: org,
            assigned_by: Uuid::new_v4(),
            interview_date: Some(Utc::now()),
            meeting_link: None,
            status: AssignmentStatus::Pending,
            created_at: Utc::now(),
        };
        assert!(
            authorize(
                &tech,
                Resource::TechnicalAssignment(&assignment),
                Action::SubmitFeedback
            )
            .allowed
        );
        assignment.technical_person_id = Uuid::new_v4();
        assert!(
            !authorize(
                &tech,
                Resource::TechnicalAssignment(&assignment),
                Action::SubmitFeedback
            )
            .allowed
        );
    }

    #[test]
    fn test_platform_actions_need_super_admin() {
        let admin = actor(UserRole::Admin, Some(Uuid::new_v4()));
        assert!(!authorize(&admin, Resource::Platform, Action::Administer).allowed);
        let root = actor(UserRole::SuperAdmin, None);
        assert!(authorize(&root, Resource::Platform, Action::Administer).allowed);
    }

    #[test]
    fn test_denial_converts_to_forbidden() {
        let err = Decision::deny("nope").require().unwrap_err();
        assert!(matches!(err, AppError::Forbidden(reason) if reason == "nope"));
    }
}
