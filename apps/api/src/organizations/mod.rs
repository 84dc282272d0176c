pub mod handlers;
pub mod resolver;
pub mod service;
pub mod store;

pub use resolver::{assign_candidate_to_organization, Assignment, AssignmentSource};
pub use store::{OrganizationStore, PgOrganizationStore};
