pub mod facts;
pub mod policy;

pub use facts::load_candidate_interview_facts;
pub use policy::{authorize, Action, Actor, Decision, Resource};
