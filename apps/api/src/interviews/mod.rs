pub mod handlers;
pub mod invitations;
pub mod responses;
pub mod scheduling;
pub mod service;
