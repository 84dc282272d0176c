pub mod artifacts;
pub mod audit;
pub mod interview;
pub mod message;
pub mod organization;
pub mod technical;
pub mod user;
