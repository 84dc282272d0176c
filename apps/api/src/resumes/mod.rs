pub mod extract;
pub mod handlers;
pub mod service;
pub mod uploads;
