pub mod handlers;
pub mod pool;
pub mod profile;
