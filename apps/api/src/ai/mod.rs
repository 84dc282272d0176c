//! AI features. Each wrapper goes through [`fallback::call_with_fallback`] and
//! returns a usable value whether or not the model answered.

pub mod cover_letter;
pub mod cv_analysis;
pub mod fallback;
pub mod prompts;
pub mod questions;
pub mod resume_parse;
pub mod scoring;
pub mod sentiment;
pub mod video;

pub use fallback::{AiOutcome, FailureKind};
