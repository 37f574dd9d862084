//! Applicant intake forms: field state, repeated groups, attachment staging and
//! the submission gate, plus the session service and HTTP router built on them.

pub mod config;
pub mod error;
pub mod forms;
pub mod telemetry;
