//! Algorithm implementations for acidosis episode detection
//!
//! `acidosis` holds the per-subject detection core; `cohort` runs it over a
//! batch of subjects and aggregates the results.

pub mod acidosis;
pub mod cohort;
