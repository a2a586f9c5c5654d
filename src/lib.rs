//! Sahaya — emergency-alert dispatch core for a rural telehealth network.
//!
//! Patients raise geo-tagged alerts; ASHA/ANM/CHO health workers accept them
//! through compare-and-swap status transitions, so two workers racing on the
//! same alert can never both win. Viewing clients mirror alert state through
//! a fixed-interval poll session that stops itself at terminal states.

pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod emergency;
pub mod location;
pub mod models;
pub mod poll;
