//! modernizr_core - functional core of the live store migration layer.
//!
//! Everything in this crate is pure: domain models, the repository contracts
//! both backing stores implement, and the migration phase logic that decides
//! where reads and writes go. The imperative shell lives in the `modernizr`
//! crate.

pub mod migration;
pub mod models;
pub mod storage;
