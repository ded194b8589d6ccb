//! Live migration layer between a relational store and a distributed store.
//!
//! The [`factory::RepositoryFactory`] hands out one repository per entity.
//! Depending on the migration phase held by a [`flags::FeatureFlagStore`],
//! that repository is either a single store adapter or a dual-write wrapper
//! that mirrors writes and routes (and optionally shadows) reads.

pub mod config;
pub mod factory;
pub mod flags;
pub mod simulate;
pub mod storage;
