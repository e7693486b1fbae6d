//! # Rollout Core
//!
//! The flow begins by creating a `Config` struct and an `Environment` of
//! resource providers, and using both to build a `DefaultPlanner`. From there,
//! `plan` turns a `Deployment`'s blueprint into a concrete resource map, and
//! the `operation` module keeps that deployment's status up to date as the
//! external workflow engine posts provisioning results back.
//!
//! This keeps the planning internals private, while still making it possible
//! to inspect the results of a planning pass.
//!

pub mod catalog;
pub(crate) mod config;
pub mod events;
pub mod keys;
pub mod model;
pub mod operation;
pub mod planner;
pub mod resolver;
pub mod settings;
pub(crate) mod sync;

pub use config::*;
pub use model::{Deployment, DeploymentStatus, ResourceId, ResourceStatus};
pub use planner::{DefaultPlanner, PlannerError};

#[macro_use]
extern crate derive_builder;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
