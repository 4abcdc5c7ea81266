//! Maven dependency version checking, auditing and upgrading.
//!
//! The pure core (version comparison, classification, resolution and
//! upgrade planning) lives in [`maven::version`], [`model`] and [`agents`];
//! I/O sits behind the [`repository`] traits and the [`pom`] reader/editor.

pub mod agents;
pub mod cli;
pub mod error;
pub mod maven;
pub mod model;
pub mod pom;
pub mod repository;
pub mod utils;
pub mod workflow;

pub use error::{PomupError, Result};
