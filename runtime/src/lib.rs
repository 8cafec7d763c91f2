// Copyright 2026 Taproom Contributors
// SPDX-License-Identifier: Apache-2.0

//! Taproom runtime library: brewery discovery and tap-list acquisition.
//!
//! [`orchestrator::AcquisitionOrchestrator`] is the entry point. It consults
//! the [`cache`], falls back to [`discovery`] over a [`geo`] provider, and
//! fills each brewery's tap list through [`acquisition`].

pub mod acquisition;
pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod geo;
pub mod maintenance;
pub mod model;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::PipelineConfig;
pub use model::{Beer, Brewery};
pub use orchestrator::AcquisitionOrchestrator;
