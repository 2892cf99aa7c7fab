#![allow(clippy::doc_markdown)] // Allow technical terms like BOSH, YAML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Director Core
//!
//! Orchestration core of a cloud deployment director.
//!
//! ## Overview
//!
//! Given a deployment manifest, the director versions the deployment's
//! variables, renders every job's configuration templates, compiles packages
//! and applies the resulting changes to a fleet of virtual machines. This crate
//! owns the sequencing of that work; planning, compilation, the infrastructure
//! update itself and persistence are collaborators expressed as traits.
//!
//! ## Architecture
//!
//! - A bounded, lazily spawned [`worker_pool::WorkerPool`] runs the parallel
//!   phases and hands the first failure back to the controlling thread
//! - [`orchestration::UpdateDeployment`] drives the phases in order, stops
//!   after rendering for dry runs and always closes the audit trail
//! - Rendering failures are collected per instance group, job and link and
//!   reported together
//!
//! ## Module Organization
//!
//! - [`worker_pool`] - Bounded thread pool with first-failure propagation
//! - [`orchestration`] - Update sequencing and its stages
//! - [`config_server`] - Variable storage clients and `((placeholder))` interpolation
//! - [`deployment_plan`] - Plan, planner and update-step interfaces
//! - [`state_machine`] - Update phases and legal transitions
//! - [`models`] - Deployment records, audit events, tasks
//! - [`persistence`] - Repository interfaces and in-memory implementations
//! - [`locking`] - Per-deployment exclusive locks
//! - [`events`] - Health-monitor notifications
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use director_core::config::ConfigManager;
//! use director_core::logging::init_structured_logging;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! init_structured_logging(&manager.config().logging);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod config_server;
pub mod constants;
pub mod deployment_plan;
pub mod error;
pub mod events;
pub mod locking;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod state_machine;
pub mod worker_pool;

pub use config::{ConfigManager, DirectorConfig};
pub use error::{DirectorError, Result};
pub use orchestration::{Collaborators, UpdateDeployment};
pub use worker_pool::{PoolError, WorkerPool};
