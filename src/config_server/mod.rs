//! # Config Server Integration
//!
//! Clients that store and generate deployment variables, and the interpolator
//! that substitutes `((placeholder))` references with their values.

pub mod client;
pub mod interpolator;

pub use client::{
    variable_path, ConfigServerClient, ConfigServerClientFactory, ConfigServerError,
    DisabledClient, InMemoryConfigServer, SharedClientFactory,
};
pub use interpolator::{
    ConfigServerInterpolator, InterpolationError, InterpolationResult, VariablesInterpolator,
};
