//! # Township Sim
//!
//! Runs a [`township_core::Simulation`] through time. The core library
//! provides the affinity model and cascade engine; this crate supplies the
//! parts that only a running town needs:
//!
//! - **Founding**: a grid layout, a founder who becomes mayor, and the
//!   starter businesses ([`builder`])
//! - **Systems**: socializing every timestep and the yearly life cycle
//!   ([`systems`])
//! - **Driver**: the two-timesteps-per-day loop ([`driver`])
//! - **Export**: event log, causality graph and life stories as JSON
//!   ([`export`])
//!
//! Configuration lives in `township.toml` ([`config`]); the subscriber is
//! installed by [`telemetry::init_tracing`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod config;
pub mod driver;
pub mod export;
pub mod systems;
pub mod telemetry;

pub use builder::TownBuilder;
pub use config::{DriverConfig, FoundingConfig, LifeConfig, LoggingConfig};
pub use driver::{Driver, RunSummary};
pub use systems::YearReport;
