//! # Township Core
//!
//! Social-affinity model and event-causality engine for a multi-generational
//! town simulation.
//!
//! Every agent keeps a ledger of directed relationship records about the
//! people they have met. Each record accrues two affinity scores:
//!
//! - **Charge**: platonic affinity, driving Acquaintance → Friendship or Enmity
//! - **Spark**: romantic affinity, driving the love-interest pointer
//!
//! Agents also keep a **salience** score toward everyone they know, and four
//! **social pointers** (best friend, worst enemy, love interest, significant
//! other).
//!
//! Life events (births, deaths, marriages, hirings, demolitions and the rest)
//! are appended to a single totally ordered log. Each public operation on
//! [`Simulation`] runs as a cascade: its follow-up work is queued and drained
//! before the call returns, and every caused event records its reason.
//!
//! ## Determinism Contract
//!
//! One seeded `ChaCha8Rng` drives every stochastic decision, and every
//! collection that is iterated while drawing is ordered. A fixed seed and
//! configuration reproduce the same event log.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod affinity;
pub mod agent;
mod business;
pub mod company;
pub mod config;
pub mod context;
pub mod dwelling;
pub mod error;
pub mod event;
pub mod family;
pub mod heuristics;
mod hiring;
mod housing;
pub mod layout;
mod life;
pub mod metrics;
pub mod occupation;
mod outsider;
pub mod pointers;
pub mod relationship;
pub mod salience;
pub mod simulation;
pub mod town;
pub mod types;

pub use agent::{Agent, AgentSeed};
pub use config::TownConfig;
pub use context::SimContext;
pub use error::{Result, TownError};
pub use event::{CausalGraph, Cause, Event, EventKind, EventTag};
pub use layout::{GridLayout, NameSource, SyllableNames, TownLayout};
pub use metrics::{CounterSnapshot, SimCounters};
pub use simulation::{Cascade, Effect, Simulation};
pub use business::STARTING_UNITS;
pub use housing::EXPANSION_UNITS;
pub use town::Town;
pub use types::*;
