//! Causality engine — the top-level orchestrator.
//!
//! Every public operation on [`Simulation`] is a *cascade*: the root action
//! runs, its follow-up work is pushed onto a FIFO [`Task`] queue, and the
//! queue is drained to empty before the call returns. Nothing recurses
//! through the call stack except the refill hire inside a termination, which
//! must run before the vacated record is marked ended.
//!
//! The [`Cascade`] returned by each operation is the journal of everything it
//! did, in order: events appended plus the occupation and ownership changes
//! that are not themselves events.
//!
//! Cascades are not transactional. An operation that fails after it began
//! changing the town leaves those changes in place, and the registry may no
//! longer be consistent. Such a failure is fatal: the simulation records it
//! and refuses every later operation, so it should be discarded.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::TownConfig;
use crate::context::SimContext;
use crate::error::{Result, TownError};
use crate::event::{CausalGraph, Cause, EventKind, EventTag};
use crate::layout::{NameSource, TownLayout};
use crate::metrics::{CascadeHistogram, SimCounters, spans};
use crate::occupation::OccupationKind;
use crate::relationship;
use crate::town::Town;
use crate::types::{AgentId, CompanyId, DwellingId, EventId, OccupationId, RelationshipId};

/// Deferred follow-up work inside a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Task {
    /// End a position whose holder took another job.
    Terminate {
        occupation: OccupationId,
        reason: EventId,
    },
    /// An agent leaves town, then everyone in `forced_family` still resident.
    DepartTown {
        agent: AgentId,
        forced_family: Vec<AgentId>,
        reason: Option<EventId>,
    },
    /// A resident of a demolished dwelling looks for a new home.
    Rehouse {
        agent: AgentId,
        displaced_from: DwellingId,
        reason: EventId,
    },
    /// A household that must find a home together (after marriage or divorce).
    Resettle {
        household: Vec<AgentId>,
        reason: EventId,
    },
    /// An outsider hired into town finds somewhere to live.
    SettleNewcomer { agent: AgentId, hiring: EventId },
}

/// One entry of a cascade journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// An event was appended to the log.
    Event(EventId),
    /// A position began termination.
    Vacated(OccupationId),
    /// A position was marked ended.
    Ended(OccupationId),
    /// A home passed to an heir.
    OwnershipTransferred {
        /// The home.
        dwelling: DwellingId,
        /// New sole owner.
        heir: AgentId,
    },
    /// A vacated supplemental position went back to the pool.
    VacancyPooled {
        /// Employer.
        company: CompanyId,
        /// Kind returned.
        kind: OccupationKind,
    },
    /// A vacated favor position was dropped for good.
    VacancyDropped {
        /// The dropped position.
        occupation: OccupationId,
    },
}

/// Journal of one completed cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cascade {
    /// Event that started the cascade, if the root logged one.
    pub root: Option<EventId>,
    /// Everything that happened, in order.
    pub effects: Vec<Effect>,
}

impl Cascade {
    /// Events appended, in sequence order.
    #[must_use]
    pub fn events(&self) -> Vec<EventId> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Event(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Events of `tag` appended by this cascade.
    #[must_use]
    pub fn events_tagged(&self, town: &Town, tag: EventTag) -> Vec<EventId> {
        self.events()
            .into_iter()
            .filter(|id| town.event(*id).is_ok_and(|e| e.tag() == tag))
            .collect()
    }

    /// Position of `effect` in the journal.
    #[must_use]
    pub fn position(&self, effect: Effect) -> Option<usize> {
        self.effects.iter().position(|e| *e == effect)
    }
}

/// A town plus everything needed to advance it.
///
/// An `Err` from any operation that had already changed the town leaves it
/// in an undefined state; see [`Simulation::failed_cascade`].
pub struct Simulation {
    pub(crate) town: Town,
    pub(crate) ctx: SimContext,
    pub(crate) layout: Box<dyn TownLayout>,
    pub(crate) names: Box<dyn NameSource>,
    queue: VecDeque<Task>,
    journal: Vec<Effect>,
    in_cascade: bool,
    failed: Option<&'static str>,
    pub(crate) metrics: SimCounters,
    cascade_sizes: CascadeHistogram,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("town", &self.town.name)
            .field("date", &self.ctx.date())
            .field("population", &self.town.population())
            .field("events", &self.town.events().len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// A fresh town with one empty lot per layout lot.
    ///
    /// # Errors
    /// Returns `TownError::Config` if the configuration is invalid.
    pub fn new(
        config: TownConfig,
        layout: Box<dyn TownLayout>,
        names: Box<dyn NameSource>,
    ) -> Result<Self> {
        let mut town = Town::new(config.general.town_name.clone());
        town.add_lots(layout.lot_count());
        let ctx = SimContext::new(config)?;
        Ok(Self {
            town,
            ctx,
            layout,
            names,
            queue: VecDeque::new(),
            journal: Vec::new(),
            in_cascade: false,
            failed: None,
            metrics: SimCounters::new(),
            cascade_sizes: CascadeHistogram::default(),
        })
    }

    /// The registry.
    #[must_use]
    pub const fn town(&self) -> &Town {
        &self.town
    }

    /// Mutable registry, for world setup and tests.
    pub fn town_mut(&mut self) -> &mut Town {
        &mut self.town
    }

    /// The simulation context.
    #[must_use]
    pub const fn ctx(&self) -> &SimContext {
        &self.ctx
    }

    /// Mutable context (clock control, draws).
    pub fn ctx_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    /// Registry and context together, for free functions that need both.
    pub fn parts_mut(&mut self) -> (&mut Town, &mut SimContext) {
        (&mut self.town, &mut self.ctx)
    }

    /// Spatial collaborator.
    #[must_use]
    pub fn layout(&self) -> &dyn TownLayout {
        self.layout.as_ref()
    }

    /// Activity counters.
    #[must_use]
    pub const fn metrics(&self) -> &SimCounters {
        &self.metrics
    }

    /// Cascade-size histogram.
    #[must_use]
    pub const fn cascade_sizes(&self) -> &CascadeHistogram {
        &self.cascade_sizes
    }

    // -- Queries -------------------------------------------------------------

    /// Snapshot of the causality graph.
    #[must_use]
    pub fn causal_graph(&self) -> CausalGraph {
        CausalGraph::build(&self.town)
    }

    /// Events whose recorded reason is `event`.
    #[must_use]
    pub fn events_caused_by(&self, event: EventId) -> Vec<EventId> {
        self.town.events().caused_by(Cause::Event(event))
    }

    /// Every record `owner` has held about `subject`, oldest first.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn relationship_history(&self, owner: AgentId, subject: AgentId) -> Result<Vec<RelationshipId>> {
        relationship::history(&self.town, owner, subject)
    }

    /// Start a simulated timestep: count it and clear every interaction flag.
    pub fn begin_timestep(&mut self) {
        self.ctx.count_simulated_timestep();
        relationship::reset_interaction_flags(&mut self.town);
    }

    /// Clear interaction flags without counting a timestep.
    pub fn reset_interaction_flags(&mut self) {
        relationship::reset_interaction_flags(&mut self.town);
    }

    // -- Cascade machinery ---------------------------------------------------

    /// The operation whose failure left the town half-updated, if any.
    /// Once set, every operation is refused.
    #[must_use]
    pub const fn failed_cascade(&self) -> Option<&'static str> {
        self.failed
    }

    /// Run `root`, then drain the task queue. The journal of everything that
    /// happened is returned.
    ///
    /// On error the queue is discarded but nothing is rolled back. A failure
    /// that comes after the town was changed marks the simulation as failed.
    pub(crate) fn cascade<F>(&mut self, name: &'static str, root: F) -> Result<Cascade>
    where
        F: FnOnce(&mut Self) -> Result<Option<EventId>>,
    {
        if self.in_cascade {
            return Err(TownError::invalid(name, "a cascade is already running"));
        }
        if let Some(failed) = self.failed {
            return Err(TownError::invalid(
                name,
                format!("town left inconsistent by a failed {failed}"),
            ));
        }
        let _span = tracing::debug_span!(spans::CASCADE, operation = name).entered();
        self.in_cascade = true;
        self.journal.clear();
        let records = self.town.record_count();
        let outcome = root(self).and_then(|root| {
            while let Some(task) = self.queue.pop_front() {
                self.run_task(task)?;
            }
            Ok(root)
        });
        self.in_cascade = false;
        self.queue.clear();
        let effects = std::mem::take(&mut self.journal);
        if let Err(e) = &outcome {
            if !effects.is_empty() || self.town.record_count() != records {
                error!(operation = name, error = %e, effects = effects.len(), "cascade failed partway");
                self.failed = Some(name);
            }
        }
        let root = outcome?;
        SimCounters::bump(&self.metrics.cascades_run);
        self.cascade_sizes.record(effects.len() as u64);
        debug!(operation = name, effects = effects.len(), "cascade complete");
        Ok(Cascade { root, effects })
    }

    pub(crate) fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    pub(crate) fn note(&mut self, effect: Effect) {
        self.journal.push(effect);
    }

    fn run_task(&mut self, task: Task) -> Result<()> {
        match task {
            Task::Terminate { occupation, reason } => self.terminate(occupation, reason),
            Task::DepartTown {
                agent,
                forced_family,
                reason,
            } => self.depart(agent, &forced_family, reason).map(|_| ()),
            Task::Rehouse {
                agent,
                displaced_from,
                reason,
            } => self.rehouse(agent, displaced_from, reason),
            Task::Resettle { household, reason } => self.resettle(&household, reason),
            Task::SettleNewcomer { agent, hiring } => self.settle(agent, Some(hiring)),
        }
    }

    /// Append an event, journal it and count it.
    pub(crate) fn log(&mut self, year: Option<i32>, reason: Option<Cause>, kind: EventKind) -> EventId {
        let tag = kind.tag();
        let id = self.town.log(&mut self.ctx, year, reason, kind);
        let retcon = self.town.event(id).is_ok_and(|e| e.retcon);
        self.metrics.record_event(tag, retcon);
        self.journal.push(Effect::Event(id));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GridLayout, SyllableNames};

    fn make_sim() -> Simulation {
        let mut config = TownConfig::default();
        config.general.first_year = 1900;
        Simulation::new(config, Box::new(GridLayout::new(4, 4)), Box::new(SyllableNames))
            .expect("valid config")
    }

    #[test]
    fn new_simulation_has_one_lot_per_layout_lot() {
        let sim = make_sim();
        assert_eq!(sim.town().lots().count(), 16);
        assert_eq!(sim.town().vacant_lots().len(), 16);
    }

    #[test]
    fn empty_cascade_journals_nothing() {
        let mut sim = make_sim();
        let out = sim.cascade("noop", |_| Ok(None)).expect("cascade");
        assert!(out.effects.is_empty());
        assert_eq!(sim.metrics().snapshot().cascades_run, 1);
    }

    #[test]
    fn cascades_do_not_nest() {
        let mut sim = make_sim();
        let err = sim
            .cascade("outer", |s| s.cascade("inner", |_| Ok(None)).map(|_| None))
            .expect_err("nested cascade rejected");
        assert!(matches!(err, TownError::InvalidState { .. }));
    }

    #[test]
    fn rejected_operation_leaves_simulation_usable() {
        let mut sim = make_sim();
        let err = sim
            .cascade("reject", |_| Err(TownError::invalid("reject", "nothing to do")))
            .expect_err("rejected");
        assert!(matches!(err, TownError::InvalidState { .. }));
        assert_eq!(sim.failed_cascade(), None);
        sim.cascade("noop", |_| Ok(None)).expect("still usable");
    }

    #[test]
    fn failure_after_changes_refuses_later_operations() {
        let mut sim = make_sim();
        let err = sim
            .cascade("half_done", |s| {
                s.log(None, None, EventKind::BusinessClosure { company: CompanyId(0) });
                Err(TownError::NoLotAvailable {
                    purpose: "a test".to_string(),
                })
            })
            .expect_err("failed");
        assert!(matches!(err, TownError::NoLotAvailable { .. }));
        assert_eq!(sim.failed_cascade(), Some("half_done"));
        let later = sim.cascade("noop", |_| Ok(None)).expect_err("refused");
        assert!(matches!(later, TownError::InvalidState { .. }));
    }

    #[test]
    fn begin_timestep_counts_and_clears() {
        let mut sim = make_sim();
        sim.begin_timestep();
        sim.begin_timestep();
        assert_eq!(sim.ctx().elapsed_timesteps(), 2);
    }
}
