//! The timestep loop.
//!
//! A [`Driver`] owns a founded [`Simulation`] and advances it two timesteps
//! per day. Every timestep residents socialize; every new day birthdays are
//! celebrated; the first day of each year runs the yearly systems.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;
use township_core::{CounterSnapshot, EventTag, Result, Simulation};

use crate::builder::TownBuilder;
use crate::config::{DriverConfig, LifeConfig};
use crate::systems::{self, YearReport};

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Year the run started in.
    pub start_year: i32,
    /// Year the run ended in.
    pub end_year: i32,
    /// Timesteps simulated.
    pub timesteps: u64,
    /// Residents at the end.
    pub population: usize,
    /// Agents who left town, ever.
    pub departed: usize,
    /// Agents who died, ever.
    pub deceased: usize,
    /// Logged events by kind, over the whole history.
    pub events: BTreeMap<String, usize>,
    /// One report per yearly pass.
    pub years: Vec<YearReport>,
    /// Counter values at the end.
    pub counters: CounterSnapshot,
}

/// Drives a simulation through time.
pub struct Driver {
    sim: Simulation,
    life: LifeConfig,
    years: Vec<YearReport>,
}

impl Driver {
    /// Found a town from `config` and wrap it.
    ///
    /// # Errors
    /// Propagates founding errors.
    pub fn new(config: DriverConfig) -> Result<Self> {
        let life = config.life.clone();
        let sim = TownBuilder::new(config).build()?;
        Ok(Self::from_simulation(sim, life))
    }

    /// Wrap an existing simulation.
    #[must_use]
    pub const fn from_simulation(sim: Simulation, life: LifeConfig) -> Self {
        Self {
            sim,
            life,
            years: Vec::new(),
        }
    }

    /// The wrapped simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable access to the wrapped simulation.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Reports of every yearly pass so far.
    #[must_use]
    pub fn years(&self) -> &[YearReport] {
        &self.years
    }

    /// Advance one timestep.
    ///
    /// # Errors
    /// Propagates any cascade failure, or a calendar overflow.
    pub fn step(&mut self) -> Result<()> {
        let new_day = self.sim.ctx_mut().advance_timestep()?;
        self.sim.begin_timestep();
        systems::socialize(&mut self.sim, 1.0)?;
        if !new_day {
            return Ok(());
        }
        self.sim.celebrate_birthdays()?;
        let today = self.sim.ctx().date();
        if today.month == 1 && today.day == 1 {
            let report = systems::run_yearly(&mut self.sim, &self.life)?;
            info!(
                year = report.year,
                population = self.sim.town().population(),
                deaths = report.deaths,
                births = report.births,
                marriages = report.marriages,
                closures = report.closures,
                "year passed"
            );
            self.years.push(report);
        }
        Ok(())
    }

    /// Step until `years` calendar years have gone by.
    ///
    /// # Errors
    /// Propagates any step failure.
    pub fn run_years(&mut self, years: u32) -> Result<RunSummary> {
        let start_year = self.sim.ctx().year();
        let start_steps = self.sim.ctx().elapsed_timesteps();
        let first_report = self.years.len();
        let target = start_year.saturating_add_unsigned(years);
        while self.sim.ctx().year() < target {
            self.step()?;
        }
        let town = self.sim.town();
        let events = EventTag::ALL
            .iter()
            .map(|tag| (tag.label().to_string(), town.events().count(*tag)))
            .collect();
        let summary = RunSummary {
            start_year,
            end_year: self.sim.ctx().year(),
            timesteps: self.sim.ctx().elapsed_timesteps() - start_steps,
            population: town.population(),
            departed: town.departed().count(),
            deceased: town.deceased().count(),
            events,
            years: self.years[first_report..].to_vec(),
            counters: self.sim.metrics().snapshot(),
        };
        info!(
            from = summary.start_year,
            to = summary.end_year,
            population = summary.population,
            events = town.events().len(),
            "run finished"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("date", &self.sim.ctx().date())
            .field("population", &self.sim.town().population())
            .field("years", &self.years.len())
            .finish_non_exhaustive()
    }
}
