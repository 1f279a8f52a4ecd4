//! Driver systems.
//!
//! Each system is a plain function over the [`Simulation`]. Per-timestep
//! socializing runs every step; the life-cycle systems run once a year, in
//! a fixed order: retirement, death, marriage, divorce, birth, job seeking
//! and closure. Every draw comes from the simulation's own stream.
//!
//! Candidates are collected up front and re-checked just before acting,
//! since an earlier cascade in the same pass may have changed them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use township_core::pointers;
use township_core::{AgentId, CompanyId, Result, Sex, Shift, Simulation, Town};

use crate::config::LifeConfig;

/// What one yearly pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearReport {
    /// Year the pass ran in.
    pub year: i32,
    /// Workers who retired.
    pub retirements: u32,
    /// Residents who died.
    pub deaths: u32,
    /// Weddings.
    pub marriages: u32,
    /// Divorces.
    pub divorces: u32,
    /// Births.
    pub births: u32,
    /// Jobless workers hired into pooled vacancies.
    pub hires: u32,
    /// Businesses closed.
    pub closures: u32,
}

// ---------------------------------------------------------------------------
// Per-timestep
// ---------------------------------------------------------------------------

/// Everyone `agent` might run into: housemates, coworkers and neighbors.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn social_pool(town: &Town, agent: AgentId) -> Result<Vec<AgentId>> {
    let a = town.agent(agent)?;
    let mut pool: BTreeSet<AgentId> = BTreeSet::new();
    if let Some(home) = a.home {
        pool.extend(town.dwelling(home)?.residents.iter().copied());
    }
    pool.extend(a.coworkers.iter().copied());
    pool.extend(a.neighbors.iter().copied());
    pool.remove(&agent);
    Ok(pool.into_iter().collect())
}

/// Let every resident socialize with their pool. Returns the number of
/// pairs progressed.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn socialize(sim: &mut Simulation, elapsed: f64) -> Result<usize> {
    let residents: Vec<AgentId> = sim.town().residents().collect();
    let mut pairs = 0;
    for agent in residents {
        let pool = social_pool(sim.town(), agent)?;
        pairs += sim.socialize(agent, &pool, elapsed)?;
    }
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// Yearly
// ---------------------------------------------------------------------------

/// Run every yearly life-cycle system.
///
/// # Errors
/// Propagates any cascade failure.
pub fn run_yearly(sim: &mut Simulation, life: &LifeConfig) -> Result<YearReport> {
    let mut report = YearReport {
        year: sim.ctx().year(),
        ..YearReport::default()
    };
    report.retirements = retirements(sim, life)?;
    report.deaths = deaths(sim, life)?;
    report.marriages = marriages(sim, life)?;
    report.divorces = divorces(sim, life)?;
    report.births = births(sim, life)?;
    report.hires = job_seeking(sim, life)?;
    report.closures = closures(sim, life)?;
    debug!(?report, "yearly systems ran");
    Ok(report)
}

fn retirements(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut count = 0;
    let residents: Vec<AgentId> = sim.town().residents().collect();
    for agent in residents {
        let a = sim.town().agent(agent)?;
        if !a.present() || a.retired || a.occupation.is_none() || a.age < life.retirement_age {
            continue;
        }
        if sim.ctx_mut().chance(life.retirement_chance) {
            sim.retire(agent)?;
            count += 1;
        }
    }
    Ok(count)
}

fn deaths(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut count = 0;
    let residents: Vec<AgentId> = sim.town().residents().collect();
    for agent in residents {
        let a = sim.town().agent(agent)?;
        if !a.present() || !sim.town().is_resident(agent) {
            continue;
        }
        let hazard = life.mortality(a.age);
        if sim.ctx_mut().chance(hazard) {
            sim.die(agent)?;
            count += 1;
        }
    }
    Ok(count)
}

fn single_adult(town: &Town, agent: AgentId, life: &LifeConfig) -> Result<bool> {
    let a = town.agent(agent)?;
    Ok(a.present() && town.is_resident(agent) && a.spouse.is_none() && a.age >= life.marriage_age)
}

fn marriages(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut count = 0;
    let residents: Vec<AgentId> = sim.town().residents().collect();
    for agent in residents {
        let town = sim.town();
        let Some(other) = town.agent(agent)?.love_interest() else {
            continue;
        };
        if other <= agent
            || !single_adult(town, agent, life)?
            || !single_adult(town, other, life)?
            || !pointers::mutual_love_interest(town, agent, other)?
            || town.agent(agent)?.extended_family.contains(&other)
        {
            continue;
        }
        if pointers::spark_toward(town, agent, other)? <= life.proposal_spark
            || pointers::spark_toward(town, other, agent)? <= life.proposal_spark
        {
            continue;
        }
        if sim.ctx_mut().chance(life.proposal_chance) {
            sim.marry(agent, other)?;
            count += 1;
        }
    }
    Ok(count)
}

fn divorces(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut couples = Vec::new();
    for marriage in sim.town().marriages() {
        if marriage.ended.is_none() {
            couples.push(marriage.spouses);
        }
    }
    let mut count = 0;
    for [a, b] in couples {
        let town = sim.town();
        if town.agent(a)?.spouse != Some(b) || !town.agent(a)?.present() || !town.agent(b)?.present() {
            continue;
        }
        if sim.ctx_mut().chance(life.divorce_chance) {
            sim.divorce(a, b)?;
            count += 1;
        }
    }
    Ok(count)
}

fn births(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut count = 0;
    let residents: Vec<AgentId> = sim.town().residents().collect();
    for agent in residents {
        let town = sim.town();
        let a = town.agent(agent)?;
        let fertile = (life.fertility_start..=life.fertility_end).contains(&a.age);
        let Some(spouse) = a.spouse else {
            continue;
        };
        if a.sex != Sex::Female || !fertile || !a.present() || !town.agent(spouse)?.present() {
            continue;
        }
        if sim.ctx_mut().chance(life.birth_chance) {
            sim.birth(agent)?;
            count += 1;
        }
    }
    Ok(count)
}

fn job_seeking(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut count = 0;
    let residents: Vec<AgentId> = sim.town().residents().collect();
    for agent in residents {
        let a = sim.town().agent(agent)?;
        if !a.present() || !a.in_workforce || a.retired || a.occupation.is_some() || a.age > life.job_seeking_age {
            continue;
        }
        let open: Vec<(CompanyId, Shift)> = sim
            .town()
            .companies()
            .filter(|c| c.operating())
            .flat_map(|c| {
                [Shift::Day, Shift::Night]
                    .into_iter()
                    .filter(|s| !c.supplemental_vacancies.on(*s).is_empty())
                    .map(move |s| (c.id, s))
            })
            .collect();
        for (company, shift) in open {
            let out = sim.fill_supplemental_vacancy(company, shift, agent)?;
            if out.root.is_some() {
                count += 1;
                break;
            }
        }
    }
    Ok(count)
}

fn closures(sim: &mut Simulation, life: &LifeConfig) -> Result<u32> {
    let mut candidates = Vec::new();
    for company in sim.town().companies() {
        if !company.operating() || company.kind.is_public() {
            continue;
        }
        let Some(founder) = company.founder else {
            continue;
        };
        let holder = sim.town().occupation(founder)?.holder;
        let h = sim.town().agent(holder)?;
        if !h.present() || h.retired {
            candidates.push(company.id);
        }
    }
    let mut count = 0;
    for company in candidates {
        if sim.ctx_mut().chance(life.closure_chance) {
            sim.close_business(company)?;
            count += 1;
        }
    }
    Ok(count)
}
