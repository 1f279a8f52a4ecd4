//! Occupation lifecycle — hiring, termination, retirement.
//!
//! A refill hire is made while the outgoing record is `Vacating`, and only
//! then is the record marked `Ended`. Candidates must not already hold a
//! position of the same or higher level, so the new hire can never be the
//! person leaving; each refill pulls from a strictly lower level (or from the
//! unemployed, or from outside town), which bounds the chain.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::business;
use crate::error::{Result, TownError};
use crate::event::{Cause, EventKind};
use crate::heuristics;
use crate::metrics::{SimCounters, spans};
use crate::occupation::{Occupation, OccupationKind, OccupationStatus, RefillPolicy};
use crate::relationship;
use crate::salience::{SalienceChange, job_level_boost};
use crate::simulation::{Cascade, Effect, Simulation, Task};
use crate::types::{AgentId, CompanyId, EventId, OccupationId, Shift};

/// A position waiting for a hire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Opening {
    pub company: CompanyId,
    pub kind: OccupationKind,
    pub shift: Shift,
    pub replacing: Option<OccupationId>,
    pub supplemental: bool,
    pub favor: bool,
}

impl Opening {
    pub const fn new(company: CompanyId, kind: OccupationKind, shift: Shift) -> Self {
        Self {
            company,
            kind,
            shift,
            replacing: None,
            supplemental: false,
            favor: false,
        }
    }
}

impl Simulation {
    // -- Public operations ---------------------------------------------------

    /// Open a new position and fill it through the candidate search.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the company is closed.
    pub fn hire(&mut self, company: CompanyId, kind: OccupationKind, shift: Shift) -> Result<Cascade> {
        self.cascade("hire", |sim| {
            sim.require_operating(company, "hire")?;
            let (_, hiring) = sim.hire_into(Opening::new(company, kind, shift), None)?;
            Ok(Some(hiring))
        })
    }

    /// Open a new position and give it to `agent` directly.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the company is closed or the
    /// agent is not present.
    pub fn hire_agent(
        &mut self,
        company: CompanyId,
        kind: OccupationKind,
        shift: Shift,
        agent: AgentId,
    ) -> Result<Cascade> {
        self.cascade("hire_agent", |sim| {
            sim.require_operating(company, "hire_agent")?;
            sim.require_present(agent, "hire_agent")?;
            let (_, hiring) = sim.hire_into(Opening::new(company, kind, shift), Some(agent))?;
            Ok(Some(hiring))
        })
    }

    /// Hire `agent` into the first pooled vacancy on `shift` they qualify
    /// for. The root is `None` when nothing fits.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the company is closed.
    pub fn fill_supplemental_vacancy(
        &mut self,
        company: CompanyId,
        shift: Shift,
        agent: AgentId,
    ) -> Result<Cascade> {
        self.cascade("fill_supplemental_vacancy", |sim| {
            sim.require_operating(company, "fill_supplemental_vacancy")?;
            let open = sim.town.company(company)?.supplemental_vacancies.on(shift).to_vec();
            let mut fit = None;
            for kind in open {
                if sim.qualifies(agent, kind)? {
                    fit = Some(kind);
                    break;
                }
            }
            let Some(kind) = fit else {
                return Ok(None);
            };
            sim.town
                .company_mut(company)?
                .supplemental_vacancies
                .take(shift, kind);
            let opening = Opening {
                supplemental: true,
                ..Opening::new(company, kind, shift)
            };
            let (_, hiring) = sim.hire_into(opening, Some(agent))?;
            Ok(Some(hiring))
        })
    }

    /// Create a position for a relative of the owner beyond every vacancy.
    /// It is discarded, never refilled, when its holder leaves.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the company has no owner or the
    /// agent is not in the owner's family.
    pub fn hire_as_favor(
        &mut self,
        company: CompanyId,
        agent: AgentId,
        kind: OccupationKind,
        shift: Shift,
    ) -> Result<Cascade> {
        self.cascade("hire_as_favor", |sim| {
            sim.require_operating(company, "hire_as_favor")?;
            let owner = sim
                .town
                .company(company)?
                .owner
                .ok_or_else(|| TownError::invalid("hire_as_favor", format!("{company} has no owner")))?;
            let holder = sim.town.occupation(owner)?.holder;
            if !sim.town.agent(holder)?.extended_family.contains(&agent) {
                return Err(TownError::invalid(
                    "hire_as_favor",
                    format!("{agent} is not family of {holder}"),
                ));
            }
            let opening = Opening {
                supplemental: true,
                favor: true,
                ..Opening::new(company, kind, shift)
            };
            let (_, hiring) = sim.hire_into(opening, Some(agent))?;
            Ok(Some(hiring))
        })
    }

    /// Retire `agent`, ending their occupation with the Retirement as reason.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the agent is absent or retired.
    pub fn retire(&mut self, agent: AgentId) -> Result<Cascade> {
        self.cascade("retire", |sim| {
            sim.require_present(agent, "retire")?;
            if sim.town.agent(agent)?.retired {
                return Err(TownError::invalid("retire", format!("{agent} already retired")));
            }
            let occupation = sim.town.agent(agent)?.occupation;
            let event = sim.log(None, None, EventKind::Retirement { subject: agent, occupation });
            {
                let a = sim.town.agent_mut(agent)?;
                a.retired = true;
                a.in_workforce = false;
            }
            if let Some(occ) = occupation {
                sim.terminate(occ, event)?;
            }
            Ok(Some(event))
        })
    }

    /// End `occupation` with an existing event as the reason.
    ///
    /// # Errors
    /// Returns an unknown-handle error for a missing occupation or event.
    pub fn terminate_occupation(&mut self, occupation: OccupationId, reason: EventId) -> Result<Cascade> {
        self.cascade("terminate_occupation", |sim| {
            sim.town.event(reason)?;
            sim.terminate(occupation, reason)?;
            Ok(None)
        })
    }

    /// Scored in-town candidates for a new position of `kind` at `company`.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn hiring_candidates(&self, company: CompanyId, kind: OccupationKind) -> Result<Vec<(AgentId, f64)>> {
        let decision_maker = self.decision_maker(company)?;
        let mut scored = Vec::new();
        for agent in self.town.residents() {
            if self.qualifies(agent, kind)? {
                scored.push((agent, self.score_candidate(agent, company, decision_maker)?));
            }
        }
        Ok(scored)
    }

    // -- Candidate search ----------------------------------------------------

    fn require_operating(&self, company: CompanyId, operation: &'static str) -> Result<()> {
        if self.town.company(company)?.operating() {
            Ok(())
        } else {
            Err(TownError::invalid(operation, format!("{company} is out of business")))
        }
    }

    pub(crate) fn require_present(&self, agent: AgentId, operation: &'static str) -> Result<()> {
        if self.town.agent(agent)?.present() {
            Ok(())
        } else {
            Err(TownError::invalid(operation, format!("{agent} is not present")))
        }
    }

    fn decision_maker(&self, company: CompanyId) -> Result<Option<AgentId>> {
        let c = self.town.company(company)?;
        if c.kind.is_public() {
            return Ok(self.town.mayor());
        }
        match c.owner {
            Some(owner) => Ok(Some(self.town.occupation(owner)?.holder)),
            None => Ok(None),
        }
    }

    pub(crate) fn qualifies(&self, agent: AgentId, kind: OccupationKind) -> Result<bool> {
        let a = self.town.agent(agent)?;
        if !a.present() || a.retired || !a.in_workforce || !self.town.is_resident(agent) {
            return Ok(false);
        }
        if kind.requires_college_degree() && !a.college_graduate {
            return Ok(false);
        }
        if let Some(current) = a.occupation {
            let o = self.town.occupation(current)?;
            let min_years = self.ctx.config().hiring.min_years_in_current_job;
            if !o.is_active()
                || o.level() >= kind.level()
                || o.years_experience(self.ctx.date()) < min_years
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn score_candidate(
        &self,
        candidate: AgentId,
        company: CompanyId,
        decision_maker: Option<AgentId>,
    ) -> Result<f64> {
        let cfg = &self.ctx.config().hiring;
        let c = self.town.company(company)?;
        let a = self.town.agent(candidate)?;
        let mut score = 0.0;
        let current = match a.occupation {
            Some(occ) => Some(self.town.occupation(occ)?),
            None => None,
        };
        if current.is_some_and(|o| o.company == company) {
            score += cfg.within_company;
        }
        if let Some(dm) = decision_maker {
            let d = self.town.agent(dm)?;
            if d.immediate_family.contains(&candidate) {
                score += cfg.decision_maker_immediate_family;
            } else if d.extended_family.contains(&candidate) {
                score += cfg.decision_maker_extended_family;
            }
            if d.friends.contains(&candidate) {
                score += cfg.friend;
            } else if d.acquaintances.contains(&candidate) {
                score += cfg.acquaintance;
            }
            if d.enemies.contains(&candidate) {
                score += cfg.enemy;
            }
        }
        let mut immediate = false;
        let mut extended = false;
        for occ in &c.employees {
            let o = self.town.occupation(*occ)?;
            if o.holder == candidate || !o.is_active() {
                continue;
            }
            immediate |= a.immediate_family.contains(&o.holder);
            extended |= a.extended_family.contains(&o.holder);
        }
        if immediate {
            score += cfg.employee_immediate_family;
        } else if extended {
            score += cfg.employee_extended_family;
        }
        Ok(score * current.map_or(cfg.unemployed_multiplier, Occupation::level))
    }

    /// An apprentice at the company with any experience is promoted outright
    /// into any higher position there.
    fn promotable_apprentice(&self, company: CompanyId, kind: OccupationKind) -> Result<Option<AgentId>> {
        if kind.level() <= OccupationKind::Apprentice.level() {
            return Ok(None);
        }
        let today = self.ctx.date();
        for occ in &self.town.company(company)?.employees {
            let o = self.town.occupation(*occ)?;
            if o.is_active()
                && o.kind.is_apprentice()
                && o.years_experience(today) > 0.0
                && self.town.agent(o.holder)?.present()
            {
                return Ok(Some(o.holder));
            }
        }
        Ok(None)
    }

    fn select_candidate(&mut self, company: CompanyId, kind: OccupationKind) -> Result<Option<AgentId>> {
        if let Some(apprentice) = self.promotable_apprentice(company, kind)? {
            return Ok(Some(apprentice));
        }
        let candidates = self.hiring_candidates(company, kind)?;
        Ok(heuristics::choose(&candidates, &mut self.ctx))
    }

    // -- Hire ----------------------------------------------------------------

    /// Fill `opening`, with `chosen` or through the candidate search, falling
    /// back to an outsider. Returns the new position and its Hiring event.
    pub(crate) fn hire_into(
        &mut self,
        opening: Opening,
        chosen: Option<AgentId>,
    ) -> Result<(OccupationId, EventId)> {
        let _span = tracing::debug_span!(spans::HIRE, company = %opening.company, kind = opening.kind.label())
            .entered();
        let Opening {
            company,
            kind,
            shift,
            replacing,
            ..
        } = opening;
        let (candidate, outsider) = match chosen {
            Some(agent) => (agent, false),
            None => match self.select_candidate(company, kind)? {
                Some(agent) => (agent, false),
                None => (self.generate_outsider(Some(kind))?, true),
            },
        };

        let previous = self.town.agent(candidate)?.occupation;
        let promotion = match previous {
            Some(p) => self.town.occupation(p)?.company == company,
            None => false,
        };
        let occ = self.town.add_occupation(Occupation {
            id: OccupationId(0),
            holder: candidate,
            company,
            kind,
            shift,
            status: OccupationStatus::Active,
            start: self.ctx.date(),
            end: None,
            hiring: None,
            terminus: None,
            preceded_by: replacing,
            succeeded_by: None,
            supplemental: opening.supplemental,
            hired_as_favor: opening.favor,
        });
        if let Some(old) = replacing {
            self.town.occupation_mut(old)?.succeeded_by = Some(occ);
            let c = self.town.company_mut(company)?;
            if c.owner == Some(old) {
                c.owner = Some(occ);
            }
            SimCounters::bump(&self.metrics.refills);
        }
        self.town.company_mut(company)?.employees.insert(occ);

        let hiring = self.log(
            None,
            replacing.map(Cause::Occupation),
            EventKind::Hiring {
                subject: candidate,
                company,
                occupation: occ,
                kind,
                promotion,
            },
        );
        self.town.occupation_mut(occ)?.hiring = Some(hiring);

        if let Some(p) = previous {
            if self.town.occupation(p)?.is_active() {
                self.enqueue(Task::Terminate {
                    occupation: p,
                    reason: hiring,
                });
            }
        }
        {
            let a = self.town.agent_mut(candidate)?;
            a.occupation = Some(occ);
            a.occupations.push(occ);
            a.in_workforce = true;
        }
        self.join_coworkers(candidate, company, occ)?;
        let boost = job_level_boost(kind.level(), &self.ctx.config().salience);
        let residents: Vec<AgentId> = self.town.residents().filter(|r| *r != candidate).collect();
        for r in residents {
            self.town.agent_mut(r)?.salience.adjust(candidate, boost);
        }
        relationship::refresh_job_damping(&mut self.town, &self.ctx, candidate)?;
        if kind.renames_firm() {
            self.rename_firm(company)?;
        }
        if outsider {
            self.enqueue(Task::SettleNewcomer {
                agent: candidate,
                hiring,
            });
        }
        debug!(agent = %candidate, %company, kind = kind.label(), occupation = %occ, promotion, outsider, "hired");
        Ok((occ, hiring))
    }

    fn join_coworkers(&mut self, agent: AgentId, company: CompanyId, occ: OccupationId) -> Result<()> {
        let mut others = BTreeSet::new();
        for other in &self.town.company(company)?.employees {
            let o = self.town.occupation(*other)?;
            if *other != occ && o.is_active() && o.holder != agent {
                others.insert(o.holder);
            }
        }
        let weight = SalienceChange::Coworker.weight(&self.ctx.config().salience);
        for other in others {
            let a = self.town.agent_mut(agent)?;
            if a.coworkers.insert(other) {
                a.salience.adjust(other, weight);
            }
            let o = self.town.agent_mut(other)?;
            if o.coworkers.insert(agent) {
                o.salience.adjust(agent, weight);
            }
        }
        Ok(())
    }

    fn leave_coworkers(&mut self, agent: AgentId, company: CompanyId) -> Result<()> {
        let mut others = BTreeSet::new();
        for other in &self.town.company(company)?.employees {
            let holder = self.town.occupation(*other)?.holder;
            if holder != agent {
                others.insert(holder);
            }
        }
        let delta = SalienceChange::transition(
            SalienceChange::Coworker,
            SalienceChange::FormerCoworker,
            &self.ctx.config().salience,
        );
        for other in others {
            for (x, y) in [(agent, other), (other, agent)] {
                let a = self.town.agent_mut(x)?;
                if a.coworkers.remove(&y) {
                    a.former_coworkers.insert(y);
                    a.salience.adjust(y, delta);
                }
            }
        }
        Ok(())
    }

    /// Rebuild a law firm's name from its current lawyers.
    fn rename_firm(&mut self, company: CompanyId) -> Result<()> {
        let mut partners = Vec::new();
        for occ in &self.town.company(company)?.employees {
            let o = self.town.occupation(*occ)?;
            if o.kind.renames_firm() && o.is_active() {
                let lawyer = self.town.agent(o.holder)?;
                partners.push((lawyer.given_name.clone(), lawyer.surname.clone()));
            }
        }
        if let Some(name) = business::law_firm_name(&partners) {
            self.town.company_mut(company)?.name = name;
        }
        Ok(())
    }

    // -- Terminate -----------------------------------------------------------

    /// End `occupation`. Refill (or pool, or drop) the position while it is
    /// still vacating, then mark it ended. Ending an already ended record is
    /// a no-op.
    pub(crate) fn terminate(&mut self, occupation: OccupationId, reason: EventId) -> Result<()> {
        let _span = tracing::debug_span!(spans::TERMINATE, %occupation).entered();
        let record = self.town.occupation(occupation)?.clone();
        if record.status != OccupationStatus::Active {
            return Ok(());
        }
        self.town.occupation_mut(occupation)?.status = OccupationStatus::Vacating;
        self.note(Effect::Vacated(occupation));

        let (retirement, promotion) = match &self.town.event(reason)?.kind {
            EventKind::Retirement { .. } => (true, false),
            EventKind::Hiring { promotion, .. } => (false, *promotion),
            _ => (false, false),
        };
        let (operating, was_owner) = {
            let c = self.town.company(record.company)?;
            (c.operating(), c.owner == Some(occupation))
        };

        if operating {
            match record.refill_policy() {
                RefillPolicy::Refill => {
                    let opening = Opening {
                        replacing: Some(occupation),
                        ..Opening::new(record.company, record.kind, record.shift)
                    };
                    self.hire_into(opening, None)?;
                }
                RefillPolicy::Pool => {
                    self.town
                        .company_mut(record.company)?
                        .supplemental_vacancies
                        .push(record.shift, record.kind);
                    SimCounters::bump(&self.metrics.pooled_vacancies);
                    self.note(Effect::VacancyPooled {
                        company: record.company,
                        kind: record.kind,
                    });
                }
                RefillPolicy::Discard => self.note(Effect::VacancyDropped { occupation }),
            }
        }

        {
            let o = self.town.occupation_mut(occupation)?;
            o.status = OccupationStatus::Ended;
            o.end = Some(self.ctx.date());
            o.terminus = Some(reason);
        }
        {
            let c = self.town.company_mut(record.company)?;
            c.employees.remove(&occupation);
            c.former_employees.insert(occupation);
            if was_owner {
                c.former_owners.push(occupation);
                if c.owner == Some(occupation) {
                    c.owner = None;
                }
            }
        }
        self.note(Effect::Ended(occupation));
        SimCounters::bump(&self.metrics.terminations);

        let holder = record.holder;
        if !promotion {
            self.leave_coworkers(holder, record.company)?;
        }
        {
            let a = self.town.agent_mut(holder)?;
            if a.occupation == Some(occupation) {
                a.occupation = None;
            }
            if retirement {
                a.coworkers.clear();
            }
        }
        if !retirement {
            let boost = job_level_boost(record.level(), &self.ctx.config().salience);
            let residents: Vec<AgentId> = self.town.residents().filter(|r| *r != holder).collect();
            for r in residents {
                self.town.agent_mut(r)?.salience.adjust(holder, -boost);
            }
        }
        if record.kind.renames_firm() {
            self.rename_firm(record.company)?;
        }
        relationship::refresh_job_damping(&mut self.town, &self.ctx, holder)?;
        info!(%occupation, agent = %holder, kind = record.kind.label(), %reason, "occupation ended");
        Ok(())
    }
}
