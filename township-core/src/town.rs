//! The registry — single owner of every agent, record and event.
//!
//! Records are stored in `Vec` arenas and addressed by handle. Nothing is ever
//! removed, so a handle stays valid for the life of the town.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{Agent, AgentSeed};
use crate::company::{Company, CompanyKind};
use crate::context::SimContext;
use crate::dwelling::{Dwelling, Lot};
use crate::error::{Result, TownError};
use crate::event::{Cause, Event, EventKind, EventLog};
use crate::family::Marriage;
use crate::occupation::{Occupation, OccupationKind};
use crate::relationship::Relationship;
use crate::types::{
    AgentId, CompanyId, DwellingId, EventId, LotId, MarriageId, OccupationId, RelationshipId,
};

/// Job level of someone with no occupation history.
pub const UNEMPLOYED_JOB_LEVEL: f64 = 0.1;

/// Everything in the world, by handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Town {
    /// Display name.
    pub name: String,
    agents: Vec<Agent>,
    relationships: Vec<Relationship>,
    occupations: Vec<Occupation>,
    companies: Vec<Company>,
    dwellings: Vec<Dwelling>,
    lots: Vec<Lot>,
    marriages: Vec<Marriage>,
    events: EventLog,
    residents: BTreeSet<AgentId>,
    departed: BTreeSet<AgentId>,
    deceased: BTreeSet<AgentId>,
    mayor: Option<AgentId>,
}

macro_rules! registry_access {
    ($field:ident, $get:ident, $get_mut:ident, $iter:ident, $id:ty, $record:ty, $err:ident) => {
        #[doc = concat!("Look up a record in `", stringify!($field), "`.")]
        ///
        /// # Errors
        /// Returns the matching not-found error for an unknown handle.
        pub fn $get(&self, id: $id) -> Result<&$record> {
            self.$field.get(id.index()).ok_or(TownError::$err(id))
        }

        #[doc = concat!("Mutable lookup in `", stringify!($field), "`.")]
        ///
        /// # Errors
        /// Returns the matching not-found error for an unknown handle.
        pub fn $get_mut(&mut self, id: $id) -> Result<&mut $record> {
            self.$field.get_mut(id.index()).ok_or(TownError::$err(id))
        }

        #[doc = concat!("Every record in `", stringify!($field), "`, in handle order.")]
        pub fn $iter(&self) -> impl Iterator<Item = &$record> {
            self.$field.iter()
        }
    };
}

impl Town {
    /// An empty town.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    registry_access!(agents, agent, agent_mut, agents, AgentId, Agent, AgentNotFound);
    registry_access!(
        relationships,
        relationship,
        relationship_mut,
        relationships,
        RelationshipId,
        Relationship,
        RelationshipNotFound
    );
    registry_access!(
        occupations,
        occupation,
        occupation_mut,
        occupations,
        OccupationId,
        Occupation,
        OccupationNotFound
    );
    registry_access!(companies, company, company_mut, companies, CompanyId, Company, CompanyNotFound);
    registry_access!(dwellings, dwelling, dwelling_mut, dwellings, DwellingId, Dwelling, DwellingNotFound);
    registry_access!(lots, lot, lot_mut, lots, LotId, Lot, LotNotFound);
    registry_access!(marriages, marriage, marriage_mut, marriages, MarriageId, Marriage, MarriageNotFound);

    /// Every relationship record, mutably.
    pub fn relationships_mut(&mut self) -> impl Iterator<Item = &mut Relationship> {
        self.relationships.iter_mut()
    }

    /// Look up an event.
    ///
    /// # Errors
    /// Returns `TownError::EventNotFound` for an unknown handle.
    pub fn event(&self, id: EventId) -> Result<&Event> {
        self.events.get(id).ok_or(TownError::EventNotFound(id))
    }

    /// The event log.
    #[must_use]
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    // -- Registration --------------------------------------------------------

    /// Register a new agent (not yet a resident).
    pub fn add_agent(&mut self, seed: AgentSeed, ctx: &SimContext) -> AgentId {
        let id = AgentId::next(self.agents.len());
        let cycle = &ctx.config().life_cycle;
        self.agents
            .push(Agent::new(id, seed, ctx.date(), cycle.adult_age, cycle.working_age));
        id
    }

    pub(crate) fn add_relationship(&mut self, mut record: Relationship) -> RelationshipId {
        let id = RelationshipId::next(self.relationships.len());
        record.id = id;
        self.relationships.push(record);
        id
    }

    pub(crate) fn add_occupation(&mut self, mut record: Occupation) -> OccupationId {
        let id = OccupationId::next(self.occupations.len());
        record.id = id;
        self.occupations.push(record);
        id
    }

    pub(crate) fn add_company(&mut self, mut record: Company) -> CompanyId {
        let id = CompanyId::next(self.companies.len());
        record.id = id;
        self.companies.push(record);
        id
    }

    pub(crate) fn add_dwelling(&mut self, mut record: Dwelling) -> DwellingId {
        let id = DwellingId::next(self.dwellings.len());
        record.id = id;
        self.dwellings.push(record);
        id
    }

    /// Handle the next [`Town::add_marriage`] will assign. The wedding event
    /// is logged before the record exists and needs it.
    pub(crate) fn next_marriage_id(&self) -> MarriageId {
        MarriageId::next(self.marriages.len())
    }

    pub(crate) fn add_marriage(&mut self, mut record: Marriage) -> MarriageId {
        let id = MarriageId::next(self.marriages.len());
        record.id = id;
        self.marriages.push(record);
        id
    }

    /// Register `n` empty lots (the layout's lots, in index order).
    pub fn add_lots(&mut self, n: usize) {
        for _ in 0..n {
            let id = LotId::next(self.lots.len());
            self.lots.push(Lot {
                id,
                building: None,
                former_buildings: Vec::new(),
            });
        }
    }

    /// Append an event and record it in every subject's life-event sequence.
    /// `year` before the current year makes it a retcon event.
    pub(crate) fn log(
        &mut self,
        ctx: &mut SimContext,
        year: Option<i32>,
        reason: Option<Cause>,
        kind: EventKind,
    ) -> EventId {
        let stamp = ctx.stamp(year);
        let subjects = kind.subjects();
        let tag = kind.tag();
        let id = self.events.push(stamp, reason, kind);
        for subject in subjects {
            if let Some(agent) = self.agents.get_mut(subject.index()) {
                agent.life_events.push(id);
            }
        }
        debug!(event = %id, kind = tag.label(), sequence = stamp.sequence, retcon = stamp.retcon, date = %stamp.date, "event logged");
        id
    }

    // -- Population ----------------------------------------------------------

    /// Records ever created across the append-only arenas.
    pub(crate) fn record_count(&self) -> usize {
        self.agents.len()
            + self.relationships.len()
            + self.occupations.len()
            + self.companies.len()
            + self.dwellings.len()
            + self.marriages.len()
            + self.events.len()
    }

    /// Mark `agent` as living in town.
    pub fn admit_resident(&mut self, agent: AgentId) {
        self.residents.insert(agent);
    }

    pub(crate) fn record_departure(&mut self, agent: AgentId) {
        self.residents.remove(&agent);
        self.departed.insert(agent);
    }

    pub(crate) fn record_death(&mut self, agent: AgentId) {
        self.residents.remove(&agent);
        self.deceased.insert(agent);
    }

    /// Current residents, in handle order.
    pub fn residents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.residents.iter().copied()
    }

    /// Whether `agent` lives in town.
    #[must_use]
    pub fn is_resident(&self, agent: AgentId) -> bool {
        self.residents.contains(&agent)
    }

    /// Number of residents.
    #[must_use]
    pub fn population(&self) -> usize {
        self.residents.len()
    }

    /// Agents who left town.
    pub fn departed(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.departed.iter().copied()
    }

    /// Agents who died in town.
    pub fn deceased(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.deceased.iter().copied()
    }

    /// The mayor, who decides hires at public institutions.
    #[must_use]
    pub const fn mayor(&self) -> Option<AgentId> {
        self.mayor
    }

    /// Install a mayor.
    pub fn set_mayor(&mut self, mayor: Option<AgentId>) {
        self.mayor = mayor;
    }

    // -- Derived queries -----------------------------------------------------

    /// Level used by job-level damping: the current occupation's level, else
    /// the last occupation's level if retired, else [`UNEMPLOYED_JOB_LEVEL`].
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn job_level(&self, agent: AgentId) -> Result<f64> {
        let a = self.agent(agent)?;
        if let Some(occ) = a.occupation {
            return Ok(self.occupation(occ)?.level());
        }
        if a.retired {
            if let Some(last) = a.occupations.last() {
                return Ok(self.occupation(*last)?.level());
            }
        }
        Ok(UNEMPLOYED_JOB_LEVEL)
    }

    /// Lots with nothing on them.
    #[must_use]
    pub fn vacant_lots(&self) -> Vec<LotId> {
        self.lots.iter().filter(|l| l.is_vacant()).map(|l| l.id).collect()
    }

    /// Standing dwellings with no residents.
    #[must_use]
    pub fn vacant_homes(&self) -> Vec<DwellingId> {
        self.dwellings
            .iter()
            .filter(|d| d.is_vacant())
            .map(|d| d.id)
            .collect()
    }

    /// Standing dwellings, occupied or not.
    #[must_use]
    pub fn standing_dwellings(&self) -> Vec<DwellingId> {
        self.dwellings
            .iter()
            .filter(|d| !d.demolished)
            .map(|d| d.id)
            .collect()
    }

    /// Operating companies of `kind`, in handle order.
    #[must_use]
    pub fn companies_of_kind(&self, kind: CompanyKind) -> Vec<CompanyId> {
        self.companies
            .iter()
            .filter(|c| c.kind == kind && c.operating())
            .map(|c| c.id)
            .collect()
    }

    /// Active occupations of `kind` held by residents.
    #[must_use]
    pub fn holders_of(&self, kind: OccupationKind) -> Vec<OccupationId> {
        self.occupations
            .iter()
            .filter(|o| o.kind == kind && o.is_active() && self.residents.contains(&o.holder))
            .map(|o| o.id)
            .collect()
    }

    /// Lot of the agent's workplace.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn workplace_lot(&self, agent: AgentId) -> Result<Option<LotId>> {
        match self.agent(agent)?.occupation {
            Some(occ) => {
                let company = self.occupation(occ)?.company;
                Ok(Some(self.company(company)?.lot))
            }
            None => Ok(None),
        }
    }

    /// Lot of the agent's home.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn home_lot(&self, agent: AgentId) -> Result<Option<LotId>> {
        match self.agent(agent)?.home {
            Some(home) => Ok(Some(self.dwelling(home)?.lot)),
            None => Ok(None),
        }
    }

    /// Events of `agent`'s life, in sequence order.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn life_events(&self, agent: AgentId) -> Result<Vec<&Event>> {
        self.agent(agent)?
            .life_events
            .iter()
            .map(|id| self.event(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TownConfig;
    use crate::types::{Attraction, Personality, Sex, SimDate};

    fn make_ctx() -> SimContext {
        let mut config = TownConfig::default();
        config.general.first_year = 1900;
        SimContext::new(config).expect("valid config")
    }

    fn make_seed(year: i32) -> AgentSeed {
        AgentSeed {
            given_name: "Ann".to_string(),
            surname: "Roe".to_string(),
            sex: Sex::Female,
            attraction: Attraction::heterosexual(Sex::Female),
            birth: SimDate::from_ymd(year, 2, 2).expect("valid date"),
            personality: Personality::default(),
        }
    }

    #[test]
    fn unknown_handles_are_errors() {
        let town = Town::new("T");
        assert!(matches!(town.agent(AgentId(0)), Err(TownError::AgentNotFound(_))));
        assert!(matches!(town.lot(LotId(3)), Err(TownError::LotNotFound(_))));
        assert!(matches!(town.event(EventId(1)), Err(TownError::EventNotFound(_))));
    }

    #[test]
    fn logging_records_life_events_in_sequence_order() {
        let mut ctx = make_ctx();
        let mut town = Town::new("T");
        let a = town.add_agent(make_seed(1870), &ctx);
        town.admit_resident(a);
        let live = town.log(&mut ctx, None, None, EventKind::Departure { subject: a });
        let retcon = town.log(&mut ctx, Some(1880), None, EventKind::Departure { subject: a });
        let events = town.life_events(a).expect("events");
        assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![live, retcon]);
        assert!(events[0].sequence < events[1].sequence);
        assert!(events[1].retcon && events[1].date < events[0].date);
    }

    #[test]
    fn unemployed_job_level_is_a_tenth() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = town.add_agent(make_seed(1870), &ctx);
        assert!((town.job_level(a).expect("level") - UNEMPLOYED_JOB_LEVEL).abs() < f64::EPSILON);
    }

    #[test]
    fn population_tracks_residency() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = town.add_agent(make_seed(1870), &ctx);
        let b = town.add_agent(make_seed(1871), &ctx);
        town.admit_resident(a);
        town.admit_resident(b);
        town.record_death(a);
        town.record_departure(b);
        assert_eq!(town.population(), 0);
        assert_eq!(town.deceased().collect::<Vec<_>>(), vec![a]);
        assert_eq!(town.departed().collect::<Vec<_>>(), vec![b]);
        town.add_lots(4);
        assert_eq!(town.vacant_lots().len(), 4);
    }
}
