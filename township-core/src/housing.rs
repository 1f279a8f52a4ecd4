//! Homes, lots, contractors and moves.
//!
//! Contracting never fails the caller: when nobody in town practices the
//! trade, the client (or spouse, if they practice it) does the work, and
//! otherwise the event is logged with the professional field empty.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::company::CompanyKind;
use crate::dwelling::{Building, Dwelling, DwellingKind};
use crate::error::{Result, TownError};
use crate::event::{Cause, EventKind};
use crate::family::{self, Kinship};
use crate::heuristics;
use crate::metrics::{SimCounters, spans};
use crate::occupation::OccupationKind;
use crate::salience::SalienceChange;
use crate::simulation::{Cascade, Simulation};
use crate::types::{AgentId, CompanyId, DwellingId, EventId, LotId, OccupationId};

/// Units added to a complex when newcomers find nowhere else to live.
pub const EXPANSION_UNITS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Home(DwellingId),
    Lot(LotId),
}

impl Simulation {
    // -- Public operations ---------------------------------------------------

    /// A grown kid (or any resident) looks for a place of their own. Moves
    /// the agent with their spouse and shared kids; the root is `None` when
    /// no home could be secured and they stay put.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the agent is not present.
    pub fn move_out(&mut self, agent: AgentId) -> Result<Cascade> {
        self.cascade("move_out", |sim| {
            sim.require_present(agent, "move_out")?;
            let household = family::nuclear_family(&sim.town, agent)?;
            match sim.secure_home(agent, None)? {
                Some(home) => sim.move_household(&household, home, None).map(Some),
                None => Ok(None),
            }
        })
    }

    /// House an outsider who arrived without a home.
    ///
    /// # Errors
    /// Returns `TownError::NoLotAvailable` if the town has no standing
    /// dwelling and no lot to build on.
    pub fn settle_newcomer(&mut self, agent: AgentId) -> Result<Cascade> {
        self.cascade("settle_newcomer", |sim| {
            sim.settle(agent, None)?;
            Ok(None)
        })
    }

    /// Desirability of `lot` for `agent`: pulls toward relatives, friends
    /// and the workplace, each falling off with distance.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn rate_potential_lot(&self, agent: AgentId, lot: LotId) -> Result<f64> {
        let cfg = &self.ctx.config().housing;
        let a = self.town.agent(agent)?;
        let p = &a.personality;
        let desire = (cfg.desire_base + p.conscientiousness - p.openness)
            .clamp(cfg.desire_floor, cfg.desire_cap);
        let pull = |distance: f64, weight: f64| weight / (distance + 1.0);

        let mut score = 0.0;
        for relative in &a.extended_family {
            let r = self.town.agent(*relative)?;
            if !r.present() || r.home.is_none() || r.home == a.home {
                continue;
            }
            let Some(their_lot) = self.town.home_lot(*relative)? else {
                continue;
            };
            let weight = match family::kinship(&self.town, agent, *relative)? {
                Some(Kinship::Kid) => cfg.pull_kid,
                Some(Kinship::Parent) => cfg.pull_parent,
                Some(Kinship::Grandkid) => cfg.pull_grandkid,
                Some(Kinship::Sibling) => cfg.pull_sibling,
                Some(Kinship::Grandparent) => cfg.pull_grandparent,
                _ => cfg.pull_other_kin,
            };
            score += desire * pull(self.layout.distance(lot, their_lot), weight);
        }
        for friend in &a.friends {
            if !self.town.agent(*friend)?.present() {
                continue;
            }
            if let Some(their_lot) = self.town.home_lot(*friend)? {
                score += pull(self.layout.distance(lot, their_lot), cfg.pull_friend);
            }
        }
        if let Some(work) = self.town.workplace_lot(agent)? {
            score += pull(self.layout.distance(lot, work), cfg.pull_workplace);
        }
        Ok(score)
    }

    /// Scored contractors of `kind` for `client`.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn contractor_candidates(&self, client: AgentId, kind: OccupationKind) -> Result<Vec<(OccupationId, f64)>> {
        let cfg = &self.ctx.config().contracting;
        let deciders = self.deciders(client)?;
        let c = self.town.agent(client)?;
        let today = self.ctx.date();
        let mut scored = Vec::new();
        for occ in self.town.holders_of(kind) {
            let o = self.town.occupation(occ)?;
            if deciders.contains(&o.holder) {
                continue;
            }
            let mut score = 0.0;
            if c.immediate_family.contains(&o.holder) {
                score += cfg.immediate_family;
            } else if c.extended_family.contains(&o.holder) {
                score += cfg.extended_family;
            }
            if c.friends.contains(&o.holder) {
                score += cfg.friend;
            } else if c.acquaintances.contains(&o.holder) {
                score += cfg.acquaintance;
            }
            if c.enemies.contains(&o.holder) {
                score += cfg.enemy;
            }
            if c.former_contractors.contains(&o.holder) {
                score += cfg.former_contractor;
            }
            score *= o.years_experience(today).powf(cfg.experience_exponent);
            scored.push((occ, score));
        }
        Ok(scored)
    }

    // -- Internals -----------------------------------------------------------

    /// The agent and their present spouse.
    pub(crate) fn deciders(&self, agent: AgentId) -> Result<Vec<AgentId>> {
        let mut out = vec![agent];
        if let Some(spouse) = self.town.agent(agent)?.spouse {
            if self.town.agent(spouse)?.present() {
                out.push(spouse);
            }
        }
        Ok(out)
    }

    /// Pick the professional who serves `client`. A decider who practices
    /// the trade serves themselves; `None` when nobody in town practices it.
    pub(crate) fn contract(&mut self, client: AgentId, kind: OccupationKind) -> Result<Option<OccupationId>> {
        for decider in self.deciders(client)? {
            if let Some(occ) = self.town.agent(decider)?.occupation {
                let o = self.town.occupation(occ)?;
                if o.kind == kind && o.is_active() {
                    SimCounters::bump(&self.metrics.self_service);
                    return Ok(Some(occ));
                }
            }
        }
        let candidates = self.contractor_candidates(client, kind)?;
        let Some(occ) = heuristics::choose(&candidates, &mut self.ctx) else {
            SimCounters::bump(&self.metrics.self_service);
            debug!(%client, kind = kind.label(), "no professional in town");
            return Ok(None);
        };
        let holder = self.town.occupation(occ)?.holder;
        self.town.agent_mut(client)?.former_contractors.insert(holder);
        Ok(Some(occ))
    }

    /// Buy a vacant home or build on a vacant lot for `agent` and spouse.
    /// Does not move anyone in.
    pub(crate) fn secure_home(&mut self, agent: AgentId, reason: Option<EventId>) -> Result<Option<DwellingId>> {
        let _span = tracing::debug_span!(spans::SECURE_HOME, %agent).entered();
        let deciders = self.deciders(agent)?;
        let penalty = self.ctx.config().housing.build_penalty;
        let mut candidates: Vec<(Site, f64)> = Vec::new();
        for home in self.town.vacant_homes() {
            let lot = self.town.dwelling(home)?.lot;
            candidates.push((Site::Home(home), self.rate_for(&deciders, lot)?));
        }
        for lot in self.town.vacant_lots() {
            candidates.push((Site::Lot(lot), self.rate_for(&deciders, lot)? * penalty));
        }
        match heuristics::choose(&candidates, &mut self.ctx) {
            Some(Site::Home(home)) => {
                if self.town.dwelling(home)?.complex().is_none() {
                    self.purchase_home(&deciders, home, reason)?;
                }
                Ok(Some(home))
            }
            Some(Site::Lot(lot)) => self.build_house(&deciders, lot, reason).map(Some),
            None => Ok(None),
        }
    }

    fn rate_for(&self, deciders: &[AgentId], lot: LotId) -> Result<f64> {
        let mut total = 0.0;
        for d in deciders {
            total += self.rate_potential_lot(*d, lot)?;
        }
        Ok(total)
    }

    fn purchase_home(&mut self, buyers: &[AgentId], home: DwellingId, reason: Option<EventId>) -> Result<EventId> {
        let realtor = self.contract(buyers[0], OccupationKind::Realtor)?;
        let sellers: Vec<AgentId> = self.town.dwelling(home)?.owners.iter().copied().collect();
        let event = self.log(
            None,
            reason.map(Cause::Event),
            EventKind::HomePurchase {
                buyers: buyers.to_vec(),
                home,
                sellers,
                realtor,
            },
        );
        let d = self.town.dwelling_mut(home)?;
        let previous = std::mem::take(&mut d.owners);
        d.former_owners.extend(previous);
        d.owners = buyers.iter().copied().collect();
        Ok(event)
    }

    fn build_house(&mut self, clients: &[AgentId], lot: LotId, reason: Option<EventId>) -> Result<DwellingId> {
        if !self.town.lot(lot)?.is_vacant() {
            return Err(TownError::invalid("build_house", format!("{lot} is occupied")));
        }
        let architect = self.contract(clients[0], OccupationKind::Architect)?;
        let mut builders = Vec::new();
        if let Some(a) = architect {
            let firm = self.town.occupation(a)?.company;
            for occ in &self.town.company(firm)?.employees {
                let o = self.town.occupation(*occ)?;
                if o.kind == OccupationKind::Builder && o.is_active() {
                    builders.push(o.holder);
                }
            }
        }
        let house = self.town.add_dwelling(Dwelling {
            id: DwellingId(0),
            kind: DwellingKind::House,
            lot,
            residents: BTreeSet::new(),
            former_residents: BTreeSet::new(),
            owners: clients.iter().copied().collect(),
            former_owners: BTreeSet::new(),
            built: self.ctx.date(),
            construction: None,
            demolition: None,
            demolished: false,
        });
        self.town.lot_mut(lot)?.building = Some(Building::Dwelling(house));
        let event = self.log(
            None,
            reason.map(Cause::Event),
            EventKind::HouseConstruction {
                clients: clients.to_vec(),
                lot,
                house,
                architect,
                builders,
            },
        );
        self.town.dwelling_mut(house)?.construction = Some(event);
        Ok(house)
    }

    /// Add `n` apartment units to a complex, numbered after the existing ones.
    pub(crate) fn add_units(&mut self, complex: CompanyId, n: u32) -> Result<Vec<DwellingId>> {
        let (lot, existing) = {
            let c = self.town.company(complex)?;
            (c.lot, c.units.len())
        };
        let first = u32::try_from(existing).unwrap_or(u32::MAX);
        let mut added = Vec::new();
        for i in 1..=n {
            let unit = self.town.add_dwelling(Dwelling {
                id: DwellingId(0),
                kind: DwellingKind::Apartment {
                    complex,
                    unit: first.saturating_add(i),
                },
                lot,
                residents: BTreeSet::new(),
                former_residents: BTreeSet::new(),
                owners: BTreeSet::new(),
                former_owners: BTreeSet::new(),
                built: self.ctx.date(),
                construction: None,
                demolition: None,
                demolished: false,
            });
            added.push(unit);
        }
        self.town.company_mut(complex)?.units.extend(added.iter().copied());
        Ok(added)
    }

    /// Residents of every dwelling on `lot`.
    pub(crate) fn residents_on_lot(&self, lot: LotId) -> Result<BTreeSet<AgentId>> {
        let mut out = BTreeSet::new();
        match self.town.lot(lot)?.building {
            Some(Building::Dwelling(d)) => {
                out.extend(self.town.dwelling(d)?.residents.iter().copied());
            }
            Some(Building::Company(c)) => {
                for unit in &self.town.company(c)?.units {
                    out.extend(self.town.dwelling(*unit)?.residents.iter().copied());
                }
            }
            None => {}
        }
        Ok(out)
    }

    /// Move `movers` into `to`, logging one Move. Neighbor sets are rebuilt
    /// on both ends.
    pub(crate) fn move_household(&mut self, movers: &[AgentId], to: DwellingId, reason: Option<Cause>) -> Result<EventId> {
        let Some(first) = movers.first() else {
            return Err(TownError::invalid("move_household", "no one to move"));
        };
        let from = self.town.agent(*first)?.home;
        let event = self.log(
            None,
            reason,
            EventKind::Move {
                subjects: movers.to_vec(),
                from,
                to,
            },
        );
        for mover in movers {
            self.leave_home(*mover)?;
        }
        for mover in movers {
            self.town.dwelling_mut(to)?.residents.insert(*mover);
            self.town.agent_mut(*mover)?.home = Some(to);
        }

        let (lot, complex) = {
            let d = self.town.dwelling(to)?;
            (d.lot, d.complex())
        };
        let mut neighbors = BTreeSet::new();
        for adjacent in self.layout.neighboring_lots(lot) {
            neighbors.extend(self.residents_on_lot(adjacent)?);
        }
        if complex.is_some() {
            neighbors.extend(self.residents_on_lot(lot)?);
        }
        for resident in &self.town.dwelling(to)?.residents {
            neighbors.remove(resident);
        }
        let weight = SalienceChange::Neighbor.weight(&self.ctx.config().salience);
        for mover in movers {
            for n in &neighbors {
                for (x, y) in [(*mover, *n), (*n, *mover)] {
                    let a = self.town.agent_mut(x)?;
                    if a.neighbors.insert(y) {
                        a.salience.adjust(y, weight);
                    }
                }
            }
        }
        debug!(%event, to = %to, movers = movers.len(), neighbors = neighbors.len(), "moved");
        Ok(event)
    }

    /// Take `agent` out of their home; current neighbors become former ones.
    pub(crate) fn leave_home(&mut self, agent: AgentId) -> Result<()> {
        let Some(home) = self.town.agent(agent)?.home else {
            return Ok(());
        };
        {
            let d = self.town.dwelling_mut(home)?;
            d.residents.remove(&agent);
            d.former_residents.insert(agent);
        }
        let delta = SalienceChange::transition(
            SalienceChange::Neighbor,
            SalienceChange::FormerNeighbor,
            &self.ctx.config().salience,
        );
        let neighbors = std::mem::take(&mut self.town.agent_mut(agent)?.neighbors);
        for n in neighbors {
            for (x, y) in [(agent, n), (n, agent)] {
                let a = self.town.agent_mut(x)?;
                a.neighbors.remove(&y);
                a.former_neighbors.insert(y);
                a.salience.adjust(y, delta);
            }
        }
        self.town.agent_mut(agent)?.home = None;
        Ok(())
    }

    /// A resident of a demolished dwelling finds a new home, taking the
    /// nuclear family still living there; failing that they leave town.
    pub(crate) fn rehouse(&mut self, agent: AgentId, displaced_from: DwellingId, reason: EventId) -> Result<()> {
        let a = self.town.agent(agent)?;
        if !a.present() || a.home != Some(displaced_from) {
            return Ok(());
        }
        let household = family::nuclear_family(&self.town, agent)?;
        match self.secure_home(agent, Some(reason))? {
            Some(home) => {
                self.move_household(&household, home, Some(Cause::Event(reason)))?;
            }
            None => {
                SimCounters::bump(&self.metrics.housing_fallbacks);
                info!(%agent, "no home to be had after demolition; leaving town");
                self.depart(agent, &household[1..], Some(reason))?;
            }
        }
        Ok(())
    }

    /// A household that must find a home together, or leave together.
    pub(crate) fn resettle(&mut self, household: &[AgentId], reason: EventId) -> Result<()> {
        let mut present = Vec::new();
        for member in household {
            if self.town.agent(*member)?.present() {
                present.push(*member);
            }
        }
        let Some(lead) = present.first().copied() else {
            return Ok(());
        };
        match self.secure_home(lead, Some(reason))? {
            Some(home) => {
                self.move_household(&present, home, Some(Cause::Event(reason)))?;
            }
            None => {
                SimCounters::bump(&self.metrics.housing_fallbacks);
                info!(agent = %lead, "no home to be had; household leaves town");
                self.depart(lead, &present[1..], Some(reason))?;
            }
        }
        Ok(())
    }

    /// Spouse and kids who arrived with `agent` and have no home yet.
    fn newcomer_household(&self, agent: AgentId) -> Result<Vec<AgentId>> {
        let a = self.town.agent(agent)?;
        let mut household = vec![agent];
        let homeless = |id: AgentId| {
            self.town
                .agent(id)
                .is_ok_and(|x| x.present() && x.home.is_none() && self.town.is_resident(id))
        };
        household.extend(a.spouse.filter(|s| homeless(*s)));
        household.extend(a.kids.iter().copied().filter(|k| homeless(*k)));
        Ok(household)
    }

    /// House an outsider. Falls back from buying or building, to new units
    /// at the complex nearest downtown, to lodging in the standing dwelling
    /// nearest their workplace.
    pub(crate) fn settle(&mut self, agent: AgentId, hiring: Option<EventId>) -> Result<()> {
        let a = self.town.agent(agent)?;
        if !a.present() || a.home.is_some() {
            return Ok(());
        }
        let household = self.newcomer_household(agent)?;
        let reason = hiring.map(Cause::Event);
        if let Some(home) = self.secure_home(agent, hiring)? {
            self.move_household(&household, home, reason)?;
            return Ok(());
        }

        SimCounters::bump(&self.metrics.housing_fallbacks);
        let mut complexes = self.town.companies_of_kind(CompanyKind::ApartmentComplex);
        complexes.sort_by(|x, y| {
            let dx = self.town.company(*x).map_or(f64::MAX, |c| self.layout.distance_from_downtown(c.lot));
            let dy = self.town.company(*y).map_or(f64::MAX, |c| self.layout.distance_from_downtown(c.lot));
            dx.total_cmp(&dy)
        });
        if let Some(complex) = complexes.first().copied() {
            let units = self.add_units(complex, EXPANSION_UNITS)?;
            if let Some(unit) = units.first().copied() {
                info!(%agent, %complex, "expanded apartment complex for newcomer");
                self.move_household(&household, unit, reason)?;
                return Ok(());
            }
        }

        let anchor = match self.town.workplace_lot(agent)? {
            Some(lot) => lot,
            None => self.downtown_lot(),
        };
        let mut lodging: Option<(DwellingId, f64)> = None;
        for d in self.town.standing_dwellings() {
            let distance = self.layout.distance(self.town.dwelling(d)?.lot, anchor);
            if lodging.is_none_or(|(_, best)| distance < best) {
                lodging = Some((d, distance));
            }
        }
        match lodging {
            Some((home, _)) => {
                warn!(%agent, %home, "newcomer lodging with existing residents");
                self.move_household(&household, home, reason)?;
                Ok(())
            }
            None => Err(TownError::NoLotAvailable {
                purpose: format!("housing for {agent}"),
            }),
        }
    }

    /// The lot closest to downtown.
    pub(crate) fn downtown_lot(&self) -> LotId {
        (0..self.layout.lot_count())
            .filter_map(|i| u32::try_from(i).ok().map(LotId))
            .min_by(|a, b| {
                self.layout
                    .distance_from_downtown(*a)
                    .total_cmp(&self.layout.distance_from_downtown(*b))
            })
            .unwrap_or(LotId(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TownConfig;
    use crate::layout::{GridLayout, SyllableNames};
    use crate::types::SimDate;

    fn make_sim(width: u32, height: u32) -> Simulation {
        let mut config = TownConfig::default();
        config.general.first_year = 1900;
        config.outsiders.family_population_pivot = 0.0;
        Simulation::new(config, Box::new(GridLayout::new(width, height)), Box::new(SyllableNames))
            .expect("valid config")
    }

    fn make_adult(sim: &mut Simulation) -> AgentId {
        let agent = sim.generate_outsider(None).expect("outsider");
        let a = sim.town_mut().agent_mut(agent).expect("agent");
        a.birth = SimDate::from_ymd(1870, 1, 1).expect("valid date");
        a.age = 30;
        agent
    }

    #[test]
    fn newcomer_builds_on_a_vacant_lot() {
        let mut sim = make_sim(3, 3);
        let agent = make_adult(&mut sim);
        let out = sim.settle_newcomer(agent).expect("settle");
        let home = sim.town().agent(agent).expect("agent").home.expect("home");
        assert!(sim.town().dwelling(home).expect("home").owners.contains(&agent));
        assert_eq!(out.events_tagged(sim.town(), crate::event::EventTag::HouseConstruction).len(), 1);
        assert_eq!(out.events_tagged(sim.town(), crate::event::EventTag::Move).len(), 1);
    }

    #[test]
    fn without_any_professional_the_event_has_no_architect() {
        let mut sim = make_sim(2, 2);
        let agent = make_adult(&mut sim);
        let out = sim.settle_newcomer(agent).expect("settle");
        let built = out.events_tagged(sim.town(), crate::event::EventTag::HouseConstruction);
        match &sim.town().event(built[0]).expect("event").kind {
            EventKind::HouseConstruction { architect, builders, .. } => {
                assert!(architect.is_none());
                assert!(builders.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn next_door_movers_become_neighbors() {
        let mut sim = make_sim(2, 1);
        let a = make_adult(&mut sim);
        let b = make_adult(&mut sim);
        sim.settle_newcomer(a).expect("settle a");
        sim.settle_newcomer(b).expect("settle b");
        assert!(sim.town().agent(a).expect("a").neighbors.contains(&b));
        assert!(sim.town().agent(b).expect("b").neighbors.contains(&a));
    }

    #[test]
    fn full_town_falls_back_to_lodging() {
        let mut sim = make_sim(1, 1);
        let a = make_adult(&mut sim);
        let b = make_adult(&mut sim);
        sim.settle_newcomer(a).expect("settle a");
        sim.settle_newcomer(b).expect("settle b");
        let home_a = sim.town().agent(a).expect("a").home;
        assert_eq!(home_a, sim.town().agent(b).expect("b").home);
        assert_eq!(sim.metrics().snapshot().housing_fallbacks, 1);
    }

    #[test]
    fn leaving_home_turns_neighbors_into_former_neighbors() {
        let mut sim = make_sim(2, 1);
        let a = make_adult(&mut sim);
        let b = make_adult(&mut sim);
        sim.settle_newcomer(a).expect("settle a");
        sim.settle_newcomer(b).expect("settle b");
        sim.leave_home(a).expect("leave");
        let town = sim.town();
        assert!(!town.agent(b).expect("b").neighbors.contains(&a));
        assert!(town.agent(b).expect("b").former_neighbors.contains(&a));
        assert!(town.agent(a).expect("a").home.is_none());
    }

    #[test]
    fn lot_rating_favors_proximity_to_work() {
        let mut sim = make_sim(5, 1);
        let agent = make_adult(&mut sim);
        let store = sim
            .establish_company(None, CompanyKind::GroceryStore, LotId(0))
            .expect("store");
        sim.hire_agent(store, OccupationKind::Cashier, crate::types::Shift::Day, agent)
            .expect("hire");
        let near = sim.rate_potential_lot(agent, LotId(1)).expect("near");
        let far = sim.rate_potential_lot(agent, LotId(4)).expect("far");
        assert!(near > far);
    }
}
