//! Founding, closing and demolishing.

use std::collections::BTreeSet;

use tracing::info;

use crate::company::{Company, CompanyKind, Vacancies};
use crate::dwelling::Building;
use crate::error::{Result, TownError};
use crate::event::{Cause, EventKind};
use crate::heuristics;
use crate::hiring::Opening;
use crate::metrics::spans;
use crate::occupation::OccupationKind;
use crate::simulation::{Cascade, Simulation, Task};
use crate::types::{AgentId, CompanyId, EventId, LotId, Shift};

/// Units built with a new apartment complex.
pub const STARTING_UNITS: u32 = 4;

/// A law firm's name from its partners' `(given, surname)` pairs. A sole
/// partner is named in full; several are listed by surname as "A, B & C".
pub(crate) fn law_firm_name(partners: &[(String, String)]) -> Option<String> {
    let label = CompanyKind::LawFirm.label();
    match partners {
        [] => None,
        [(given, surname)] => Some(format!("{label} {given} {surname}")),
        [rest @ .., (_, last)] => {
            let leading: Vec<&str> = rest.iter().map(|(_, s)| s.as_str()).collect();
            Some(format!("{label} {} & {last}", leading.join(", ")))
        }
    }
}

impl Simulation {
    /// Register a company on `lot` without hiring anyone. World setup uses
    /// this directly; [`Simulation::found_business`] builds on it.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the lot is not vacant.
    pub fn establish_company(&mut self, owner: Option<AgentId>, kind: CompanyKind, lot: LotId) -> Result<CompanyId> {
        if !self.town.lot(lot)?.is_vacant() {
            return Err(TownError::invalid("establish_company", format!("{lot} is occupied")));
        }
        let name = match owner {
            Some(o) if kind == CompanyKind::LawFirm => {
                let a = self.town.agent(o)?;
                law_firm_name(&[(a.given_name.clone(), a.surname.clone())])
                    .unwrap_or_else(|| kind.label().to_string())
            }
            Some(o) if !kind.is_public() => format!("{} {}", self.town.agent(o)?.surname, kind.label()),
            _ => format!("{} {}", self.town.name, kind.label()),
        };
        let company = self.town.add_company(Company {
            id: CompanyId(0),
            kind,
            name,
            lot,
            owner: None,
            founder: None,
            employees: BTreeSet::new(),
            former_employees: BTreeSet::new(),
            former_owners: Vec::new(),
            supplemental_vacancies: Vacancies::for_kind(kind),
            units: Vec::new(),
            founded: self.ctx.date(),
            closed: None,
            out_of_business: false,
            construction: None,
            closure: None,
        });
        self.town.lot_mut(lot)?.building = Some(Building::Company(company));
        if kind.houses_residents() {
            self.add_units(company, STARTING_UNITS)?;
        }
        info!(%company, kind = kind.label(), %lot, "company established");
        Ok(company)
    }

    /// `owner` founds a company of `kind`: pick a lot (demolishing a house
    /// when none is vacant), hire the owner and the initial staff, and log
    /// the construction.
    ///
    /// # Errors
    /// Returns `TownError::NoLotAvailable` when there is neither a vacant
    /// lot nor a house to tear down.
    pub fn found_business(&mut self, owner: AgentId, kind: CompanyKind) -> Result<Cascade> {
        self.cascade("found_business", |sim| {
            let _span = tracing::info_span!(spans::FOUND_BUSINESS, %owner, kind = kind.label()).entered();
            sim.require_present(owner, "found_business")?;
            let (lot, demolition) = sim.pick_business_lot()?;
            let company = sim.establish_company(Some(owner), kind, lot)?;
            if let Some(owner_kind) = kind.owner_kind() {
                let (occ, _) = sim.hire_into(Opening::new(company, owner_kind, Shift::Day), Some(owner))?;
                let c = sim.town.company_mut(company)?;
                c.owner = Some(occ);
                c.founder = Some(occ);
            }
            for shift in [Shift::Day, Shift::Night] {
                for position in kind.initial_positions(shift) {
                    sim.hire_into(Opening::new(company, *position, shift), None)?;
                }
            }
            let architect = sim.contract(owner, OccupationKind::Architect)?;
            let construction = sim.log(
                None,
                None,
                EventKind::BusinessConstruction {
                    client: owner,
                    company,
                    lot,
                    architect,
                    demolition,
                },
            );
            sim.town.company_mut(company)?.construction = Some(construction);
            Ok(Some(construction))
        })
    }

    /// Close `company`: every employee is laid off and the building is torn
    /// down.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if it already closed.
    pub fn close_business(&mut self, company: CompanyId) -> Result<Cascade> {
        self.cascade("close_business", |sim| sim.close(company).map(Some))
    }

    /// Tear down whatever stands on `lot`; residents are rehoused.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the lot is vacant.
    pub fn demolish_building(&mut self, lot: LotId) -> Result<Cascade> {
        self.cascade("demolish_building", |sim| sim.demolish(lot, None).map(Some))
    }

    fn pick_business_lot(&mut self) -> Result<(LotId, Option<EventId>)> {
        let vacant: Vec<(LotId, f64)> = self
            .town
            .vacant_lots()
            .into_iter()
            .map(|lot| (lot, -self.layout.distance_from_downtown(lot)))
            .collect();
        if let Some(lot) = heuristics::choose(&vacant, &mut self.ctx) {
            return Ok((lot, None));
        }
        let mut houses = Vec::new();
        for lot in self.town.lots() {
            if let Some(Building::Dwelling(d)) = lot.building {
                if self.town.dwelling(d)?.complex().is_none() {
                    houses.push((lot.id, -self.layout.distance_from_downtown(lot.id)));
                }
            }
        }
        match heuristics::choose(&houses, &mut self.ctx) {
            Some(lot) => {
                let demolition = self.demolish(lot, None)?;
                Ok((lot, Some(demolition)))
            }
            None => Err(TownError::NoLotAvailable {
                purpose: "a new business".to_string(),
            }),
        }
    }

    pub(crate) fn close(&mut self, company: CompanyId) -> Result<EventId> {
        let _span = tracing::info_span!(spans::CLOSE_BUSINESS, %company).entered();
        if !self.town.company(company)?.operating() {
            return Err(TownError::invalid("close_business", format!("{company} already closed")));
        }
        let closure = self.log(None, None, EventKind::BusinessClosure { company });
        let (lot, staff) = {
            let today = self.ctx.date();
            let c = self.town.company_mut(company)?;
            c.out_of_business = true;
            c.closed = Some(today);
            c.closure = Some(closure);
            (c.lot, c.employees.iter().copied().collect::<Vec<_>>())
        };
        for occ in staff {
            let o = self.town.occupation(occ)?;
            if !o.is_active() {
                continue;
            }
            let subject = o.holder;
            let layoff = self.log(
                None,
                Some(Cause::Event(closure)),
                EventKind::LayOff {
                    subject,
                    company,
                    occupation: occ,
                },
            );
            self.terminate(occ, layoff)?;
        }
        self.demolish(lot, Some(closure))?;
        info!(%company, %closure, "business closed");
        Ok(closure)
    }

    /// Demolish the building on `lot`. Residents are queued for rehousing.
    pub(crate) fn demolish(&mut self, lot: LotId, reason: Option<EventId>) -> Result<EventId> {
        let building = self
            .town
            .lot(lot)?
            .building
            .ok_or_else(|| TownError::invalid("demolish", format!("{lot} is vacant")))?;
        let own = match building {
            Building::Company(c) => Some(c),
            Building::Dwelling(_) => None,
        };
        let firms: Vec<CompanyId> = self
            .town
            .companies_of_kind(CompanyKind::ConstructionFirm)
            .into_iter()
            .filter(|c| Some(*c) != own)
            .collect();
        let demolition_company = self.ctx.pick_index(firms.len()).map(|i| firms[i]);
        let event = self.log(
            None,
            reason.map(Cause::Event),
            EventKind::Demolition {
                lot,
                building,
                demolition_company,
            },
        );
        {
            let l = self.town.lot_mut(lot)?;
            l.building = None;
            l.former_buildings.push(building);
        }
        let dwellings = match building {
            Building::Dwelling(d) => vec![d],
            Building::Company(c) => self.town.company(c)?.units.clone(),
        };
        for d in dwellings {
            let residents: Vec<AgentId> = {
                let rec = self.town.dwelling_mut(d)?;
                rec.demolished = true;
                rec.demolition = Some(event);
                rec.residents.iter().copied().collect()
            };
            for agent in residents {
                self.enqueue(Task::Rehouse {
                    agent,
                    displaced_from: d,
                    reason: event,
                });
            }
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TownConfig;
    use crate::event::EventTag;
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
    fn law_firm_name_leads_with_the_label() {
        let mut sim = make_sim(3, 3);
        let owner = make_adult(&mut sim);
        let firm = sim
            .establish_company(Some(owner), CompanyKind::LawFirm, LotId(0))
            .expect("firm");
        let name = sim.town().agent(owner).expect("owner").full_name();
        assert_eq!(sim.town().company(firm).expect("firm").name, format!("Law Offices of {name}"));
    }

    #[test]
    fn partners_are_listed_by_surname() {
        let pair = |g: &str, s: &str| (g.to_string(), s.to_string());
        assert_eq!(law_firm_name(&[]), None);
        assert_eq!(
            law_firm_name(&[pair("Ada", "Moss")]).as_deref(),
            Some("Law Offices of Ada Moss")
        );
        assert_eq!(
            law_firm_name(&[pair("Ada", "Moss"), pair("Ben", "Hale")]).as_deref(),
            Some("Law Offices of Moss & Hale")
        );
        assert_eq!(
            law_firm_name(&[pair("Ada", "Moss"), pair("Ben", "Hale"), pair("Cy", "Orr")]).as_deref(),
            Some("Law Offices of Moss, Hale & Orr")
        );
    }

    #[test]
    fn complexes_start_with_units() {
        let mut sim = make_sim(3, 3);
        let complex = sim
            .establish_company(None, CompanyKind::ApartmentComplex, LotId(4))
            .expect("complex");
        assert_eq!(sim.town().company(complex).expect("complex").units.len(), STARTING_UNITS as usize);
        assert_eq!(sim.town().vacant_homes().len(), STARTING_UNITS as usize);
    }

    #[test]
    fn occupied_lot_is_rejected() {
        let mut sim = make_sim(2, 2);
        sim.establish_company(None, CompanyKind::Bar, LotId(0)).expect("bar");
        assert!(sim.establish_company(None, CompanyKind::Bank, LotId(0)).is_err());
    }

    #[test]
    fn founding_prefers_downtown_and_staffs_up() {
        let mut sim = make_sim(3, 3);
        let owner = make_adult(&mut sim);
        let out = sim.found_business(owner, CompanyKind::Bar).expect("found");
        let root = sim.town().event(out.root.expect("root")).expect("event");
        let EventKind::BusinessConstruction { company, lot, .. } = root.kind else {
            panic!("root should be construction");
        };
        assert!(sim.layout().distance_from_downtown(lot) <= 1.0);
        let c = sim.town().company(company).expect("company");
        assert!(c.owner.is_some());
        assert_eq!(c.owner, c.founder);
        // Owner plus two bartenders.
        assert_eq!(c.employees.len(), 3);
    }

    #[test]
    fn no_lot_and_no_house_is_an_error() {
        let mut sim = make_sim(1, 1);
        sim.establish_company(None, CompanyKind::Bar, LotId(0)).expect("bar");
        let owner = make_adult(&mut sim);
        let err = sim.found_business(owner, CompanyKind::Bank).expect_err("no lot");
        assert!(matches!(err, TownError::NoLotAvailable { .. }));
    }

    #[test]
    fn demolishing_a_complex_displaces_every_unit() {
        let mut sim = make_sim(3, 3);
        let complex = sim
            .establish_company(None, CompanyKind::ApartmentComplex, LotId(4))
            .expect("complex");
        let a = make_adult(&mut sim);
        let b = make_adult(&mut sim);
        let units = sim.town().company(complex).expect("complex").units.clone();
        sim.town_mut().dwelling_mut(units[0]).expect("unit").residents.insert(a);
        sim.town_mut().agent_mut(a).expect("a").home = Some(units[0]);
        sim.town_mut().dwelling_mut(units[3]).expect("unit").residents.insert(b);
        sim.town_mut().agent_mut(b).expect("b").home = Some(units[3]);

        let out = sim.demolish_building(LotId(4)).expect("demolish");
        assert_eq!(out.events_tagged(sim.town(), EventTag::Demolition).len(), 1);
        for agent in [a, b] {
            let home = sim.town().agent(agent).expect("agent").home.expect("rehoused");
            assert!(!units.contains(&home));
        }
        assert!(sim.town().lot(LotId(4)).expect("lot").is_vacant());
    }
}
