//! Founding a town.
//!
//! The founder arrives as an outsider, settles, opens a construction firm
//! and becomes mayor. Every starter business then opens in order: public
//! institutions are commissioned by the mayor, the rest by an outsider who
//! arrives to own them.

use tracing::info;
use township_core::company::CompanyKind;
use township_core::occupation::OccupationKind;
use township_core::{AgentId, GridLayout, Result, Simulation, SyllableNames};

use crate::config::DriverConfig;

/// Builds a founded [`Simulation`] from a [`DriverConfig`].
#[derive(Debug, Clone)]
pub struct TownBuilder {
    config: DriverConfig,
}

impl TownBuilder {
    /// Builder for `config`.
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Lay out the grid, found the town and open the starter businesses.
    ///
    /// # Errors
    /// Returns `TownError::Config` for an invalid configuration and
    /// `TownError::NoLotAvailable` when the grid is too small for the
    /// starter businesses.
    pub fn build(self) -> Result<Simulation> {
        self.config.validate()?;
        let founding = &self.config.founding;
        let layout = GridLayout::new(founding.grid_width, founding.grid_height);
        let mut sim = Simulation::new(self.config.town.clone(), Box::new(layout), Box::new(SyllableNames))?;

        let founder = arrive(&mut sim, OccupationKind::Owner)?;
        sim.town_mut().set_mayor(Some(founder));
        sim.found_business(founder, CompanyKind::ConstructionFirm)?;

        for kind in &founding.starter_businesses {
            let client = match kind.owner_kind() {
                Some(owner_kind) => arrive(&mut sim, owner_kind)?,
                None => founder,
            };
            sim.found_business(client, *kind)?;
        }
        info!(
            town = %sim.town().name,
            population = sim.town().population(),
            companies = sim.town().companies().count(),
            "town founded"
        );
        Ok(sim)
    }
}

/// An outsider who comes to take a position of `kind`, already housed.
fn arrive(sim: &mut Simulation, kind: OccupationKind) -> Result<AgentId> {
    let agent = sim.generate_outsider(Some(kind))?;
    sim.settle_newcomer(agent)?;
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use township_core::EventTag;

    fn make_config(seed: u64) -> DriverConfig {
        let mut config = DriverConfig::default();
        config.town.general.seed = seed;
        config.town.general.first_year = 1900;
        config
    }

    #[test]
    fn founding_opens_every_starter_business() {
        let sim = TownBuilder::new(make_config(11)).build().expect("founded");
        let town = sim.town();
        let expected = 1 + DriverConfig::default().founding.starter_businesses.len();
        assert_eq!(town.companies().count(), expected);
        assert_eq!(town.events().count(EventTag::BusinessConstruction), expected);
        assert_eq!(town.companies_of_kind(CompanyKind::ConstructionFirm).len(), 1);
        let mayor = town.mayor().expect("mayor");
        assert!(town.agent(mayor).expect("mayor").home.is_some());
    }

    #[test]
    fn every_resident_is_housed() {
        let sim = TownBuilder::new(make_config(12)).build().expect("founded");
        let town = sim.town();
        for agent in town.residents() {
            assert!(town.agent(agent).expect("agent").home.is_some(), "{agent} unhoused");
        }
    }

    #[test]
    fn public_institutions_carry_the_town_name() {
        let sim = TownBuilder::new(make_config(13)).build().expect("founded");
        let town = sim.town();
        let hall = town.companies_of_kind(CompanyKind::CityHall)[0];
        assert!(town.company(hall).expect("hall").name.starts_with(&town.name));
        assert!(town.company(hall).expect("hall").owner.is_none());
    }
}
