//! Outsiders hired into town, and the backstory they arrive with.
//!
//! An outsider may bring a spouse and kids. Their marriage and the kids'
//! births happened before they arrived, so those events are retconned:
//! dated somewhere in a past year, yet sequenced after everything already in
//! the log.

use tracing::{debug, info};

use crate::agent::AgentSeed;
use crate::error::Result;
use crate::metrics::{SimCounters, spans};
use crate::occupation::OccupationKind;
use crate::simulation::Simulation;
use crate::types::{AgentId, Attraction, Personality, Sex, SimDate};

impl Simulation {
    /// Bring a working-age outsider into town, old enough to have the
    /// experience a position of `kind` calls for. Their family, if any, is
    /// generated with them. Nobody is housed here.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn generate_outsider(&mut self, kind: Option<OccupationKind>) -> Result<AgentId> {
        let _span = tracing::debug_span!(spans::OUTSIDER, ?kind).entered();
        let cfg = self.ctx.config().outsiders.clone();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = kind.map_or(1.0, OccupationKind::level) as u32;
        let age = cfg.min_age + self.ctx.uniform_int(2 * level, 7 * level);
        let sex = if self.ctx.chance(0.5) { Sex::Male } else { Sex::Female };
        let outsider = self.spawn_adult(sex, age, None)?;
        if kind.is_some_and(OccupationKind::requires_college_degree) {
            self.town.agent_mut(outsider)?.college_graduate = true;
        }

        #[allow(clippy::cast_precision_loss)]
        let population = self.town.population() as f64;
        let family_chance =
            ((cfg.family_population_pivot - population) / cfg.family_chance_divisor).clamp(0.0, 1.0);
        if self.ctx.chance(family_chance) {
            self.retcon_family(outsider)?;
        }
        info!(%outsider, age, ?kind, "outsider arrives");
        Ok(outsider)
    }

    /// A new adult resident of `age` with a random personality and fresh
    /// surname unless one is given.
    fn spawn_adult(&mut self, sex: Sex, age: u32, surname: Option<String>) -> Result<AgentId> {
        let birth_year = self.ctx.year() - i32::try_from(age).unwrap_or(i32::MAX);
        let birth = self.ctx.random_date_in(birth_year);
        let mut traits = [0.0; 5];
        for t in &mut traits {
            *t = self.ctx.uniform(-1.0, 1.0);
        }
        let given_name = self.names.given_name(sex, self.ctx.rng());
        let surname = match surname {
            Some(s) => s,
            None => self.names.surname(self.ctx.rng()),
        };
        let agent = self.town.add_agent(
            AgentSeed {
                given_name,
                surname,
                sex,
                attraction: Attraction::heterosexual(sex),
                birth,
                personality: Personality::from_traits(traits),
            },
            &self.ctx,
        );
        self.town.agent_mut(agent)?.money = self.ctx.config().outsiders.starting_money;
        self.town.admit_resident(agent);
        SimCounters::bump(&self.metrics.outsiders);
        Ok(agent)
    }

    /// Give `outsider` a spouse, a backdated marriage and backdated kids.
    fn retcon_family(&mut self, outsider: AgentId) -> Result<()> {
        let cfg = self.ctx.config().outsiders.clone();
        let (sex, age, birth) = {
            let o = self.town.agent(outsider)?;
            (o.sex, o.age, o.birth)
        };
        let spouse_age = (age + self.ctx.uniform_int(0, 6)).saturating_sub(3).max(cfg.min_age);
        let spouse = self.spawn_adult(sex.opposite(), spouse_age, None)?;
        let (husband, wife) = if sex == Sex::Male { (outsider, spouse) } else { (spouse, outsider) };

        let husband_birth = if husband == outsider { birth } else { self.town.agent(spouse)?.birth };
        let youngest = birth.year.max(self.town.agent(spouse)?.birth.year);
        #[allow(clippy::cast_possible_truncation)]
        let drawn = husband_birth.year + self.ctx.normal(cfg.marriage_age_mean, cfg.marriage_age_sd).round() as i32;
        let year = retcon_marriage_year(drawn, youngest, self.ctx.date(), cfg.min_marriage_age);

        let surname = self.town.agent(husband)?.surname.clone();
        self.town.agent_mut(wife)?.surname = surname;
        let (wedding, _) = self.wed(husband, wife, Some(year))?;

        let mut kids = 0_u32;
        for y in year..self.ctx.year() {
            if self.ctx.chance(cfg.conception_chance / f64::from(kids + 1)) {
                self.bear_child(wife, Some(husband), Some(y))?;
                kids += 1;
            }
        }
        debug!(%husband, %wife, %wedding, year, kids, "retconned family");
        Ok(())
    }
}

/// Clamp a drawn retcon marriage year: the wedding must predate `today`'s
/// year and the younger spouse must be old enough to marry. Implausible
/// draws move to last year.
pub(crate) fn retcon_marriage_year(drawn: i32, youngest_birth_year: i32, today: SimDate, min_age: u32) -> i32 {
    let min_age = i32::try_from(min_age).unwrap_or(i32::MAX);
    if drawn >= today.year || drawn - youngest_birth_year < min_age {
        today.year - 1
    } else {
        drawn
    }
}
