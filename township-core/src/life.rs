//! Births, deaths, marriages and the rest of a life.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use tracing::{debug, info};

use crate::affinity;
use crate::agent::AgentSeed;
use crate::company::CompanyKind;
use crate::error::{Result, TownError};
use crate::event::{Cause, EventKind};
use crate::family::{self, Kinship, Marriage};
use crate::metrics::spans;
use crate::occupation::OccupationKind;
use crate::pointers;
use crate::relationship;
use crate::salience::SalienceChange;
use crate::simulation::{Cascade, Effect, Simulation, Task};
use crate::types::{AgentId, Attraction, DwellingId, EventId, MarriageId, Personality, Sex};

impl Simulation {
    // -- Birth and adoption --------------------------------------------------

    /// `mother` gives birth; her spouse, if any, is the father. The baby
    /// moves into the mother's home. A working mother with no day care in
    /// town gives up her job.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the mother is absent or male.
    pub fn birth(&mut self, mother: AgentId) -> Result<Cascade> {
        self.cascade("birth", |sim| {
            sim.require_present(mother, "birth")?;
            let m = sim.town.agent(mother)?;
            if m.sex != Sex::Female {
                return Err(TownError::invalid("birth", format!("{mother} cannot give birth")));
            }
            let father = m.spouse;
            let (baby, event) = sim.bear_child(mother, father, None)?;
            if let Some(home) = sim.town.agent(mother)?.home {
                sim.move_household(&[baby], home, Some(Cause::Event(event)))?;
            }
            if let Some(occ) = sim.town.agent(mother)?.occupation {
                if sim.town.companies_of_kind(CompanyKind::DayCare).is_empty() {
                    sim.terminate(occ, event)?;
                }
            }
            Ok(Some(event))
        })
    }

    /// `parents` adopt `child`.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if there are no parents, a parent is
    /// the child, or anyone involved is absent.
    pub fn adopt(&mut self, parents: &[AgentId], child: AgentId) -> Result<Cascade> {
        self.cascade("adopt", |sim| {
            if parents.is_empty() || parents.contains(&child) {
                return Err(TownError::invalid("adopt", "parents must be others"));
            }
            sim.require_present(child, "adopt")?;
            for parent in parents {
                sim.require_present(*parent, "adopt")?;
            }
            let event = sim.log(
                None,
                None,
                EventKind::Adoption {
                    subject: child,
                    parents: parents.to_vec(),
                },
            );
            sim.town.agent_mut(child)?.adoptive_parents.extend(parents.iter().copied());
            for parent in parents {
                sim.town.agent_mut(*parent)?.kids.insert(child);
            }
            if let [a, b] = parents {
                let spouse_a = sim.town.agent(*a)?;
                if spouse_a.spouse == Some(*b) {
                    if let Some(m) = spouse_a.marriage {
                        sim.town.marriage_mut(m)?.kids.insert(child);
                    }
                }
            }
            sim.welcome(child)?;
            Ok(Some(event))
        })
    }

    /// Create a baby of `mother` and `father`. A `year` before the current
    /// one backdates the birth. Family sets and newborn salience are set up;
    /// the baby is a resident but has no home yet.
    pub(crate) fn bear_child(
        &mut self,
        mother: AgentId,
        father: Option<AgentId>,
        year: Option<i32>,
    ) -> Result<(AgentId, EventId)> {
        let noise = self.ctx.config().life_cycle.inherited_personality_noise;
        let m = self.town.agent(mother)?;
        let marriage = m.marriage.filter(|_| father.is_some() && m.spouse == father);
        let hyphenate = match marriage {
            Some(id) => self.town.marriage(id)?.will_hyphenate_kids,
            None => false,
        };
        let mother_surname = m.surname.clone();
        let mother_traits = m.personality.traits();
        let (surname, father_traits) = match father {
            Some(f) => {
                let fa = self.town.agent(f)?;
                let surname = if hyphenate && fa.surname != mother_surname {
                    format!("{}-{mother_surname}", fa.surname)
                } else {
                    fa.surname.clone()
                };
                (surname, Some(fa.personality.traits()))
            }
            None => (mother_surname, None),
        };
        let mut traits = [0.0; 5];
        for (i, t) in traits.iter_mut().enumerate() {
            let mean = father_traits.map_or(mother_traits[i], |f| (mother_traits[i] + f[i]) / 2.0);
            *t = mean + self.ctx.uniform(-noise, noise);
        }
        let sex = if self.ctx.chance(0.5) { Sex::Male } else { Sex::Female };
        let given_name = self.names.given_name(sex, self.ctx.rng());
        let today = self.ctx.date();
        let baby = self.town.add_agent(
            AgentSeed {
                given_name,
                surname,
                sex,
                attraction: Attraction::heterosexual(sex),
                birth: today,
                personality: Personality::from_traits(traits),
            },
            &self.ctx,
        );
        {
            let b = self.town.agent_mut(baby)?;
            b.mother = Some(mother);
            b.father = father;
        }
        self.town.agent_mut(mother)?.kids.insert(baby);
        if let Some(f) = father {
            self.town.agent_mut(f)?.kids.insert(baby);
        }
        if let Some(id) = marriage {
            self.town.marriage_mut(id)?.kids.insert(baby);
        }

        let doctor = if year.is_none() {
            self.contract(mother, OccupationKind::Doctor)?
        } else {
            None
        };
        let event = self.log(
            year,
            None,
            EventKind::Birth {
                subject: baby,
                mother,
                father,
                doctor,
            },
        );
        let born = self.town.event(event)?.date;
        let cycle = &self.ctx.config().life_cycle;
        {
            let b = self.town.agent_mut(baby)?;
            b.birth = born;
            b.age = born.age_on(today);
            b.adult = b.age >= cycle.adult_age;
            b.in_workforce = b.age >= cycle.working_age;
        }
        self.town.admit_resident(baby);
        self.welcome(baby)?;
        debug!(%baby, %mother, retcon = year.is_some(), "born");
        Ok((baby, event))
    }

    /// Family sets for a new family member, and the salience between them
    /// and each relative.
    fn welcome(&mut self, newcomer: AgentId) -> Result<()> {
        family::rebuild_family(&mut self.town, newcomer)?;
        let relatives: Vec<AgentId> = self.town.agent(newcomer)?.extended_family.iter().copied().collect();
        for r in &relatives {
            family::rebuild_family(&mut self.town, *r)?;
        }
        let (ancestor, descendant, immediate, extended) = {
            let s = &self.ctx.config().salience;
            (
                SalienceChange::Ancestor.weight(s),
                SalienceChange::Descendant.weight(s),
                SalienceChange::ImmediateFamily.weight(s),
                SalienceChange::ExtendedFamily.weight(s),
            )
        };
        let close = self.town.agent(newcomer)?.immediate_family.clone();
        for r in relatives {
            let (toward_relative, toward_newcomer) = match family::kinship(&self.town, newcomer, r)? {
                Some(Kinship::Parent | Kinship::Grandparent) => (ancestor, descendant),
                _ if close.contains(&r) => (immediate, immediate),
                _ => (extended, extended),
            };
            self.town.agent_mut(newcomer)?.salience.adjust(r, toward_relative);
            self.town.agent_mut(r)?.salience.adjust(newcomer, toward_newcomer);
        }
        Ok(())
    }

    // -- Death and departure -------------------------------------------------

    /// `agent` dies. Their job ends (and is refilled), a surviving spouse is
    /// widowed, a sole-owned home passes to a working co-resident, and minor
    /// kids left with no parent in town depart.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the agent is not present.
    pub fn die(&mut self, agent: AgentId) -> Result<Cascade> {
        self.cascade("die", |sim| {
            sim.require_present(agent, "die")?;
            let next_of_kin = family::next_of_kin(&sim.town, &mut sim.ctx, agent)?;
            let mortician = match next_of_kin {
                Some(kin) => sim.contract(kin, OccupationKind::Mortician)?,
                None => None,
            };
            let (spouse, marriage, occupation, home) = {
                let a = sim.town.agent(agent)?;
                (a.spouse, a.marriage, a.occupation, a.home)
            };
            let widow = match spouse {
                Some(s) if sim.town.agent(s)?.present() => Some(s),
                _ => None,
            };
            let event = sim.log(
                None,
                None,
                EventKind::Death {
                    subject: agent,
                    widow,
                    next_of_kin,
                    mortician,
                },
            );
            sim.town.record_death(agent);
            sim.town.agent_mut(agent)?.alive = false;

            if let Some(m) = marriage {
                let today = sim.ctx.date();
                let record = sim.town.marriage_mut(m)?;
                record.terminus = Some(event);
                record.ended = Some(today);
            }
            if let Some(w) = widow {
                let survivor = sim.town.agent_mut(w)?;
                survivor.spouse = None;
                survivor.marriage = None;
                survivor.pointers.significant_other = None;
                survivor.widowed = true;
                survivor.grieving = true;
            }

            if let Some(occ) = occupation {
                sim.terminate(occ, event)?;
            }

            let mut orphans = Vec::new();
            for kid in sim.town.agent(agent)?.kids.clone() {
                let k = sim.town.agent(kid)?;
                if !k.present() || k.adult || home.is_none() || k.home != home {
                    continue;
                }
                let mut parent_present = false;
                for parent in k.parents() {
                    parent_present |= sim.town.agent(parent)?.present();
                }
                if !parent_present {
                    orphans.push(kid);
                }
            }
            for orphan in &orphans {
                sim.enqueue(Task::DepartTown {
                    agent: *orphan,
                    forced_family: Vec::new(),
                    reason: Some(event),
                });
            }

            sim.leave_home(agent)?;
            if let Some(h) = home {
                sim.settle_estate(agent, h, &orphans)?;
            }
            info!(%agent, %event, "died");
            Ok(Some(event))
        })
    }

    fn settle_estate(&mut self, deceased: AgentId, home: DwellingId, departing: &[AgentId]) -> Result<()> {
        let d = self.town.dwelling(home)?;
        if !d.owners.contains(&deceased) {
            return Ok(());
        }
        let sole = d.owners.len() == 1;
        let mut heir = None;
        if sole {
            for resident in &d.residents {
                let r = self.town.agent(*resident)?;
                if r.present() && r.in_workforce && !departing.contains(resident) {
                    heir = Some(*resident);
                    break;
                }
            }
        }
        let record = self.town.dwelling_mut(home)?;
        record.owners.remove(&deceased);
        record.former_owners.insert(deceased);
        if let Some(heir) = heir {
            record.owners.insert(heir);
            self.note(Effect::OwnershipTransferred { dwelling: home, heir });
        }
        Ok(())
    }

    /// `agent` leaves town for good, followed by every member of
    /// `forced_family` still living in town.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if the agent is not present.
    pub fn depart_town(&mut self, agent: AgentId, forced_family: &[AgentId]) -> Result<Cascade> {
        self.cascade("depart_town", |sim| {
            sim.require_present(agent, "depart_town")?;
            sim.depart(agent, forced_family, None)
        })
    }

    /// Departure bookkeeping. Absent agents are skipped.
    pub(crate) fn depart(
        &mut self,
        agent: AgentId,
        forced_family: &[AgentId],
        reason: Option<EventId>,
    ) -> Result<Option<EventId>> {
        if !self.town.agent(agent)?.present() || !self.town.is_resident(agent) {
            return Ok(None);
        }
        let event = self.log(None, reason.map(Cause::Event), EventKind::Departure { subject: agent });
        self.town.record_departure(agent);
        let (occupation, home) = {
            let a = self.town.agent_mut(agent)?;
            a.departed = true;
            (a.occupation, a.home)
        };
        if let Some(occ) = occupation {
            self.terminate(occ, event)?;
        }
        self.leave_home(agent)?;
        if let Some(h) = home {
            let d = self.town.dwelling_mut(h)?;
            if d.owners.remove(&agent) {
                d.former_owners.insert(agent);
            }
        }
        info!(%agent, %event, "left town");
        // Family leaving alongside share the trigger; an unprompted move hangs off the lead.
        let family_reason = reason.or(Some(event));
        for member in forced_family {
            if *member != agent {
                self.depart(*member, &[], family_reason)?;
            }
        }
        Ok(Some(event))
    }

    // -- Marriage and divorce ------------------------------------------------

    /// Marry `a` and `b`. One spouse may take the other's name (and pass it
    /// to young stepkids), and the couple moves into a home one of them owns
    /// or looks for one together.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` if either is absent or married, or
    /// they are the same agent.
    pub fn marry(&mut self, a: AgentId, b: AgentId) -> Result<Cascade> {
        self.cascade("marry", |sim| {
            if a == b {
                return Err(TownError::invalid("marry", format!("{a} cannot marry themselves")));
            }
            for x in [a, b] {
                sim.require_present(x, "marry")?;
                if sim.town.agent(x)?.spouse.is_some() {
                    return Err(TownError::invalid("marry", format!("{x} is already married")));
                }
            }
            let (event, marriage) = sim.wed(a, b, None)?;
            let cfg = sim.ctx.config().marriage.clone();

            let (changer, keeper) = {
                let (sa, sb) = (sim.town.agent(a)?.sex, sim.town.agent(b)?.sex);
                if sa == sb || sa == Sex::Female { (a, b) } else { (b, a) }
            };
            if sim.ctx.chance(cfg.name_change) {
                let surname = sim.town.agent(keeper)?.surname.clone();
                if sim.town.agent(changer)?.surname != surname {
                    let change = sim.change_name(changer, &surname, event)?;
                    sim.town.marriage_mut(marriage)?.name_changes.push(change);
                    let keeper_kids = sim.town.agent(keeper)?.kids.clone();
                    let mut stepkids = Vec::new();
                    for kid in &sim.town.agent(changer)?.kids {
                        let k = sim.town.agent(*kid)?;
                        if k.present()
                            && k.age <= cfg.stepchild_name_max_age
                            && !keeper_kids.contains(kid)
                            && k.surname != surname
                        {
                            stepkids.push(*kid);
                        }
                    }
                    for kid in stepkids {
                        if sim.ctx.chance(cfg.stepchild_name_change) {
                            let change = sim.change_name(kid, &surname, event)?;
                            sim.town.marriage_mut(marriage)?.name_changes.push(change);
                        }
                    }
                }
            }
            let hyphenate = sim.ctx.chance(cfg.hyphenate_children);
            sim.town.marriage_mut(marriage)?.will_hyphenate_kids = hyphenate;

            if sim.town.is_resident(a) && sim.town.is_resident(b) {
                sim.arrange_living(a, b, event)?;
            }
            Ok(Some(event))
        })
    }

    /// Wedding bookkeeping shared by live and backdated marriages.
    pub(crate) fn wed(&mut self, a: AgentId, b: AgentId, year: Option<i32>) -> Result<(EventId, MarriageId)> {
        let marriage = self.town.next_marriage_id();
        let event = self.log(
            year,
            None,
            EventKind::Marriage {
                spouses: [a, b],
                marriage,
            },
        );
        let began = self.town.event(event)?.date;
        let money = self.town.agent(a)?.money + self.town.agent(b)?.money;
        self.town.add_marriage(Marriage {
            id: marriage,
            spouses: [a, b],
            wedding: event,
            began,
            ended: None,
            terminus: None,
            money,
            name_changes: Vec::new(),
            kids: BTreeSet::new(),
            will_hyphenate_kids: false,
        });
        let bond = {
            let s = &self.ctx.config().salience;
            SalienceChange::SignificantOther.weight(s) + SalienceChange::ImmediateFamily.weight(s)
        };
        let mut union: BTreeSet<AgentId> = [a, b].into_iter().collect();
        union.extend(self.town.agent(a)?.extended_family.iter().copied());
        union.extend(self.town.agent(b)?.extended_family.iter().copied());
        for (x, y) in [(a, b), (b, a)] {
            let spouse = self.town.agent_mut(x)?;
            spouse.spouse = Some(y);
            spouse.marriage = Some(marriage);
            spouse.marriages.push(marriage);
            spouse.pointers.significant_other = Some(y);
            spouse.salience.adjust(y, bond);
            spouse.grieving = false;
            spouse.money = 0.0;
            spouse.extended_family.extend(union.iter().copied().filter(|m| *m != x));
        }
        family::rebuild_family(&mut self.town, a)?;
        family::rebuild_family(&mut self.town, b)?;
        Ok((event, marriage))
    }

    /// A newlywed couple moves into a home one of them owns, or is queued to
    /// look for one together with the kids living with each.
    fn arrange_living(&mut self, a: AgentId, b: AgentId, event: EventId) -> Result<()> {
        let mut owned = None;
        for x in [a, b] {
            if let Some(home) = self.town.agent(x)?.home {
                if self.town.dwelling(home)?.owners.contains(&x) {
                    owned = Some((x, home));
                    break;
                }
            }
        }
        match owned {
            Some((owner, home)) => {
                let other = if owner == a { b } else { a };
                if self.town.agent(other)?.home == Some(home) {
                    return Ok(());
                }
                let mut movers = vec![other];
                movers.extend(self.kids_at_home(other)?);
                self.move_household(&movers, home, Some(Cause::Event(event)))?;
            }
            None => {
                let mut household = vec![a, b];
                for kid in self.kids_at_home(a)?.into_iter().chain(self.kids_at_home(b)?) {
                    if !household.contains(&kid) {
                        household.push(kid);
                    }
                }
                self.enqueue(Task::Resettle { household, reason: event });
            }
        }
        Ok(())
    }

    /// Present kids sharing `agent`'s home.
    fn kids_at_home(&self, agent: AgentId) -> Result<Vec<AgentId>> {
        let a = self.town.agent(agent)?;
        let mut out = Vec::new();
        if a.home.is_none() {
            return Ok(out);
        }
        for kid in &a.kids {
            let k = self.town.agent(*kid)?;
            if k.present() && k.home == a.home {
                out.push(*kid);
            }
        }
        Ok(out)
    }

    /// Divorce `a` and `b`. Money is split, feelings may cool, names may
    /// revert, and one spouse moves out with their own kids.
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` unless `a` and `b` are married to
    /// each other.
    pub fn divorce(&mut self, a: AgentId, b: AgentId) -> Result<Cascade> {
        self.cascade("divorce", |sim| {
            let spouse_a = sim.town.agent(a)?;
            let marriage = spouse_a
                .marriage
                .filter(|_| spouse_a.spouse == Some(b))
                .ok_or_else(|| TownError::invalid("divorce", format!("{a} is not married to {b}")))?;
            let lawyer = sim.contract(a, OccupationKind::Lawyer)?;
            let event = sim.log(
                None,
                None,
                EventKind::Divorce {
                    spouses: [a, b],
                    marriage,
                    lawyer,
                },
            );
            let today = sim.ctx.date();
            let (years, money) = {
                let m = sim.town.marriage_mut(marriage)?;
                m.terminus = Some(event);
                m.ended = Some(today);
                let money = std::mem::take(&mut m.money);
                (m.duration(today), money)
            };
            let cfg = sim.ctx.config().clone();
            let bond = SalienceChange::SignificantOther.weight(&cfg.salience)
                + SalienceChange::ImmediateFamily.weight(&cfg.salience);
            for (x, y) in [(a, b), (b, a)] {
                let former = sim.town.agent_mut(x)?;
                former.spouse = None;
                former.marriage = None;
                former.pointers.significant_other = None;
                former.salience.adjust(y, -bond);
                former.money += money / 2.0;
                former.extended_family.remove(&y);
            }
            family::rebuild_family(&mut sim.town, a)?;
            family::rebuild_family(&mut sim.town, b)?;

            for (x, y) in [(a, b), (b, a)] {
                if !sim.ctx.chance(cfg.marriage.fall_out_of_love) {
                    continue;
                }
                if let Some(id) = relationship::current(&sim.town, x, y)? {
                    let steps = sim.ctx.normalization_steps();
                    let raw = cfg.marriage.fallen_out_raw_spark;
                    let record = sim.town.relationship_mut(id)?;
                    record.raw_spark = raw;
                    record.spark = affinity::normalize_spark(raw, steps, &cfg.affinity);
                }
                pointers::recompute_love_interest(&mut sim.town, &cfg.salience, x)?;
            }

            let cap = cfg.marriage.name_reversion_cap;
            let reversion = (cap / ((years + 0.1) / 4.0)).min(cap);
            for x in [a, b] {
                let (current, maiden) = {
                    let former = sim.town.agent(x)?;
                    (former.surname.clone(), former.maiden_name.clone())
                };
                if current != maiden && sim.ctx.chance(reversion) {
                    sim.change_name(x, &maiden, event)?;
                }
            }

            let (sa, sb) = (sim.town.agent(a)?.sex, sim.town.agent(b)?.sex);
            let mover = if sa == sb {
                a
            } else {
                let (male, female) = if sa == Sex::Male { (a, b) } else { (b, a) };
                if sim.ctx.chance(cfg.marriage.male_moves_out) { male } else { female }
            };
            let other = if mover == a { b } else { a };
            if sim.town.is_resident(mover) {
                let others_kids = sim.town.agent(other)?.kids.clone();
                let mut household = vec![mover];
                household.extend(
                    sim.kids_at_home(mover)?
                        .into_iter()
                        .filter(|k| !others_kids.contains(k)),
                );
                sim.enqueue(Task::Resettle { household, reason: event });
            }
            Ok(Some(event))
        })
    }

    /// File a surname change, caused by a marriage or divorce.
    pub(crate) fn change_name(&mut self, agent: AgentId, new_surname: &str, reason: EventId) -> Result<EventId> {
        let lawyer = self.contract(agent, OccupationKind::Lawyer)?;
        let old_surname = self.town.agent(agent)?.surname.clone();
        let event = self.log(
            None,
            Some(Cause::Event(reason)),
            EventKind::NameChange {
                subject: agent,
                old_surname,
                new_surname: new_surname.to_string(),
                lawyer,
            },
        );
        self.town.agent_mut(agent)?.surname = new_surname.to_string();
        Ok(event)
    }

    // -- Aging ---------------------------------------------------------------

    /// Age every resident whose birthday it is. Crossing romantic age or
    /// adulthood recomputes spark increments; crossing a damping milestone
    /// recomputes damping. Returns who had a birthday.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn celebrate_birthdays(&mut self) -> Result<Vec<AgentId>> {
        let today = self.ctx.date();
        let cycle = self.ctx.config().life_cycle.clone();
        let residents: Vec<AgentId> = self.town.residents().collect();
        let mut celebrated = Vec::new();
        for agent in residents {
            let a = self.town.agent(agent)?;
            let age = a.birth.age_on(today);
            if age == a.age {
                continue;
            }
            {
                let a = self.town.agent_mut(agent)?;
                a.age = age;
                a.adult |= age >= cycle.adult_age;
                if age >= cycle.working_age && !a.retired {
                    a.in_workforce = true;
                }
            }
            if age == cycle.romantic_age || age == cycle.adult_age {
                relationship::refresh_spark(&mut self.town, &self.ctx, agent)?;
            }
            if cycle.damping_milestones.contains(&age) {
                relationship::refresh_damping(&mut self.town, &self.ctx, agent)?;
            }
            celebrated.push(agent);
        }
        Ok(celebrated)
    }

    // -- Socializing ---------------------------------------------------------

    /// Probability that `a` strikes up an interaction with `b` this timestep.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn chance_of_interaction(&self, a: AgentId, b: AgentId) -> Result<f64> {
        let cfg = &self.ctx.config().socializing;
        if a == b || self.town.agent(b)?.age < cfg.min_age {
            return Ok(0.0);
        }
        let me = self.town.agent(a)?;
        let mut chance = me
            .personality
            .extroversion
            .clamp(cfg.extroversion_floor, cfg.extroversion_cap);
        if relationship::current(&self.town, a, b)?.is_none() {
            chance += me.personality.openness.clamp(cfg.openness_floor, cfg.openness_cap);
        } else {
            if me.friends.contains(&b) {
                chance += cfg.friend_bonus;
            }
            if me.best_friend() == Some(b) {
                chance += cfg.best_friend_bonus;
            }
        }
        Ok(chance.clamp(cfg.chance_floor, cfg.chance_cap))
    }

    /// Let `agent` interact with whoever in `pool` they happen to meet.
    /// Co-residents always interact. Returns the number of pairs progressed.
    ///
    /// # Errors
    /// Returns an unknown-handle error.
    pub fn socialize(&mut self, agent: AgentId, pool: &[AgentId], elapsed: f64) -> Result<usize> {
        let _span = tracing::trace_span!(spans::SOCIALIZE, %agent).entered();
        let me = self.town.agent(agent)?;
        if !me.present() {
            return Ok(0);
        }
        let home = me.home;
        let mut progressed = 0;
        for &other in pool {
            if other == agent || !self.town.agent(other)?.present() {
                continue;
            }
            let housemate = home.is_some() && self.town.agent(other)?.home == home;
            if !housemate {
                let chance = self.chance_of_interaction(agent, other)?;
                if chance <= 0.0 || !self.ctx.chance(chance) {
                    continue;
                }
            }
            let outcome = relationship::progress(&mut self.town, &self.ctx, agent, other, elapsed)?;
            if outcome.stepped.is_empty() {
                continue;
            }
            progressed += 1;
            self.metrics
                .interactions
                .fetch_add(outcome.stepped.len() as u64, Ordering::Relaxed);
            self.metrics
                .transitions
                .fetch_add(outcome.transitions.len() as u64, Ordering::Relaxed);
        }
        Ok(progressed)
    }
}
