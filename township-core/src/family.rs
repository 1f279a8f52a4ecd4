//! Marriages and kinship.
//!
//! Family sets on each agent are caches over the parent/kid/spouse links;
//! [`rebuild_family`] recomputes them from those links.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::SimContext;
use crate::error::Result;
use crate::town::Town;
use crate::types::{AgentId, EventId, MarriageId, SimDate};

/// A marriage, from wedding to terminus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marriage {
    /// Registry handle.
    pub id: MarriageId,
    /// The spouses, in the order they were passed to the wedding.
    pub spouses: [AgentId; 2],
    /// Marriage event.
    pub wedding: EventId,
    /// Wedding date.
    pub began: SimDate,
    /// Date the marriage ended.
    pub ended: Option<SimDate>,
    /// Divorce or death that ended it.
    pub terminus: Option<EventId>,
    /// Pooled money.
    pub money: f64,
    /// Name changes caused by the marriage.
    pub name_changes: Vec<EventId>,
    /// Kids born or adopted into the marriage.
    pub kids: BTreeSet<AgentId>,
    /// Kids get a hyphenated surname.
    pub will_hyphenate_kids: bool,
}

impl Marriage {
    /// The spouse other than `agent`.
    #[must_use]
    pub fn partner_of(&self, agent: AgentId) -> Option<AgentId> {
        match self.spouses {
            [a, b] if a == agent => Some(b),
            [a, b] if b == agent => Some(a),
            _ => None,
        }
    }

    /// Years married as of `today` (or the end date).
    #[must_use]
    pub fn duration(&self, today: SimDate) -> f64 {
        self.ended.unwrap_or(today).years_since(self.began)
    }
}

/// How `b` is related to `a`, read as "b is a's ...".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kinship {
    /// Parent.
    Parent,
    /// Kid.
    Kid,
    /// Sibling (shares a parent).
    Sibling,
    /// Grandparent.
    Grandparent,
    /// Grandkid.
    Grandkid,
    /// Aunt or uncle.
    AuntOrUncle,
    /// Niece or nephew.
    NieceOrNephew,
    /// Cousin.
    Cousin,
}

fn siblings(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for parent in town.agent(agent)?.parents() {
        out.extend(town.agent(parent)?.kids.iter().copied());
    }
    out.remove(&agent);
    Ok(out)
}

fn grandparents(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for parent in town.agent(agent)?.parents() {
        out.extend(town.agent(parent)?.parents());
    }
    Ok(out)
}

fn grandkids(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for kid in &town.agent(agent)?.kids {
        out.extend(town.agent(*kid)?.kids.iter().copied());
    }
    Ok(out)
}

fn aunts_and_uncles(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for parent in town.agent(agent)?.parents() {
        out.extend(siblings(town, parent)?);
    }
    Ok(out)
}

fn nieces_and_nephews(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for sibling in siblings(town, agent)? {
        out.extend(town.agent(sibling)?.kids.iter().copied());
    }
    Ok(out)
}

fn cousins(town: &Town, agent: AgentId) -> Result<BTreeSet<AgentId>> {
    let mut out = BTreeSet::new();
    for elder in aunts_and_uncles(town, agent)? {
        out.extend(town.agent(elder)?.kids.iter().copied());
    }
    out.remove(&agent);
    Ok(out)
}

/// Closest blood kinship of `b` to `a`, if any.
///
/// # Errors
/// Returns `TownError::AgentNotFound` for an unknown handle.
pub fn kinship(town: &Town, a: AgentId, b: AgentId) -> Result<Option<Kinship>> {
    let agent = town.agent(a)?;
    let found = if agent.parents().contains(&b) {
        Some(Kinship::Parent)
    } else if agent.kids.contains(&b) {
        Some(Kinship::Kid)
    } else if siblings(town, a)?.contains(&b) {
        Some(Kinship::Sibling)
    } else if grandparents(town, a)?.contains(&b) {
        Some(Kinship::Grandparent)
    } else if grandkids(town, a)?.contains(&b) {
        Some(Kinship::Grandkid)
    } else if aunts_and_uncles(town, a)?.contains(&b) {
        Some(Kinship::AuntOrUncle)
    } else if nieces_and_nephews(town, a)?.contains(&b) {
        Some(Kinship::NieceOrNephew)
    } else if cousins(town, a)?.contains(&b) {
        Some(Kinship::Cousin)
    } else {
        None
    };
    Ok(found)
}

/// Recompute `agent`'s immediate and extended family sets from the parent,
/// kid and spouse links. In-laws already in the extended set are kept.
///
/// # Errors
/// Returns `TownError::AgentNotFound` for an unknown handle.
pub fn rebuild_family(town: &mut Town, agent: AgentId) -> Result<()> {
    let (parents, kids, spouse, previous_extended) = {
        let a = town.agent(agent)?;
        (a.parents(), a.kids.clone(), a.spouse, a.extended_family.clone())
    };
    let mut immediate: BTreeSet<AgentId> = parents.iter().copied().collect();
    immediate.extend(kids.iter().copied());
    immediate.extend(siblings(town, agent)?);
    immediate.extend(spouse);

    let mut extended = immediate.clone();
    extended.extend(grandparents(town, agent)?);
    extended.extend(grandkids(town, agent)?);
    extended.extend(aunts_and_uncles(town, agent)?);
    extended.extend(nieces_and_nephews(town, agent)?);
    extended.extend(cousins(town, agent)?);
    // In-laws joined by marriage are not derivable from blood links.
    extended.extend(previous_extended);
    extended.remove(&agent);
    immediate.remove(&agent);

    let a = town.agent_mut(agent)?;
    a.immediate_family = immediate;
    a.extended_family = extended;
    Ok(())
}

/// The agent, their present spouse, and present kids living in the same
/// home. For a married agent only kids shared with the spouse count.
///
/// # Errors
/// Returns `TownError::AgentNotFound` for an unknown handle.
pub fn nuclear_family(town: &Town, agent: AgentId) -> Result<Vec<AgentId>> {
    let a = town.agent(agent)?;
    let mut family = vec![agent];
    let spouse = match a.spouse {
        Some(s) if town.agent(s)?.present() => Some(s),
        _ => None,
    };
    family.extend(spouse);
    for kid in &a.kids {
        let k = town.agent(*kid)?;
        if !k.present() || k.home.is_none() || k.home != a.home {
            continue;
        }
        if let Some(s) = spouse {
            if !town.agent(s)?.kids.contains(kid) {
                continue;
            }
        }
        family.push(*kid);
    }
    Ok(family)
}

/// Who is notified of `agent`'s death: present spouse, mother, father, then
/// the first present adult kid, sibling, extended-family member and friend,
/// in handle order; failing all of those a random adult resident.
///
/// # Errors
/// Returns `TownError::AgentNotFound` for an unknown handle.
pub fn next_of_kin(town: &Town, ctx: &mut SimContext, agent: AgentId) -> Result<Option<AgentId>> {
    let a = town.agent(agent)?;
    let present = |id: AgentId| town.agent(id).is_ok_and(|x| x.present() && x.id != agent);
    let present_adult = |id: &AgentId| town.agent(*id).is_ok_and(|x| x.present() && x.adult && x.id != agent);

    for direct in [a.spouse, a.mother, a.father].into_iter().flatten() {
        if present(direct) {
            return Ok(Some(direct));
        }
    }
    if let Some(kid) = a.kids.iter().find(|k| present_adult(k)) {
        return Ok(Some(*kid));
    }
    if let Some(sibling) = siblings(town, agent)?.iter().find(|s| present_adult(s)) {
        return Ok(Some(*sibling));
    }
    if let Some(relative) = a.extended_family.iter().find(|r| present_adult(r)) {
        return Ok(Some(*relative));
    }
    if let Some(friend) = a.friends.iter().find(|f| present_adult(f)) {
        return Ok(Some(*friend));
    }
    let adults: Vec<AgentId> = town.residents().filter(|r| present_adult(r)).collect();
    Ok(ctx.pick_index(adults.len()).map(|i| adults[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSeed;
    use crate::config::TownConfig;
    use crate::types::{Attraction, Personality, Sex};

    fn make_town() -> (Town, SimContext) {
        let mut config = TownConfig::default();
        config.general.first_year = 1900;
        let ctx = SimContext::new(config).expect("valid config");
        (Town::new("Testville"), ctx)
    }

    fn make_person(town: &mut Town, ctx: &SimContext, name: &str, sex: Sex, year: i32) -> AgentId {
        let seed = AgentSeed {
            given_name: name.to_string(),
            surname: "Hale".to_string(),
            sex,
            attraction: Attraction::heterosexual(sex),
            birth: SimDate::from_ymd(year, 1, 1).expect("valid date"),
            personality: Personality::default(),
        };
        let id = town.add_agent(seed, ctx);
        town.admit_resident(id);
        id
    }

    fn link(town: &mut Town, parent: AgentId, kid: AgentId) {
        let is_mother = town.agent(parent).expect("parent").sex == Sex::Female;
        let k = town.agent_mut(kid).expect("kid");
        if is_mother {
            k.mother = Some(parent);
        } else {
            k.father = Some(parent);
        }
        town.agent_mut(parent).expect("parent").kids.insert(kid);
    }

    #[test]
    fn three_generations_resolve_to_the_right_kinship() {
        let (mut town, ctx) = make_town();
        let grandma = make_person(&mut town, &ctx, "Vera", Sex::Female, 1830);
        let mom = make_person(&mut town, &ctx, "Ines", Sex::Female, 1855);
        let aunt = make_person(&mut town, &ctx, "Opal", Sex::Female, 1858);
        let kid = make_person(&mut town, &ctx, "Tom", Sex::Male, 1880);
        let cousin = make_person(&mut town, &ctx, "Ray", Sex::Male, 1882);
        link(&mut town, grandma, mom);
        link(&mut town, grandma, aunt);
        link(&mut town, mom, kid);
        link(&mut town, aunt, cousin);

        assert_eq!(kinship(&town, kid, mom).expect("ok"), Some(Kinship::Parent));
        assert_eq!(kinship(&town, mom, kid).expect("ok"), Some(Kinship::Kid));
        assert_eq!(kinship(&town, mom, aunt).expect("ok"), Some(Kinship::Sibling));
        assert_eq!(kinship(&town, kid, grandma).expect("ok"), Some(Kinship::Grandparent));
        assert_eq!(kinship(&town, grandma, cousin).expect("ok"), Some(Kinship::Grandkid));
        assert_eq!(kinship(&town, kid, aunt).expect("ok"), Some(Kinship::AuntOrUncle));
        assert_eq!(kinship(&town, aunt, kid).expect("ok"), Some(Kinship::NieceOrNephew));
        assert_eq!(kinship(&town, kid, cousin).expect("ok"), Some(Kinship::Cousin));

        rebuild_family(&mut town, kid).expect("rebuild");
        let k = town.agent(kid).expect("kid");
        assert!(k.immediate_family.contains(&mom));
        assert!(!k.immediate_family.contains(&aunt));
        assert!(k.extended_family.is_superset(&k.immediate_family));
        assert!(k.extended_family.contains(&cousin) && k.extended_family.contains(&grandma));
    }

    #[test]
    fn next_of_kin_prefers_spouse_then_parents() {
        let (mut town, mut ctx) = make_town();
        let mom = make_person(&mut town, &ctx, "Ines", Sex::Female, 1850);
        let son = make_person(&mut town, &ctx, "Tom", Sex::Male, 1870);
        let wife = make_person(&mut town, &ctx, "Ada", Sex::Female, 1872);
        link(&mut town, mom, son);
        assert_eq!(next_of_kin(&town, &mut ctx, son).expect("ok"), Some(mom));
        town.agent_mut(son).expect("son").spouse = Some(wife);
        assert_eq!(next_of_kin(&town, &mut ctx, son).expect("ok"), Some(wife));
    }

    #[test]
    fn nuclear_family_excludes_kids_living_elsewhere() {
        let (mut town, ctx) = make_town();
        let mom = make_person(&mut town, &ctx, "Ines", Sex::Female, 1850);
        let home_kid = make_person(&mut town, &ctx, "Tom", Sex::Male, 1890);
        let away_kid = make_person(&mut town, &ctx, "Ray", Sex::Male, 1875);
        link(&mut town, mom, home_kid);
        link(&mut town, mom, away_kid);
        let home = crate::types::DwellingId(0);
        town.agent_mut(mom).expect("mom").home = Some(home);
        town.agent_mut(home_kid).expect("kid").home = Some(home);
        town.agent_mut(away_kid).expect("kid").home = Some(crate::types::DwellingId(1));
        assert_eq!(nuclear_family(&town, mom).expect("ok"), vec![mom, home_kid]);
    }
}
