//! Relationship Ledger — directional affinity records and their lifecycle.
//!
//! Each agent holds at most one *current* record per counterpart. A category
//! transition (Acquaintance → Friendship or Enmity) supersedes the record: the
//! successor inherits the raw accumulators and stored increments, the
//! predecessor keeps its history and a `successor` link.
//!
//! Progression is guarded per timestep by a flag on each side's current
//! record. A call from either side steps both records exactly once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affinity::{self, Damping, SparkGates};
use crate::config::TownConfig;
use crate::context::SimContext;
use crate::error::{Result, TownError};
use crate::pointers;
use crate::salience::SalienceChange;
use crate::town::Town;
use crate::types::{AgentId, RelationshipId, SimDate};

/// Category of a relationship record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Met, no strong feelings yet.
    Acquaintance,
    /// Charge crossed the friendship threshold.
    Friendship,
    /// Charge crossed the enmity threshold.
    Enmity,
}

/// The owner's private view of one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Registry handle.
    pub id: RelationshipId,
    /// Whose view this is.
    pub owner: AgentId,
    /// Who it is about.
    pub subject: AgentId,
    /// Category.
    pub kind: RelationshipKind,
    /// Personality compatibility, fixed at first meeting.
    pub compatibility: f64,
    /// Stored charge increment.
    pub charge_increment: f64,
    /// Stored spark increment; decays before each application.
    pub spark_increment: f64,
    /// Unbounded charge accumulator.
    pub raw_charge: f64,
    /// Normalized charge in [-100, 100].
    pub charge: f64,
    /// Unbounded spark accumulator.
    pub raw_spark: f64,
    /// Normalized spark in [-100, 100].
    pub spark: f64,
    /// Age-gap damping.
    pub age_damping: Damping,
    /// Job-level damping.
    pub job_damping: Damping,
    /// Interactions so far, carried across transitions.
    pub interactions: u32,
    /// First meeting.
    pub first_met: SimDate,
    /// Latest meeting.
    pub last_met: SimDate,
    /// Progressed during the current timestep.
    pub interacted_this_timestep: bool,
    /// Record this one superseded.
    pub predecessor: Option<RelationshipId>,
    /// Record that superseded this one.
    pub successor: Option<RelationshipId>,
}

impl Relationship {
    /// Still the owner's current view of the subject.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.successor.is_none()
    }
}

/// A category change produced by one progression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Owner of the records.
    pub owner: AgentId,
    /// Subject of the records.
    pub subject: AgentId,
    /// Superseded record.
    pub from: RelationshipId,
    /// New current record.
    pub to: RelationshipId,
    /// New category.
    pub kind: RelationshipKind,
}

/// Outcome of [`progress`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interaction {
    /// Records stepped (zero, one or two).
    pub stepped: Vec<RelationshipId>,
    /// Category transitions that happened.
    pub transitions: Vec<Transition>,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Owner's current record for subject, if they have met.
///
/// # Errors
/// Returns `TownError::AgentNotFound` if `owner` is unknown.
pub fn current(town: &Town, owner: AgentId, subject: AgentId) -> Result<Option<RelationshipId>> {
    Ok(town.agent(owner)?.ledger.get(&subject).copied())
}

/// Every record owner has held toward subject, oldest first.
///
/// # Errors
/// Returns an unknown-handle error if the chain is broken.
pub fn history(town: &Town, owner: AgentId, subject: AgentId) -> Result<Vec<RelationshipId>> {
    let mut chain = Vec::new();
    let mut cursor = current(town, owner, subject)?;
    while let Some(id) = cursor {
        chain.push(id);
        cursor = town.relationship(id)?.predecessor;
    }
    chain.reverse();
    Ok(chain)
}

fn current_charge(town: &Town, owner: AgentId, subject: AgentId) -> Result<Option<f64>> {
    match current(town, owner, subject)? {
        Some(id) => Ok(Some(town.relationship(id)?.charge)),
        None => Ok(None),
    }
}

/// Owner's normalized charge toward subject exceeds the like threshold.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn likes(town: &Town, cfg: &TownConfig, owner: AgentId, subject: AgentId) -> Result<bool> {
    Ok(current_charge(town, owner, subject)?.is_some_and(|c| c > cfg.relationships.like_threshold))
}

/// Owner's normalized charge toward subject is below the dislike threshold.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn dislikes(town: &Town, cfg: &TownConfig, owner: AgentId, subject: AgentId) -> Result<bool> {
    Ok(current_charge(town, owner, subject)?
        .is_some_and(|c| c < cfg.relationships.dislike_threshold))
}

/// Owner's normalized charge toward subject is below the hate threshold.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn hates(town: &Town, cfg: &TownConfig, owner: AgentId, subject: AgentId) -> Result<bool> {
    Ok(current_charge(town, owner, subject)?.is_some_and(|c| c < cfg.relationships.hate_threshold))
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

fn spark_gates(town: &Town, cfg: &TownConfig, owner: AgentId, subject: AgentId) -> Result<SparkGates> {
    Ok(SparkGates {
        family: town.agent(owner)?.extended_family.contains(&subject),
        romantic_age: cfg.life_cycle.romantic_age,
    })
}

fn create(town: &mut Town, ctx: &SimContext, owner: AgentId, subject: AgentId) -> Result<RelationshipId> {
    let cfg = ctx.config();
    let (o, s) = (town.agent(owner)?.profile(), town.agent(subject)?.profile());
    let gates = spark_gates(town, cfg, owner, subject)?;
    let charge_increment = affinity::charge_increment(&o, &s, &cfg.affinity);
    let spark_increment = affinity::spark_increment(&o, &s, gates, &cfg.affinity);
    let steps = ctx.normalization_steps();
    let id = town.add_relationship(Relationship {
        id: RelationshipId(0),
        owner,
        subject,
        kind: RelationshipKind::Acquaintance,
        compatibility: affinity::compatibility(&o.personality, &s.personality),
        charge_increment,
        spark_increment,
        raw_charge: charge_increment,
        charge: affinity::normalize_charge(charge_increment, steps, &cfg.affinity),
        raw_spark: spark_increment,
        spark: affinity::normalize_spark(spark_increment, steps, &cfg.affinity),
        age_damping: affinity::age_damping(o.age, s.age, &cfg.affinity),
        job_damping: affinity::job_level_damping(
            town.job_level(owner)?,
            town.job_level(subject)?,
            &cfg.affinity,
        ),
        interactions: 0,
        first_met: ctx.date(),
        last_met: ctx.date(),
        interacted_this_timestep: false,
        predecessor: None,
        successor: None,
    });
    let agent = town.agent_mut(owner)?;
    agent.ledger.insert(subject, id);
    agent.acquaintances.insert(subject);
    agent
        .salience
        .adjust(subject, SalienceChange::Acquaintance.weight(&cfg.salience));
    Ok(id)
}

/// Owner's current record for subject, creating an Acquaintance if they have
/// never met. Also ensures subject holds a reciprocal record.
///
/// # Errors
/// Returns `TownError::InvalidState` for a self-relationship and an
/// unknown-handle error for missing agents.
pub fn get_or_create(
    town: &mut Town,
    ctx: &SimContext,
    owner: AgentId,
    subject: AgentId,
) -> Result<RelationshipId> {
    if owner == subject {
        return Err(TownError::invalid("get_or_create", format!("{owner} cannot meet themselves")));
    }
    let forward = match current(town, owner, subject)? {
        Some(id) => id,
        None => create(town, ctx, owner, subject)?,
    };
    if current(town, subject, owner)?.is_none() {
        create(town, ctx, subject, owner)?;
    }
    Ok(forward)
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

/// Progress the pair once for this timestep: the owner's record, then the
/// subject's reciprocal record if it has not interacted yet. No-op if the
/// owner's record already interacted this timestep.
///
/// # Errors
/// Returns an unknown-handle error for missing agents or records.
pub fn progress(
    town: &mut Town,
    ctx: &SimContext,
    owner: AgentId,
    subject: AgentId,
    elapsed: f64,
) -> Result<Interaction> {
    let _span = tracing::debug_span!(crate::metrics::spans::PROGRESS).entered();
    let forward = get_or_create(town, ctx, owner, subject)?;
    let mut outcome = Interaction::default();
    if town.relationship(forward)?.interacted_this_timestep {
        return Ok(outcome);
    }
    let (id, transition) = step(town, ctx, owner, subject, elapsed)?;
    outcome.stepped.push(id);
    outcome.transitions.extend(transition);

    let reciprocal = current(town, subject, owner)?
        .ok_or_else(|| TownError::invalid("progress", format!("{subject} has no record of {owner}")))?;
    if !town.relationship(reciprocal)?.interacted_this_timestep {
        let (id, transition) = step(town, ctx, subject, owner, elapsed)?;
        outcome.stepped.push(id);
        outcome.transitions.extend(transition);
    }
    Ok(outcome)
}

fn step(
    town: &mut Town,
    ctx: &SimContext,
    owner: AgentId,
    subject: AgentId,
    elapsed: f64,
) -> Result<(RelationshipId, Option<Transition>)> {
    let cfg = ctx.config();
    let steps = ctx.normalization_steps();
    let id = current(town, owner, subject)?
        .ok_or_else(|| TownError::invalid("progress", format!("{owner} has no record of {subject}")))?;
    {
        let r = town.relationship_mut(id)?;
        r.interactions += 1;
        r.last_met = ctx.date();
        r.raw_charge += r.charge_increment * r.age_damping.charge * r.job_damping.charge * elapsed;
        r.charge = affinity::normalize_charge(r.raw_charge, steps, &cfg.affinity);
    }
    town.agent_mut(owner)?
        .salience
        .adjust(subject, cfg.salience.interaction);

    let transition = maybe_transition(town, cfg, id)?;
    let live = transition.map_or(id, |t| t.to);
    let (raw_charge, raw_spark) = {
        let r = town.relationship_mut(live)?;
        r.spark_increment *= cfg.affinity.spark_decay_rate;
        r.raw_spark += r.spark_increment * r.age_damping.spark * r.job_damping.spark * elapsed;
        r.spark = affinity::normalize_spark(r.raw_spark, steps, &cfg.affinity);
        r.interacted_this_timestep = true;
        (r.raw_charge, r.raw_spark)
    };
    pointers::scan(town, &cfg.salience, owner, subject, raw_charge, raw_spark)?;
    Ok((live, transition))
}

fn maybe_transition(town: &mut Town, cfg: &TownConfig, id: RelationshipId) -> Result<Option<Transition>> {
    let record = town.relationship(id)?;
    if record.kind != RelationshipKind::Acquaintance {
        return Ok(None);
    }
    let kind = if record.charge > cfg.relationships.friendship_threshold {
        RelationshipKind::Friendship
    } else if record.charge < cfg.relationships.enmity_threshold {
        RelationshipKind::Enmity
    } else {
        return Ok(None);
    };
    let (owner, subject) = (record.owner, record.subject);
    let successor = Relationship {
        kind,
        predecessor: Some(id),
        successor: None,
        ..record.clone()
    };
    let to = town.add_relationship(successor);
    town.relationship_mut(id)?.successor = Some(to);

    let agent = town.agent_mut(owner)?;
    agent.ledger.insert(subject, to);
    agent.acquaintances.remove(&subject);
    let change = match kind {
        RelationshipKind::Friendship => {
            agent.friends.insert(subject);
            SalienceChange::Friend
        }
        _ => {
            agent.enemies.insert(subject);
            SalienceChange::Enemy
        }
    };
    agent.salience.adjust(subject, change.weight(&cfg.salience));
    debug!(%owner, %subject, ?kind, from = %id, %to, "relationship category changed");
    Ok(Some(Transition { owner, subject, from: id, to, kind }))
}

/// Clear every record's per-timestep interaction flag.
pub fn reset_interaction_flags(town: &mut Town) {
    town.relationships_mut()
        .for_each(|r| r.interacted_this_timestep = false);
}

// ---------------------------------------------------------------------------
// Refresh of stored multipliers
// ---------------------------------------------------------------------------

/// Recompute age and job-level damping on every current record held by or
/// about `agent`.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn refresh_damping(town: &mut Town, ctx: &SimContext, agent: AgentId) -> Result<()> {
    let cfg = &ctx.config().affinity;
    let counterparts: Vec<AgentId> = town.agent(agent)?.ledger.keys().copied().collect();
    for other in counterparts {
        let (a_age, b_age) = (town.agent(agent)?.age, town.agent(other)?.age);
        let (a_lvl, b_lvl) = (town.job_level(agent)?, town.job_level(other)?);
        for (owner, subject, (o_age, s_age, o_lvl, s_lvl)) in [
            (agent, other, (a_age, b_age, a_lvl, b_lvl)),
            (other, agent, (b_age, a_age, b_lvl, a_lvl)),
        ] {
            if let Some(id) = current(town, owner, subject)? {
                let r = town.relationship_mut(id)?;
                r.age_damping = affinity::age_damping(o_age, s_age, cfg);
                r.job_damping = affinity::job_level_damping(o_lvl, s_lvl, cfg);
            }
        }
    }
    Ok(())
}

/// Recompute job-level damping only, after `agent`'s job level changed.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn refresh_job_damping(town: &mut Town, ctx: &SimContext, agent: AgentId) -> Result<()> {
    let cfg = &ctx.config().affinity;
    let counterparts: Vec<AgentId> = town.agent(agent)?.ledger.keys().copied().collect();
    let own = town.job_level(agent)?;
    for other in counterparts {
        let theirs = town.job_level(other)?;
        if let Some(id) = current(town, agent, other)? {
            town.relationship_mut(id)?.job_damping = affinity::job_level_damping(own, theirs, cfg);
        }
        if let Some(id) = current(town, other, agent)? {
            town.relationship_mut(id)?.job_damping = affinity::job_level_damping(theirs, own, cfg);
        }
    }
    Ok(())
}

/// Recompute stored spark increments on every current record held by or
/// about `agent` (on reaching romantic age, or after family links change).
///
/// # Errors
/// Returns an unknown-handle error.
pub fn refresh_spark(town: &mut Town, ctx: &SimContext, agent: AgentId) -> Result<()> {
    let cfg = ctx.config();
    let counterparts: Vec<AgentId> = town.agent(agent)?.ledger.keys().copied().collect();
    for other in counterparts {
        for (owner, subject) in [(agent, other), (other, agent)] {
            let Some(id) = current(town, owner, subject)? else {
                continue;
            };
            let (o, s) = (town.agent(owner)?.profile(), town.agent(subject)?.profile());
            let gates = spark_gates(town, cfg, owner, subject)?;
            town.relationship_mut(id)?.spark_increment =
                affinity::spark_increment(&o, &s, gates, &cfg.affinity);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSeed;
    use crate::types::{Attraction, Personality, Sex};

    fn make_ctx() -> SimContext {
        let mut config = crate::config::TownConfig::default();
        config.general.first_year = 1900;
        let mut ctx = SimContext::new(config).expect("valid config");
        ctx.set_elapsed_timesteps(100);
        ctx
    }

    fn make_agent(town: &mut Town, ctx: &SimContext, extroversion: f64) -> AgentId {
        let seed = AgentSeed {
            given_name: "Lee".to_string(),
            surname: "Park".to_string(),
            sex: Sex::Female,
            attraction: Attraction::heterosexual(Sex::Female),
            birth: SimDate::from_ymd(1870, 1, 1).expect("valid date"),
            personality: Personality::new(0.0, 0.0, extroversion, 0.5, 0.0),
        };
        let id = town.add_agent(seed, ctx);
        town.admit_resident(id);
        id
    }

    #[test]
    fn get_or_create_makes_both_sides_once() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = make_agent(&mut town, &ctx, 0.9);
        let b = make_agent(&mut town, &ctx, -0.9);
        let ab = get_or_create(&mut town, &ctx, a, b).expect("create");
        assert_eq!(get_or_create(&mut town, &ctx, a, b).expect("again"), ab);
        let ba = current(&town, b, a).expect("ok").expect("reciprocal exists");
        assert_ne!(ab, ba);
        assert_eq!(town.relationships().count(), 2);
        let r = town.relationship(ab).expect("record");
        assert!((r.raw_charge - r.charge_increment).abs() < f64::EPSILON);
        assert!(town.agent(a).expect("a").acquaintances.contains(&b));
    }

    #[test]
    fn self_relationship_is_rejected() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = make_agent(&mut town, &ctx, 0.0);
        assert!(get_or_create(&mut town, &ctx, a, a).is_err());
    }

    #[test]
    fn progress_steps_each_side_once_per_timestep() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = make_agent(&mut town, &ctx, 0.9);
        let b = make_agent(&mut town, &ctx, -0.9);
        let first = progress(&mut town, &ctx, a, b, 1.0).expect("progress");
        assert_eq!(first.stepped.len(), 2);
        let again = progress(&mut town, &ctx, b, a, 1.0).expect("progress");
        assert!(again.stepped.is_empty());
        for side in [(a, b), (b, a)] {
            let id = current(&town, side.0, side.1).expect("ok").expect("record");
            assert_eq!(town.relationship(id).expect("record").interactions, 1);
        }
        reset_interaction_flags(&mut town);
        let next = progress(&mut town, &ctx, b, a, 1.0).expect("progress");
        assert_eq!(next.stepped.len(), 2);
    }

    #[test]
    fn friendship_transition_inherits_raw_state() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = make_agent(&mut town, &ctx, 0.9);
        let b = make_agent(&mut town, &ctx, -0.9);
        let mut seen = None;
        for _ in 0..20 {
            let before = current(&town, a, b).ok().flatten().and_then(|id| {
                town.relationship(id).ok().map(|r| (r.raw_charge, r.charge_increment))
            });
            let out = progress(&mut town, &ctx, a, b, 1.0).expect("progress");
            if let Some(t) = out.transitions.iter().find(|t| t.owner == a) {
                let (raw_before, inc) = before.expect("record existed");
                let to = town.relationship(t.to).expect("successor");
                let from = town.relationship(t.from).expect("predecessor");
                assert!((from.raw_charge - (raw_before + inc)).abs() < 1e-9);
                assert!((to.raw_charge - from.raw_charge).abs() < f64::EPSILON);
                assert_eq!(to.predecessor, Some(t.from));
                assert_eq!(from.successor, Some(t.to));
                seen = Some(t.to);
            }
            reset_interaction_flags(&mut town);
        }
        let to = seen.expect("a befriended b within 20 interactions");
        assert_eq!(history(&town, a, b).expect("history").len(), 2);
        assert_eq!(current(&town, a, b).expect("ok"), Some(to));
        let agent = town.agent(a).expect("a");
        assert!(agent.friends.contains(&b) && !agent.acquaintances.contains(&b));
        assert_eq!(agent.best_friend(), Some(b));
    }

    #[test]
    fn like_dislike_hate_read_normalized_charge() {
        let ctx = make_ctx();
        let mut town = Town::new("T");
        let a = make_agent(&mut town, &ctx, 0.0);
        let b = make_agent(&mut town, &ctx, 0.0);
        let id = get_or_create(&mut town, &ctx, a, b).expect("create");
        let cfg = ctx.config();
        town.relationship_mut(id).expect("record").charge = -25.0;
        assert!(!likes(&town, cfg, a, b).expect("ok"));
        assert!(dislikes(&town, cfg, a, b).expect("ok"));
        assert!(hates(&town, cfg, a, b).expect("ok"));
        town.relationship_mut(id).expect("record").charge = 12.0;
        assert!(likes(&town, cfg, a, b).expect("ok"));
        assert!(!likes(&town, cfg, b, a).expect("ok"));
    }
}
